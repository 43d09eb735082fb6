use serde::{Deserialize, Serialize};

use shared_database::StoreError;
use shared_models::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDoctorRequest {
    pub first_name: String,
    pub last_name: String,
    pub specialty: String,
    pub email: Option<String>,
    pub is_available: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorQuery {
    pub specialty: Option<String>,
    pub available_only: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClinicRequest {
    pub name: String,
    pub department: Option<String>,
    pub floor: Option<String>,
}

#[derive(Debug)]
pub enum DoctorError {
    DoctorNotFound,
    ClinicNotFound,
    ValidationError(String),
    Storage(String),
}

impl std::fmt::Display for DoctorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DoctorError::DoctorNotFound => write!(f, "Doctor not found"),
            DoctorError::ClinicNotFound => write!(f, "Clinic not found"),
            DoctorError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            DoctorError::Storage(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl std::error::Error for DoctorError {}

impl From<StoreError> for DoctorError {
    fn from(e: StoreError) -> Self {
        DoctorError::Storage(e.to_string())
    }
}

impl From<DoctorError> for AppError {
    fn from(e: DoctorError) -> Self {
        match e {
            DoctorError::DoctorNotFound | DoctorError::ClinicNotFound => AppError::NotFound(e.to_string()),
            DoctorError::ValidationError(_) => AppError::ValidationError(e.to_string()),
            DoctorError::Storage(_) => AppError::Database(e.to_string()),
        }
    }
}
