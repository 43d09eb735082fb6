use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use shared_database::{Database, DirectoryStore};
use shared_models::directory::Clinic;

use crate::models::{CreateClinicRequest, DoctorError};

pub struct ClinicService {
    directory: Arc<dyn DirectoryStore>,
}

impl ClinicService {
    pub fn new(database: &Database) -> Self {
        Self {
            directory: database.directory.clone(),
        }
    }

    pub async fn create_clinic(&self, request: CreateClinicRequest) -> Result<Clinic, DoctorError> {
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(DoctorError::ValidationError("Clinic name is required".to_string()));
        }

        let clinic = Clinic {
            id: Uuid::new_v4(),
            name,
            department: request.department,
            floor: request.floor,
            created_at: Utc::now(),
        };

        let clinic = self.directory.insert_clinic(clinic).await?;
        info!("Created clinic {} ({})", clinic.id, clinic.name);
        Ok(clinic)
    }

    pub async fn get_clinic(&self, clinic_id: Uuid) -> Result<Clinic, DoctorError> {
        self.directory
            .get_clinic(clinic_id)
            .await?
            .ok_or(DoctorError::ClinicNotFound)
    }

    pub async fn list_clinics(&self) -> Result<Vec<Clinic>, DoctorError> {
        let mut clinics = self.directory.list_clinics().await?;
        clinics.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(clinics)
    }
}
