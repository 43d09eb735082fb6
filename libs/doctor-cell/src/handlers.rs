use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::directory::{Clinic, Doctor};
use shared_models::error::AppError;
use shared_models::response::ApiResponse;
use shared_utils::extractor::require_staff;

use crate::models::{CreateClinicRequest, CreateDoctorRequest, DoctorQuery};
use crate::services::{ClinicService, DoctorService};

#[derive(Clone)]
pub struct DirectoryState {
    pub config: Arc<AppConfig>,
    pub doctors: Arc<DoctorService>,
    pub clinics: Arc<ClinicService>,
}

// ==============================================================================
// DOCTORS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_doctor(
    State(state): State<DirectoryState>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateDoctorRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Doctor>>), AppError> {
    require_staff(&user)?;

    let doctor = state.doctors.create_doctor(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok_with_message(doctor, "Doctor created"))))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<DirectoryState>,
    Extension(_user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Doctor>>, AppError> {
    let doctor = state.doctors.get_doctor(doctor_id).await?;
    Ok(Json(ApiResponse::ok(doctor)))
}

#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<DirectoryState>,
    Extension(_user): Extension<User>,
    Query(query): Query<DoctorQuery>,
) -> Result<Json<ApiResponse<Vec<Doctor>>>, AppError> {
    let doctors = state.doctors.list_doctors(&query).await?;
    Ok(Json(ApiResponse::ok(doctors)))
}

// ==============================================================================
// CLINICS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_clinic(
    State(state): State<DirectoryState>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateClinicRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Clinic>>), AppError> {
    require_staff(&user)?;

    let clinic = state.clinics.create_clinic(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok_with_message(clinic, "Clinic created"))))
}

#[axum::debug_handler]
pub async fn get_clinic(
    State(state): State<DirectoryState>,
    Extension(_user): Extension<User>,
    Path(clinic_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Clinic>>, AppError> {
    let clinic = state.clinics.get_clinic(clinic_id).await?;
    Ok(Json(ApiResponse::ok(clinic)))
}

#[axum::debug_handler]
pub async fn list_clinics(
    State(state): State<DirectoryState>,
    Extension(_user): Extension<User>,
) -> Result<Json<ApiResponse<Vec<Clinic>>>, AppError> {
    let clinics = state.clinics.list_clinics().await?;
    Ok(Json(ApiResponse::ok(clinics)))
}
