use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::directory::Patient;
use shared_models::error::AppError;
use shared_models::response::ApiResponse;
use shared_utils::extractor::{require_self_or_staff, require_staff};

use crate::models::{CreatePatientRequest, PatientSearchQuery};
use crate::services::PatientService;

#[derive(Clone)]
pub struct PatientState {
    pub config: Arc<AppConfig>,
    pub service: Arc<PatientService>,
}

#[axum::debug_handler]
pub async fn create_patient(
    State(state): State<PatientState>,
    Extension(user): Extension<User>,
    Json(request): Json<CreatePatientRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Patient>>), AppError> {
    require_staff(&user)?;

    let patient = state.service.create_patient(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok_with_message(patient, "Patient created"))))
}

#[axum::debug_handler]
pub async fn get_patient(
    State(state): State<PatientState>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Patient>>, AppError> {
    require_self_or_staff(&user, patient_id)?;

    let patient = state.service.get_patient(patient_id).await?;
    Ok(Json(ApiResponse::ok(patient)))
}

#[axum::debug_handler]
pub async fn list_patients(
    State(state): State<PatientState>,
    Extension(user): Extension<User>,
    Query(query): Query<PatientSearchQuery>,
) -> Result<Json<ApiResponse<Vec<Patient>>>, AppError> {
    require_staff(&user)?;

    let patients = state.service.list_patients(query.search.as_deref()).await?;
    Ok(Json(ApiResponse::ok(patients)))
}
