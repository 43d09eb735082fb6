use std::sync::Arc;

use axum::{
    extract::{Extension, Json, State},
    http::{HeaderMap, StatusCode},
};
use tracing::debug;

use shared_config::AppConfig;
use shared_models::auth::{TokenResponse, User};
use shared_models::directory::StaffAccount;
use shared_models::error::AppError;
use shared_models::response::ApiResponse;
use shared_utils::extractor::{authenticate, extract_bearer_token, require_admin};

use crate::models::{AuthSession, CreateStaffRequest, LoginRequest, Me, RegisterPatientRequest, RegisteredPatient};
use crate::services::AuthService;

#[derive(Clone)]
pub struct AuthState {
    pub config: Arc<AppConfig>,
    pub service: Arc<AuthService>,
}

#[axum::debug_handler]
pub async fn staff_login(
    State(state): State<AuthState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<ApiResponse<AuthSession>>, AppError> {
    let session = state.service.staff_login(request).await?;
    Ok(Json(ApiResponse::ok(session)))
}

#[axum::debug_handler]
pub async fn patient_login(
    State(state): State<AuthState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<ApiResponse<AuthSession>>, AppError> {
    let session = state.service.patient_login(request).await?;
    Ok(Json(ApiResponse::ok(session)))
}

#[axum::debug_handler]
pub async fn register_patient(
    State(state): State<AuthState>,
    Json(request): Json<RegisterPatientRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RegisteredPatient>>), AppError> {
    let registered = state.service.register_patient(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok_with_message(registered, "Registration successful")),
    ))
}

pub async fn validate_token(
    State(state): State<AuthState>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, AppError> {
    debug!("Validating token");

    let token = extract_bearer_token(&headers)?;
    let user = authenticate(&token, &state.config)?;

    Ok(Json(TokenResponse {
        valid: true,
        user_id: user.id,
        email: user.email,
        role: user.role,
    }))
}

#[axum::debug_handler]
pub async fn create_staff(
    State(state): State<AuthState>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateStaffRequest>,
) -> Result<(StatusCode, Json<ApiResponse<StaffAccount>>), AppError> {
    require_admin(&user)?;

    let staff = state.service.create_staff(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok_with_message(staff, "Staff account created"))))
}

#[axum::debug_handler]
pub async fn me(
    State(state): State<AuthState>,
    Extension(user): Extension<User>,
) -> Result<Json<ApiResponse<Me>>, AppError> {
    let me = state.service.me(&user).await?;
    Ok(Json(ApiResponse::ok(me)))
}
