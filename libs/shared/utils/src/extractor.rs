use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{User, UserClass};
use shared_models::error::AppError;

use crate::jwt::{peek_class, validate_token};

pub fn extract_bearer_token(headers: &HeaderMap) -> Result<String, AppError> {
    let auth_header = headers
        .get("Authorization")
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let auth_value = auth_header
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    match auth_value.strip_prefix("Bearer ") {
        Some(token) if !token.is_empty() => Ok(token.to_string()),
        _ => Err(AppError::Auth("Invalid authorization header format".to_string())),
    }
}

/// Validates a bearer token against the secret of the class it claims to belong to.
pub fn authenticate(token: &str, config: &AppConfig) -> Result<User, AppError> {
    let class = peek_class(token)
        .ok_or_else(|| AppError::Auth("Invalid token format".to_string()))?;

    let secret = match class {
        UserClass::Staff => &config.staff_jwt_secret,
        UserClass::Patient => &config.patient_jwt_secret,
    };

    validate_token(token, secret, class).map_err(AppError::Auth)
}

// Accepts staff and patient tokens alike; handlers decide what each class may do.
pub async fn auth_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(request.headers())?;
    let user = authenticate(&token, &config)?;

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

pub fn require_staff(user: &User) -> Result<(), AppError> {
    if user.is_staff() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Staff access required".to_string()))
    }
}

pub fn require_admin(user: &User) -> Result<(), AppError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Admin access required".to_string()))
    }
}

/// Patients may only act on their own records; staff may act on anyone's.
pub fn require_self_or_staff(user: &User, patient_id: Uuid) -> Result<(), AppError> {
    if user.is_staff() || user.id == patient_id {
        Ok(())
    } else {
        Err(AppError::Forbidden("Access denied".to_string()))
    }
}
