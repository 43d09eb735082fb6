use thiserror::Error;

use patient_cell::PatientError;
use shared_database::StoreError;
use shared_models::error::AppError;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("An account with email {0} already exists")]
    EmailTaken(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Token error: {0}")]
    TokenError(String),

    #[error("Password hashing failed: {0}")]
    HashingError(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate(what) => AuthError::EmailTaken(what),
            other => AuthError::Storage(other.to_string()),
        }
    }
}

impl From<PatientError> for AuthError {
    fn from(e: PatientError) -> Self {
        match e {
            PatientError::DuplicateEmail(email) => AuthError::EmailTaken(email),
            PatientError::ValidationError(msg) => AuthError::ValidationError(msg),
            other => AuthError::Storage(other.to_string()),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials => AppError::Auth(e.to_string()),
            AuthError::EmailTaken(_) => AppError::Conflict(e.to_string()),
            AuthError::ValidationError(_) => AppError::ValidationError(e.to_string()),
            AuthError::TokenError(_) | AuthError::HashingError(_) => AppError::Internal(e.to_string()),
            AuthError::Storage(_) => AppError::Database(e.to_string()),
        }
    }
}
