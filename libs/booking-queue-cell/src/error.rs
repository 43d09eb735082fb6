use thiserror::Error;
use tracing::error;

use schedule_cell::ScheduleError;
use shared_database::StoreError;
use shared_models::error::AppError;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("No slot available: {0}")]
    SlotUnavailable(String),

    #[error("Invalid queue status: {0}")]
    InvalidStatus(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Slot ledger invariant violated: {0}")]
    Invariant(String),

    #[error("Schedule error: {0}")]
    Schedule(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl From<ScheduleError> for QueueError {
    fn from(e: ScheduleError) -> Self {
        match e {
            ScheduleError::NotFound(what) => QueueError::NotFound(what),
            ScheduleError::CapacityExceeded(_) | ScheduleError::NotBookable { .. } => {
                QueueError::SlotUnavailable(e.to_string())
            }
            ScheduleError::Invariant(detail) => QueueError::Invariant(detail),
            ScheduleError::Storage(detail) => QueueError::Storage(detail),
            other => QueueError::Schedule(other.to_string()),
        }
    }
}

impl From<StoreError> for QueueError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { entity, id } => QueueError::NotFound(format!("{} {}", entity, id)),
            StoreError::Invariant(detail) => {
                error!("Slot ledger invariant violated: {}", detail);
                QueueError::Invariant(detail)
            }
            other => QueueError::Storage(other.to_string()),
        }
    }
}

impl From<QueueError> for AppError {
    fn from(e: QueueError) -> Self {
        match e {
            QueueError::NotFound(_) => AppError::NotFound(e.to_string()),
            QueueError::SlotUnavailable(_) => AppError::Conflict(e.to_string()),
            QueueError::InvalidStatus(_) | QueueError::ValidationError(_) => {
                AppError::ValidationError(e.to_string())
            }
            QueueError::Schedule(_) => AppError::Conflict(e.to_string()),
            QueueError::Invariant(_) | QueueError::SerializationError(_) => {
                AppError::Internal(e.to_string())
            }
            QueueError::Storage(_) => AppError::Database(e.to_string()),
        }
    }
}
