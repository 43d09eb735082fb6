use thiserror::Error;
use tracing::error;
use uuid::Uuid;

use shared_database::StoreError;
use shared_models::error::AppError;

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Doctor already has an overlapping active schedule ({existing})")]
    ConflictingSchedule { existing: Uuid },

    #[error("Schedule {0} has no remaining capacity")]
    CapacityExceeded(Uuid),

    #[error("Schedule is {status} and does not accept bookings")]
    NotBookable { status: String },

    #[error("Cannot reduce total slots to {requested}: {booked} slots already booked")]
    InvalidSlotTotal { booked: u32, requested: u32 },

    #[error("Schedule has {active_entries} active queue entries; cancel them first")]
    SchedulesInUse { active_entries: usize },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Slot ledger invariant violated: {0}")]
    Invariant(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<StoreError> for ScheduleError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { entity, id } => ScheduleError::NotFound(format!("{} {}", entity, id)),
            StoreError::Overlap(existing) => ScheduleError::ConflictingSchedule { existing },
            StoreError::CapacityExceeded(id) => ScheduleError::CapacityExceeded(id),
            StoreError::NotBookable { status, .. } => ScheduleError::NotBookable { status },
            StoreError::BelowBooked { booked, requested } => {
                ScheduleError::InvalidSlotTotal { booked, requested }
            }
            StoreError::InUse { booked, .. } => ScheduleError::SchedulesInUse {
                active_entries: booked as usize,
            },
            StoreError::Invariant(detail) => {
                error!("Slot ledger invariant violated: {}", detail);
                ScheduleError::Invariant(detail)
            }
            other => ScheduleError::Storage(other.to_string()),
        }
    }
}

impl From<ScheduleError> for AppError {
    fn from(e: ScheduleError) -> Self {
        match e {
            ScheduleError::NotFound(_) => AppError::NotFound(e.to_string()),
            ScheduleError::ConflictingSchedule { .. }
            | ScheduleError::CapacityExceeded(_)
            | ScheduleError::NotBookable { .. }
            | ScheduleError::SchedulesInUse { .. } => AppError::Conflict(e.to_string()),
            ScheduleError::InvalidSlotTotal { .. } | ScheduleError::Validation(_) => {
                AppError::ValidationError(e.to_string())
            }
            ScheduleError::Invariant(_) => AppError::Internal(e.to_string()),
            ScheduleError::Storage(_) => AppError::Database(e.to_string()),
        }
    }
}
