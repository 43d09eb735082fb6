use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Schedule overlaps existing schedule {0}")]
    Overlap(Uuid),

    #[error("Schedule {0} has no remaining capacity")]
    CapacityExceeded(Uuid),

    #[error("Schedule {id} is {status} and does not accept bookings")]
    NotBookable { id: Uuid, status: String },

    #[error("Cannot set total slots to {requested}: {booked} already booked")]
    BelowBooked { booked: u32, requested: u32 },

    #[error("Schedule {id} still has {booked} booked slots")]
    InUse { id: Uuid, booked: u32 },

    #[error("Duplicate record: {0}")]
    Duplicate(String),

    #[error("Store invariant violated: {0}")]
    Invariant(String),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        StoreError::Backend(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
