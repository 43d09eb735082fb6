use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use shared_models::auth::{Credential, UserClass};
use shared_models::directory::{Clinic, Doctor, Patient, StaffAccount};
use shared_models::queue::{NewQueueEntry, QueueEntry, QueueStatus};
use shared_models::schedule::{Schedule, ScheduleFilter, ScheduleStatus};

use crate::error::StoreResult;

/// Schedule documents. Every counter mutation is a single atomic operation.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Inserts unless another time-occupying schedule of the same doctor on
    /// the same date overlaps it (`StoreError::Overlap`).
    async fn insert_if_no_overlap(&self, schedule: Schedule) -> StoreResult<Schedule>;

    async fn get_schedule(&self, id: Uuid) -> StoreResult<Option<Schedule>>;

    async fn list_schedules(&self, filter: &ScheduleFilter) -> StoreResult<Vec<Schedule>>;

    /// `booked += 1`. Fails with `CapacityExceeded` when nothing is left.
    async fn reserve_slot(&self, id: Uuid) -> StoreResult<Schedule>;

    /// `booked -= 1`. Fails with `Invariant` when nothing is booked.
    async fn release_slot(&self, id: Uuid) -> StoreResult<Schedule>;

    /// Fails with `BelowBooked` when `total < booked`.
    async fn set_total_slots(&self, id: Uuid, total: u32) -> StoreResult<Schedule>;

    async fn set_schedule_status(&self, id: Uuid, status: ScheduleStatus) -> StoreResult<Schedule>;

    /// Cancels only while `booked == 0`, checked and written in one step;
    /// otherwise `InUse`. A schedule that is already cancelled comes back as is.
    async fn cancel_if_unbooked(&self, id: Uuid) -> StoreResult<Schedule>;
}

/// Queue entries. Numbers are assigned by the store, never by the caller.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Assigns the schedule's next queue number and inserts in one step.
    async fn insert_next(&self, entry: NewQueueEntry) -> StoreResult<QueueEntry>;

    async fn get_entry(&self, id: Uuid) -> StoreResult<Option<QueueEntry>>;

    /// Replaces the status and returns the one it replaced.
    async fn swap_status(&self, id: Uuid, status: QueueStatus) -> StoreResult<(QueueStatus, QueueEntry)>;

    /// Entries with `from <= queue_date < to`, in no particular order.
    async fn list_by_queue_date(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<QueueEntry>>;

    async fn list_for_schedule(&self, schedule_id: Uuid) -> StoreResult<Vec<QueueEntry>>;

    async fn list_for_patient(&self, patient_id: Uuid) -> StoreResult<Vec<QueueEntry>>;
}

#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// Emails are unique (case-insensitive).
    async fn insert_patient(&self, patient: Patient) -> StoreResult<Patient>;
    async fn get_patient(&self, id: Uuid) -> StoreResult<Option<Patient>>;
    async fn list_patients(&self) -> StoreResult<Vec<Patient>>;

    async fn insert_doctor(&self, doctor: Doctor) -> StoreResult<Doctor>;
    async fn get_doctor(&self, id: Uuid) -> StoreResult<Option<Doctor>>;
    async fn list_doctors(&self) -> StoreResult<Vec<Doctor>>;

    async fn insert_clinic(&self, clinic: Clinic) -> StoreResult<Clinic>;
    async fn get_clinic(&self, id: Uuid) -> StoreResult<Option<Clinic>>;
    async fn list_clinics(&self) -> StoreResult<Vec<Clinic>>;

    async fn insert_staff(&self, staff: StaffAccount) -> StoreResult<StaffAccount>;
    async fn get_staff(&self, id: Uuid) -> StoreResult<Option<StaffAccount>>;

    /// One credential per (class, email).
    async fn insert_credential(&self, class: UserClass, credential: Credential) -> StoreResult<()>;
    async fn find_credential(&self, class: UserClass, email: &str) -> StoreResult<Option<Credential>>;
}

pub(crate) fn email_key(email: &str) -> String {
    email.trim().to_lowercase()
}
