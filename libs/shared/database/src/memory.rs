//! In-memory store.
//!
//! Every trait operation takes the write (or read) lock exactly once, so each
//! counter update and each number assignment is a single critical section.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use shared_models::auth::{Credential, UserClass};
use shared_models::directory::{Clinic, Doctor, Patient, StaffAccount};
use shared_models::queue::{NewQueueEntry, QueueEntry, QueueStatus};
use shared_models::schedule::{Schedule, ScheduleFilter, ScheduleStatus};

use crate::error::{StoreError, StoreResult};
use crate::store::{email_key, DirectoryStore, QueueStore, ScheduleStore};

#[derive(Default)]
struct MemoryData {
    schedules: HashMap<Uuid, Schedule>,
    entries: HashMap<Uuid, QueueEntry>,
    queue_counters: HashMap<Uuid, u32>,
    patients: HashMap<Uuid, Patient>,
    doctors: HashMap<Uuid, Doctor>,
    clinics: HashMap<Uuid, Clinic>,
    staff: HashMap<Uuid, StaffAccount>,
    credentials: HashMap<(UserClass, String), Credential>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    data: Arc<RwLock<MemoryData>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn schedule_mut(data: &mut MemoryData, id: Uuid) -> StoreResult<&mut Schedule> {
    data.schedules
        .get_mut(&id)
        .ok_or_else(|| StoreError::not_found("Schedule", id))
}

#[async_trait]
impl ScheduleStore for MemoryStore {
    async fn insert_if_no_overlap(&self, schedule: Schedule) -> StoreResult<Schedule> {
        let mut data = self.data.write().await;

        let conflict = data.schedules.values().find(|existing| {
            existing.doctor_id == schedule.doctor_id
                && existing.date == schedule.date
                && existing.status.occupies_time()
                && existing.overlaps(&schedule.start_time, &schedule.end_time)
        });

        if let Some(existing) = conflict {
            return Err(StoreError::Overlap(existing.id));
        }

        data.schedules.insert(schedule.id, schedule.clone());
        Ok(schedule)
    }

    async fn get_schedule(&self, id: Uuid) -> StoreResult<Option<Schedule>> {
        let data = self.data.read().await;
        Ok(data.schedules.get(&id).cloned())
    }

    async fn list_schedules(&self, filter: &ScheduleFilter) -> StoreResult<Vec<Schedule>> {
        let data = self.data.read().await;
        Ok(data
            .schedules
            .values()
            .filter(|schedule| filter.matches(schedule))
            .cloned()
            .collect())
    }

    async fn reserve_slot(&self, id: Uuid) -> StoreResult<Schedule> {
        let mut data = self.data.write().await;
        let schedule = schedule_mut(&mut data, id)?;

        if matches!(schedule.status, ScheduleStatus::Cancelled | ScheduleStatus::Completed) {
            return Err(StoreError::NotBookable {
                id,
                status: schedule.status.to_string(),
            });
        }
        if schedule.booked_slots > schedule.total_slots {
            return Err(StoreError::Invariant(format!(
                "schedule {} has {} booked of {} total",
                id, schedule.booked_slots, schedule.total_slots
            )));
        }
        if schedule.booked_slots == schedule.total_slots {
            return Err(StoreError::CapacityExceeded(id));
        }

        let (total, booked) = (schedule.total_slots, schedule.booked_slots + 1);
        schedule.apply_counts(total, booked);
        Ok(schedule.clone())
    }

    async fn release_slot(&self, id: Uuid) -> StoreResult<Schedule> {
        let mut data = self.data.write().await;
        let schedule = schedule_mut(&mut data, id)?;

        if schedule.booked_slots == 0 {
            return Err(StoreError::Invariant(format!(
                "release on schedule {} with no booked slots",
                id
            )));
        }

        let (total, booked) = (schedule.total_slots, schedule.booked_slots - 1);
        schedule.apply_counts(total, booked);
        Ok(schedule.clone())
    }

    async fn set_total_slots(&self, id: Uuid, total: u32) -> StoreResult<Schedule> {
        let mut data = self.data.write().await;
        let schedule = schedule_mut(&mut data, id)?;

        if total < schedule.booked_slots {
            return Err(StoreError::BelowBooked {
                booked: schedule.booked_slots,
                requested: total,
            });
        }

        let booked = schedule.booked_slots;
        schedule.apply_counts(total, booked);
        Ok(schedule.clone())
    }

    async fn set_schedule_status(&self, id: Uuid, status: ScheduleStatus) -> StoreResult<Schedule> {
        let mut data = self.data.write().await;
        let schedule = schedule_mut(&mut data, id)?;
        schedule.status = status;
        schedule.updated_at = Utc::now();
        Ok(schedule.clone())
    }

    async fn cancel_if_unbooked(&self, id: Uuid) -> StoreResult<Schedule> {
        let mut data = self.data.write().await;
        let schedule = schedule_mut(&mut data, id)?;

        if schedule.status == ScheduleStatus::Cancelled {
            return Ok(schedule.clone());
        }
        if schedule.booked_slots > 0 {
            return Err(StoreError::InUse {
                id,
                booked: schedule.booked_slots,
            });
        }

        schedule.status = ScheduleStatus::Cancelled;
        schedule.updated_at = Utc::now();
        Ok(schedule.clone())
    }
}

#[async_trait]
impl QueueStore for MemoryStore {
    async fn insert_next(&self, entry: NewQueueEntry) -> StoreResult<QueueEntry> {
        let mut data = self.data.write().await;

        let counter = data.queue_counters.entry(entry.schedule_id).or_insert(0);
        *counter += 1;
        let entry = entry.into_entry(*counter);

        data.entries.insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn get_entry(&self, id: Uuid) -> StoreResult<Option<QueueEntry>> {
        let data = self.data.read().await;
        Ok(data.entries.get(&id).cloned())
    }

    async fn swap_status(&self, id: Uuid, status: QueueStatus) -> StoreResult<(QueueStatus, QueueEntry)> {
        let mut data = self.data.write().await;
        let entry = data
            .entries
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("Queue entry", id))?;

        let previous = entry.status;
        entry.status = status;
        entry.updated_at = Utc::now();
        Ok((previous, entry.clone()))
    }

    async fn list_by_queue_date(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<QueueEntry>> {
        let data = self.data.read().await;
        Ok(data
            .entries
            .values()
            .filter(|entry| entry.queue_date >= from && entry.queue_date < to)
            .cloned()
            .collect())
    }

    async fn list_for_schedule(&self, schedule_id: Uuid) -> StoreResult<Vec<QueueEntry>> {
        let data = self.data.read().await;
        Ok(data
            .entries
            .values()
            .filter(|entry| entry.schedule_id == schedule_id)
            .cloned()
            .collect())
    }

    async fn list_for_patient(&self, patient_id: Uuid) -> StoreResult<Vec<QueueEntry>> {
        let data = self.data.read().await;
        Ok(data
            .entries
            .values()
            .filter(|entry| entry.patient_id == patient_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl DirectoryStore for MemoryStore {
    async fn insert_patient(&self, patient: Patient) -> StoreResult<Patient> {
        let mut data = self.data.write().await;
        let email = email_key(&patient.email);
        if data.patients.values().any(|p| email_key(&p.email) == email) {
            return Err(StoreError::Duplicate(format!("patient email {}", email)));
        }
        data.patients.insert(patient.id, patient.clone());
        Ok(patient)
    }

    async fn get_patient(&self, id: Uuid) -> StoreResult<Option<Patient>> {
        Ok(self.data.read().await.patients.get(&id).cloned())
    }

    async fn list_patients(&self) -> StoreResult<Vec<Patient>> {
        Ok(self.data.read().await.patients.values().cloned().collect())
    }

    async fn insert_doctor(&self, doctor: Doctor) -> StoreResult<Doctor> {
        self.data.write().await.doctors.insert(doctor.id, doctor.clone());
        Ok(doctor)
    }

    async fn get_doctor(&self, id: Uuid) -> StoreResult<Option<Doctor>> {
        Ok(self.data.read().await.doctors.get(&id).cloned())
    }

    async fn list_doctors(&self) -> StoreResult<Vec<Doctor>> {
        Ok(self.data.read().await.doctors.values().cloned().collect())
    }

    async fn insert_clinic(&self, clinic: Clinic) -> StoreResult<Clinic> {
        self.data.write().await.clinics.insert(clinic.id, clinic.clone());
        Ok(clinic)
    }

    async fn get_clinic(&self, id: Uuid) -> StoreResult<Option<Clinic>> {
        Ok(self.data.read().await.clinics.get(&id).cloned())
    }

    async fn list_clinics(&self) -> StoreResult<Vec<Clinic>> {
        Ok(self.data.read().await.clinics.values().cloned().collect())
    }

    async fn insert_staff(&self, staff: StaffAccount) -> StoreResult<StaffAccount> {
        let mut data = self.data.write().await;
        let email = email_key(&staff.email);
        if data.staff.values().any(|s| email_key(&s.email) == email) {
            return Err(StoreError::Duplicate(format!("staff email {}", email)));
        }
        data.staff.insert(staff.id, staff.clone());
        Ok(staff)
    }

    async fn get_staff(&self, id: Uuid) -> StoreResult<Option<StaffAccount>> {
        Ok(self.data.read().await.staff.get(&id).cloned())
    }

    async fn insert_credential(&self, class: UserClass, credential: Credential) -> StoreResult<()> {
        let mut data = self.data.write().await;
        let key = (class, email_key(&credential.email));
        if data.credentials.contains_key(&key) {
            return Err(StoreError::Duplicate(format!("credential {}", key.1)));
        }
        data.credentials.insert(key, credential);
        Ok(())
    }

    async fn find_credential(&self, class: UserClass, email: &str) -> StoreResult<Option<Credential>> {
        let data = self.data.read().await;
        Ok(data.credentials.get(&(class, email_key(email))).cloned())
    }
}
