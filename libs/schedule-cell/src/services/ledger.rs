use std::sync::Arc;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use shared_database::{Database, DirectoryStore, ScheduleStore};
use shared_models::schedule::{normalize_clock_time, Schedule, ScheduleFilter, ScheduleStatus};

use crate::error::ScheduleError;
use crate::models::CreateScheduleRequest;

/// Slot bookkeeping for doctors' daily schedules.
///
/// Counter changes go through single atomic store operations; the ledger only
/// validates input and checks the `available = total - booked` invariant on
/// whatever the store hands back.
pub struct ScheduleLedger {
    schedules: Arc<dyn ScheduleStore>,
    directory: Arc<dyn DirectoryStore>,
}

impl ScheduleLedger {
    pub fn new(database: &Database) -> Self {
        Self {
            schedules: database.schedules.clone(),
            directory: database.directory.clone(),
        }
    }

    pub async fn create_schedule(&self, request: CreateScheduleRequest) -> Result<Schedule, ScheduleError> {
        let start_time = normalize_clock_time(&request.start_time).ok_or_else(|| {
            ScheduleError::Validation(format!("Invalid start time '{}', expected HH:MM", request.start_time))
        })?;
        let end_time = normalize_clock_time(&request.end_time).ok_or_else(|| {
            ScheduleError::Validation(format!("Invalid end time '{}', expected HH:MM", request.end_time))
        })?;

        if start_time >= end_time {
            return Err(ScheduleError::Validation(
                "Start time must be before end time".to_string(),
            ));
        }
        if request.total_slots == 0 {
            return Err(ScheduleError::Validation(
                "Total slots must be at least 1".to_string(),
            ));
        }

        if self.directory.get_doctor(request.doctor_id).await?.is_none() {
            return Err(ScheduleError::NotFound(format!("Doctor {}", request.doctor_id)));
        }
        if self.directory.get_clinic(request.clinic_id).await?.is_none() {
            return Err(ScheduleError::NotFound(format!("Clinic {}", request.clinic_id)));
        }

        let schedule = Schedule::new(
            request.doctor_id,
            request.clinic_id,
            request.date,
            start_time,
            end_time,
            request.total_slots,
        );

        let created = self.schedules.insert_if_no_overlap(schedule).await?;
        info!(
            "Created schedule {} for doctor {} on {} {}-{} ({} slots)",
            created.id, created.doctor_id, created.date, created.start_time, created.end_time, created.total_slots
        );
        Ok(created)
    }

    pub async fn get_schedule(&self, schedule_id: Uuid) -> Result<Schedule, ScheduleError> {
        self.schedules
            .get_schedule(schedule_id)
            .await?
            .ok_or_else(|| ScheduleError::NotFound(format!("Schedule {}", schedule_id)))
    }

    /// Ordered by date, then start time.
    pub async fn list_schedules(&self, filter: &ScheduleFilter) -> Result<Vec<Schedule>, ScheduleError> {
        let mut schedules = self.schedules.list_schedules(filter).await?;
        schedules.sort_by(|a, b| {
            a.date
                .cmp(&b.date)
                .then_with(|| a.start_time.cmp(&b.start_time))
        });
        Ok(schedules)
    }

    pub async fn reserve_slot(&self, schedule_id: Uuid) -> Result<Schedule, ScheduleError> {
        let schedule = self.schedules.reserve_slot(schedule_id).await?;
        check_counts(&schedule)?;
        debug!(
            "Reserved slot on schedule {} ({}/{} booked)",
            schedule.id, schedule.booked_slots, schedule.total_slots
        );
        Ok(schedule)
    }

    pub async fn release_slot(&self, schedule_id: Uuid) -> Result<Schedule, ScheduleError> {
        let schedule = self.schedules.release_slot(schedule_id).await?;
        check_counts(&schedule)?;
        debug!(
            "Released slot on schedule {} ({}/{} booked)",
            schedule.id, schedule.booked_slots, schedule.total_slots
        );
        Ok(schedule)
    }

    pub async fn update_total_slots(&self, schedule_id: Uuid, new_total: u32) -> Result<Schedule, ScheduleError> {
        let schedule = self.schedules.set_total_slots(schedule_id, new_total).await?;
        check_counts(&schedule)?;
        info!("Schedule {} now has {} total slots", schedule.id, schedule.total_slots);
        Ok(schedule)
    }

    /// Soft-cancels; refused while any slot is booked. Every queue entry that
    /// is not Cancelled holds one slot, and an enqueue books before it inserts.
    pub async fn cancel_schedule(&self, schedule_id: Uuid) -> Result<Schedule, ScheduleError> {
        match self.schedules.cancel_if_unbooked(schedule_id).await {
            Ok(cancelled) => {
                info!("Cancelled schedule {}", schedule_id);
                Ok(cancelled)
            }
            Err(e) => {
                let e = ScheduleError::from(e);
                if let ScheduleError::SchedulesInUse { active_entries } = &e {
                    warn!(
                        "Refusing to cancel schedule {}: {} active queue entries",
                        schedule_id, active_entries
                    );
                }
                Err(e)
            }
        }
    }

    pub async fn complete_schedule(&self, schedule_id: Uuid) -> Result<Schedule, ScheduleError> {
        let schedule = self.get_schedule(schedule_id).await?;
        if schedule.status == ScheduleStatus::Cancelled {
            return Err(ScheduleError::Validation(
                "A cancelled schedule cannot be completed".to_string(),
            ));
        }

        let completed = self
            .schedules
            .set_schedule_status(schedule_id, ScheduleStatus::Completed)
            .await?;
        info!("Completed schedule {}", schedule_id);
        Ok(completed)
    }
}

fn check_counts(schedule: &Schedule) -> Result<(), ScheduleError> {
    if schedule.booked_slots > schedule.total_slots
        || schedule.available_slots + schedule.booked_slots != schedule.total_slots
    {
        let detail = format!(
            "schedule {} reports total={} booked={} available={}",
            schedule.id, schedule.total_slots, schedule.booked_slots, schedule.available_slots
        );
        error!("Slot ledger invariant violated: {}", detail);
        return Err(ScheduleError::Invariant(detail));
    }
    Ok(())
}
