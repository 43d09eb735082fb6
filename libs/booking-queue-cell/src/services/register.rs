use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use schedule_cell::ScheduleLedger;
use shared_database::{Database, DirectoryStore, QueueStore};
use shared_models::queue::{NewQueueEntry, QueueEntry, QueueStatus};
use shared_models::schedule::Schedule;

use crate::models::{EnqueueRequest, QueueEntryView, QueueStats, DEFAULT_TODAY_LIMIT};
use crate::services::notifier::QueueNotifier;
use crate::QueueError;

/// Patient queue on top of the schedule ledger.
///
/// Every mutation is followed by a best-effort push of today's queue to the
/// notifier. Push failures are logged and never reach the caller.
pub struct QueueRegister {
    ledger: Arc<ScheduleLedger>,
    queue: Arc<dyn QueueStore>,
    directory: Arc<dyn DirectoryStore>,
    notifier: QueueNotifier,
}

impl QueueRegister {
    pub fn new(database: &Database, ledger: Arc<ScheduleLedger>, notifier: QueueNotifier) -> Self {
        Self {
            ledger,
            queue: database.queue.clone(),
            directory: database.directory.clone(),
            notifier,
        }
    }

    pub fn notifier(&self) -> &QueueNotifier {
        &self.notifier
    }

    pub async fn enqueue(&self, request: EnqueueRequest) -> Result<QueueEntry, QueueError> {
        let schedule = self.ledger.get_schedule(request.schedule_id).await?;

        if self.directory.get_patient(request.patient_id).await?.is_none() {
            return Err(QueueError::NotFound(format!("Patient {}", request.patient_id)));
        }

        if !schedule.status.accepts_bookings() || schedule.available_slots == 0 {
            return Err(QueueError::SlotUnavailable(format!(
                "schedule {} is {} with {} slots left",
                schedule.id, schedule.status, schedule.available_slots
            )));
        }

        let schedule = self.ledger.reserve_slot(schedule.id).await?;

        let notes = request
            .notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        let new_entry = NewQueueEntry {
            patient_id: request.patient_id,
            doctor_id: schedule.doctor_id,
            clinic_id: schedule.clinic_id,
            schedule_id: schedule.id,
            queue_date: queue_date_for(&schedule),
            priority: request.priority.unwrap_or_default(),
            notes,
        };

        let entry = match self.queue.insert_next(new_entry).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Queue insert failed on schedule {}, releasing slot: {}", schedule.id, e);
                if let Err(release_err) = self.ledger.release_slot(schedule.id).await {
                    error!(
                        "Could not release slot on schedule {} after failed insert: {}",
                        schedule.id, release_err
                    );
                }
                return Err(e.into());
            }
        };

        info!(
            "Patient {} queued as #{} on schedule {}",
            entry.patient_id, entry.queue_number, entry.schedule_id
        );

        self.broadcast_today().await;
        Ok(entry)
    }

    /// Any status may replace any other. Crossing the Cancelled boundary
    /// releases or re-reserves the entry's slot.
    pub async fn update_status(&self, queue_id: Uuid, status: QueueStatus) -> Result<QueueEntry, QueueError> {
        let entry = self.apply_status(queue_id, status).await?;
        self.broadcast_today().await;
        Ok(entry)
    }

    pub async fn cancel(&self, queue_id: Uuid) -> Result<QueueEntry, QueueError> {
        let entry = self.get_entry(queue_id).await?;
        if entry.status == QueueStatus::Cancelled {
            debug!("Queue entry {} already cancelled", queue_id);
            return Ok(entry);
        }

        self.update_status(queue_id, QueueStatus::Cancelled).await
    }

    pub async fn get_entry(&self, queue_id: Uuid) -> Result<QueueEntry, QueueError> {
        self.queue
            .get_entry(queue_id)
            .await?
            .ok_or_else(|| QueueError::NotFound(format!("Queue entry {}", queue_id)))
    }

    pub async fn list_today(&self, limit: usize) -> Result<Vec<QueueEntryView>, QueueError> {
        let mut entries = self.today_entries().await?;
        entries.truncate(limit);
        self.annotate(entries).await
    }

    pub async fn list_for_schedule(&self, schedule_id: Uuid) -> Result<Vec<QueueEntry>, QueueError> {
        let mut entries = self.queue.list_for_schedule(schedule_id).await?;
        entries.sort_by_key(|entry| entry.queue_number);
        Ok(entries)
    }

    /// Newest visit first.
    pub async fn list_for_patient(&self, patient_id: Uuid) -> Result<Vec<QueueEntry>, QueueError> {
        let mut entries = self.queue.list_for_patient(patient_id).await?;
        entries.sort_by(|a, b| {
            b.queue_date
                .cmp(&a.queue_date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(entries)
    }

    pub async fn today_stats(&self) -> Result<QueueStats, QueueError> {
        let entries = self.today_entries().await?;
        let now = Utc::now();

        let mut stats = QueueStats {
            total: entries.len(),
            ..QueueStats::default()
        };
        let mut waiting_minutes = 0i64;

        for entry in &entries {
            match entry.status {
                QueueStatus::Waiting => {
                    stats.waiting += 1;
                    waiting_minutes += compute_wait_time(entry, now);
                }
                QueueStatus::InProgress => stats.in_progress += 1,
                QueueStatus::Completed => stats.completed += 1,
                QueueStatus::Cancelled => stats.cancelled += 1,
                QueueStatus::NoShow => stats.no_show += 1,
            }
        }

        if stats.waiting > 0 {
            stats.average_wait_minutes = waiting_minutes as f64 / stats.waiting as f64;
        }

        Ok(stats)
    }

    async fn apply_status(&self, queue_id: Uuid, status: QueueStatus) -> Result<QueueEntry, QueueError> {
        let (previous, entry) = self.queue.swap_status(queue_id, status).await?;

        let slot_change = match (previous.holds_slot(), status.holds_slot()) {
            (true, false) => self.ledger.release_slot(entry.schedule_id).await.map(|_| ()),
            (false, true) => self.ledger.reserve_slot(entry.schedule_id).await.map(|_| ()),
            _ => Ok(()),
        };

        if let Err(e) = slot_change {
            self.revert_status(queue_id, previous).await;
            return Err(e.into());
        }

        info!("Queue entry {} moved from {} to {}", queue_id, previous, status);
        Ok(entry)
    }

    /// Puts back the status a failed slot change was paired with.
    async fn revert_status(&self, queue_id: Uuid, previous: QueueStatus) {
        if let Err(e) = self.queue.swap_status(queue_id, previous).await {
            error!(
                "Could not restore status {} on queue entry {}: {}",
                previous, queue_id, e
            );
        }
    }

    async fn today_entries(&self) -> Result<Vec<QueueEntry>, QueueError> {
        let (from, to) = day_bounds(Local::now().date_naive());
        let mut entries = self.queue.list_by_queue_date(from, to).await?;
        entries.sort_by(|a, b| {
            a.queue_number
                .cmp(&b.queue_number)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        Ok(entries)
    }

    async fn annotate(&self, entries: Vec<QueueEntry>) -> Result<Vec<QueueEntryView>, QueueError> {
        let now = Utc::now();
        let mut patients: HashMap<Uuid, Option<String>> = HashMap::new();
        let mut doctors: HashMap<Uuid, Option<String>> = HashMap::new();
        let mut clinics: HashMap<Uuid, Option<String>> = HashMap::new();

        let mut views = Vec::with_capacity(entries.len());
        for entry in &entries {
            if !patients.contains_key(&entry.patient_id) {
                let name = self.directory.get_patient(entry.patient_id).await?.map(|p| p.full_name());
                patients.insert(entry.patient_id, name);
            }
            if !doctors.contains_key(&entry.doctor_id) {
                let name = self.directory.get_doctor(entry.doctor_id).await?.map(|d| d.full_name());
                doctors.insert(entry.doctor_id, name);
            }
            if !clinics.contains_key(&entry.clinic_id) {
                let name = self.directory.get_clinic(entry.clinic_id).await?.map(|c| c.name);
                clinics.insert(entry.clinic_id, name);
            }

            views.push(QueueEntryView::from_entry(
                entry,
                patients.get(&entry.patient_id).cloned().flatten(),
                doctors.get(&entry.doctor_id).cloned().flatten(),
                clinics.get(&entry.clinic_id).cloned().flatten(),
                compute_wait_time(entry, now),
            ));
        }

        Ok(views)
    }

    async fn broadcast_today(&self) {
        let snapshot = match self.list_today(DEFAULT_TODAY_LIMIT).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Could not build queue snapshot for viewers: {}", e);
                return;
            }
        };

        if let Err(e) = self.notifier.publish(&snapshot) {
            warn!("Queue broadcast failed: {}", e);
        }
    }
}

/// Whole minutes since the entry was created. Finished entries no longer wait.
pub fn compute_wait_time(entry: &QueueEntry, now: DateTime<Utc>) -> i64 {
    match entry.status {
        QueueStatus::Completed | QueueStatus::Cancelled => 0,
        _ => (now - entry.created_at).num_minutes().max(0),
    }
}

/// The schedule's date at its start time, in server-local time.
pub fn queue_date_for(schedule: &Schedule) -> DateTime<Utc> {
    let start = schedule.start_naive_time().unwrap_or(NaiveTime::MIN);
    local_to_utc(schedule.date, start)
}

/// `[local midnight of day, local midnight of the next day)` in UTC.
pub fn day_bounds(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let next = day.succ_opt().unwrap_or(NaiveDate::MAX);
    (local_to_utc(day, NaiveTime::MIN), local_to_utc(next, NaiveTime::MIN))
}

fn local_to_utc(date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    let naive = date.and_time(time);
    match Local.from_local_datetime(&naive).earliest() {
        Some(local) => local.with_timezone(&Utc),
        // Skipped by a DST jump.
        None => Utc.from_utc_datetime(&naive),
    }
}
