use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::queue::{QueueEntry, QueuePriority};

pub const DEFAULT_TODAY_LIMIT: usize = 100;

pub const UNKNOWN_PATIENT: &str = "Unknown Patient";
pub const UNKNOWN_DOCTOR: &str = "Unknown Doctor";
pub const UNKNOWN_CLINIC: &str = "Unknown Clinic";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueRequest {
    pub patient_id: Uuid,
    pub schedule_id: Uuid,
    pub notes: Option<String>,
    pub priority: Option<QueuePriority>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TodayQuery {
    pub limit: Option<usize>,
}

/// A queue entry as the display board and front desk see it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntryView {
    pub id: Uuid,
    pub queue_number: u32,
    pub patient_id: Uuid,
    pub patient_name: String,
    pub doctor_id: Uuid,
    pub doctor_name: String,
    pub clinic_id: Uuid,
    pub clinic_name: String,
    pub schedule_id: Uuid,
    /// Normalized, e.g. `in-progress`.
    pub status: String,
    pub priority: QueuePriority,
    pub notes: Option<String>,
    /// Minutes.
    pub wait_time: i64,
    pub queue_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl QueueEntryView {
    pub fn from_entry(
        entry: &QueueEntry,
        patient_name: Option<String>,
        doctor_name: Option<String>,
        clinic_name: Option<String>,
        wait_time: i64,
    ) -> Self {
        Self {
            id: entry.id,
            queue_number: entry.queue_number,
            patient_id: entry.patient_id,
            patient_name: patient_name.unwrap_or_else(|| UNKNOWN_PATIENT.to_string()),
            doctor_id: entry.doctor_id,
            doctor_name: doctor_name.unwrap_or_else(|| UNKNOWN_DOCTOR.to_string()),
            clinic_id: entry.clinic_id,
            clinic_name: clinic_name.unwrap_or_else(|| UNKNOWN_CLINIC.to_string()),
            schedule_id: entry.schedule_id,
            status: entry.status.normalized(),
            priority: entry.priority,
            notes: entry.notes.clone(),
            wait_time,
            queue_date: entry.queue_date,
            created_at: entry.created_at,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    pub total: usize,
    pub waiting: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub cancelled: usize,
    pub no_show: usize,
    /// Mean wait of entries still waiting, in minutes.
    pub average_wait_minutes: f64,
}
