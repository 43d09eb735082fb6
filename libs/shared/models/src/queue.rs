use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueueStatus {
    Waiting,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
    Cancelled,
    #[serde(rename = "No Show")]
    NoShow,
}

impl QueueStatus {
    pub const ALL: [QueueStatus; 5] = [
        QueueStatus::Waiting,
        QueueStatus::InProgress,
        QueueStatus::Completed,
        QueueStatus::Cancelled,
        QueueStatus::NoShow,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            QueueStatus::Waiting => "Waiting",
            QueueStatus::InProgress => "In Progress",
            QueueStatus::Completed => "Completed",
            QueueStatus::Cancelled => "Cancelled",
            QueueStatus::NoShow => "No Show",
        }
    }

    /// Lower-cased, hyphenated label: "In Progress" -> "in-progress".
    pub fn normalized(&self) -> String {
        normalize_label(self.label())
    }

    /// Accepts the label, the normalized form, or snake_case.
    pub fn parse(raw: &str) -> Option<Self> {
        let wanted = normalize_label(&raw.replace('_', " "));
        Self::ALL.into_iter().find(|status| status.normalized() == wanted)
    }

    /// Whether an entry in this status holds one of its schedule's slots.
    pub fn holds_slot(&self) -> bool {
        !matches!(self, QueueStatus::Cancelled)
    }
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueuePriority {
    #[default]
    Normal,
    Emergency,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub clinic_id: Uuid,
    pub schedule_id: Uuid,
    pub queue_number: u32,
    pub queue_date: DateTime<Utc>,
    pub status: QueueStatus,
    pub priority: QueuePriority,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything about an entry except its id and number, which the store assigns.
#[derive(Debug, Clone)]
pub struct NewQueueEntry {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub clinic_id: Uuid,
    pub schedule_id: Uuid,
    pub queue_date: DateTime<Utc>,
    pub priority: QueuePriority,
    pub notes: Option<String>,
}

impl NewQueueEntry {
    pub fn into_entry(self, queue_number: u32) -> QueueEntry {
        let now = Utc::now();
        QueueEntry {
            id: Uuid::new_v4(),
            patient_id: self.patient_id,
            doctor_id: self.doctor_id,
            clinic_id: self.clinic_id,
            schedule_id: self.schedule_id,
            queue_number,
            queue_date: self.queue_date,
            status: QueueStatus::Waiting,
            priority: self.priority,
            notes: self.notes,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_status() {
        assert_eq!(QueueStatus::InProgress.normalized(), "in-progress");
        assert_eq!(QueueStatus::NoShow.normalized(), "no-show");
        assert_eq!(QueueStatus::Waiting.normalized(), "waiting");
    }

    #[test]
    fn test_parse_accepts_variants() {
        assert_eq!(QueueStatus::parse("In Progress"), Some(QueueStatus::InProgress));
        assert_eq!(QueueStatus::parse("in-progress"), Some(QueueStatus::InProgress));
        assert_eq!(QueueStatus::parse("no_show"), Some(QueueStatus::NoShow));
        assert_eq!(QueueStatus::parse("COMPLETED"), Some(QueueStatus::Completed));
        assert_eq!(QueueStatus::parse("done"), None);
    }

    #[test]
    fn test_serde_uses_labels() {
        let json = serde_json::to_string(&QueueStatus::InProgress).unwrap();
        assert_eq!(json, "\"In Progress\"");
        let parsed: QueueStatus = serde_json::from_str("\"No Show\"").unwrap();
        assert_eq!(parsed, QueueStatus::NoShow);
    }
}
