use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScheduleStatus {
    Active,
    Cancelled,
    Completed,
    Full,
}

impl ScheduleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleStatus::Active => "Active",
            ScheduleStatus::Cancelled => "Cancelled",
            ScheduleStatus::Completed => "Completed",
            ScheduleStatus::Full => "Full",
        }
    }

    /// Active and Full schedules both occupy the doctor's time.
    pub fn occupies_time(&self) -> bool {
        matches!(self, ScheduleStatus::Active | ScheduleStatus::Full)
    }

    pub fn accepts_bookings(&self) -> bool {
        matches!(self, ScheduleStatus::Active)
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "active" => Some(ScheduleStatus::Active),
            "cancelled" => Some(ScheduleStatus::Cancelled),
            "completed" => Some(ScheduleStatus::Completed),
            "full" => Some(ScheduleStatus::Full),
            _ => None,
        }
    }
}

impl fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub clinic_id: Uuid,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub total_slots: u32,
    pub booked_slots: u32,
    pub available_slots: u32,
    pub status: ScheduleStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Schedule {
    pub fn new(
        doctor_id: Uuid,
        clinic_id: Uuid,
        date: NaiveDate,
        start_time: String,
        end_time: String,
        total_slots: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            doctor_id,
            clinic_id,
            date,
            start_time,
            end_time,
            total_slots,
            booked_slots: 0,
            available_slots: total_slots,
            status: ScheduleStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    /// Same-day overlap: `start < other.end && end > other.start`.
    /// Times are zero-padded "HH:MM" so lexical order is chronological.
    pub fn overlaps(&self, start_time: &str, end_time: &str) -> bool {
        start_time < self.end_time.as_str() && end_time > self.start_time.as_str()
    }

    /// Recomputes `available_slots` and flips Active/Full to match capacity.
    pub fn apply_counts(&mut self, total_slots: u32, booked_slots: u32) {
        self.total_slots = total_slots;
        self.booked_slots = booked_slots;
        self.available_slots = total_slots.saturating_sub(booked_slots);
        self.status = match self.status {
            ScheduleStatus::Active | ScheduleStatus::Full if self.available_slots == 0 => {
                ScheduleStatus::Full
            }
            ScheduleStatus::Full => ScheduleStatus::Active,
            other => other,
        };
        self.updated_at = Utc::now();
    }

    pub fn start_naive_time(&self) -> Option<NaiveTime> {
        parse_clock_time(&self.start_time)
    }
}

/// Parses "H:MM" / "HH:MM" into a time of day.
pub fn parse_clock_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M").ok()
}

/// Canonical zero-padded "HH:MM" form used for storage and overlap checks.
pub fn normalize_clock_time(raw: &str) -> Option<String> {
    parse_clock_time(raw).map(|t| t.format("%H:%M").to_string())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleFilter {
    pub doctor_id: Option<Uuid>,
    pub clinic_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub status: Option<ScheduleStatus>,
}

impl ScheduleFilter {
    pub fn matches(&self, schedule: &Schedule) -> bool {
        self.doctor_id.map_or(true, |id| schedule.doctor_id == id)
            && self.clinic_id.map_or(true, |id| schedule.clinic_id == id)
            && self.date.map_or(true, |date| schedule.date == date)
            && self.status.map_or(true, |status| schedule.status == status)
    }
}
