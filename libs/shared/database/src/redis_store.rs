//! Redis-backed store.
//!
//! Layout:
//! - `schedule:{id}` hash: `json` (static fields), `total`, `booked`, `status`,
//!   `start`, `end`, `updated_at`
//! - `schedules:all` set, `doctor_schedules:{doctor}:{date}` set
//! - `queue_entry:{id}` hash: `json`, `number`, `status`, `updated_at`
//! - `queue_seq:{schedule}` counter, `queue_by_date` sorted set (score = queue_date ms)
//! - `schedule_entries:{schedule}` / `patient_entries:{patient}` sets
//! - `patient:{id}`, `doctor:{id}`, `clinic:{id}`, `staff:{id}` JSON strings with
//!   `*:all` sets and `*_email:{email}` uniqueness keys
//! - `credential:{class}:{email}` JSON strings
//!
//! Counter mutations run as Lua scripts so each one is atomic on the server.
//!
//! Assumes a standalone Redis (or a single primary). The schedule insert script
//! reads `schedule:{id}` hashes it finds through the doctor's day set, and those
//! keys are not declared in `KEYS`, so it cannot run on Redis Cluster.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_redis::{Config, Connection, Pool, Runtime};
use redis::{AsyncCommands, Script};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use shared_models::auth::{Credential, UserClass};
use shared_models::directory::{Clinic, Doctor, Patient, StaffAccount};
use shared_models::queue::{NewQueueEntry, QueueEntry, QueueStatus};
use shared_models::schedule::{Schedule, ScheduleFilter, ScheduleStatus};

use crate::error::{StoreError, StoreResult};
use crate::store::{email_key, DirectoryStore, QueueStore, ScheduleStore};

const INSERT_SCHEDULE: &str = r#"
for _, member in ipairs(redis.call('SMEMBERS', KEYS[1])) do
    local key = ARGV[7] .. 'schedule:' .. member
    local status = redis.call('HGET', key, 'status')
    if status == 'Active' or status == 'Full' then
        local s = redis.call('HGET', key, 'start')
        local e = redis.call('HGET', key, 'end')
        if ARGV[2] < e and ARGV[3] > s then
            return member
        end
    end
end
redis.call('HSET', KEYS[2],
    'json', ARGV[4], 'total', ARGV[5], 'booked', 0, 'status', 'Active',
    'start', ARGV[2], 'end', ARGV[3], 'updated_at', ARGV[6])
redis.call('SADD', KEYS[1], ARGV[1])
redis.call('SADD', KEYS[3], ARGV[1])
return ''
"#;

// -1 missing, -2 not bookable, -3 full, -4 counters corrupt
const RESERVE_SLOT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 0 then return -1 end
local status = redis.call('HGET', KEYS[1], 'status')
if status == 'Cancelled' or status == 'Completed' then return -2 end
local total = tonumber(redis.call('HGET', KEYS[1], 'total'))
local booked = tonumber(redis.call('HGET', KEYS[1], 'booked'))
if booked > total then return -4 end
if booked == total then return -3 end
booked = redis.call('HINCRBY', KEYS[1], 'booked', 1)
if booked == total then redis.call('HSET', KEYS[1], 'status', 'Full') end
redis.call('HSET', KEYS[1], 'updated_at', ARGV[1])
return booked
"#;

// -1 missing, -4 nothing booked
const RELEASE_SLOT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 0 then return -1 end
local booked = tonumber(redis.call('HGET', KEYS[1], 'booked'))
if booked <= 0 then return -4 end
booked = redis.call('HINCRBY', KEYS[1], 'booked', -1)
if redis.call('HGET', KEYS[1], 'status') == 'Full' then
    redis.call('HSET', KEYS[1], 'status', 'Active')
end
redis.call('HSET', KEYS[1], 'updated_at', ARGV[1])
return booked
"#;

// -1 missing, -5 below booked
const SET_TOTAL_SLOTS: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 0 then return -1 end
local total = tonumber(ARGV[1])
local booked = tonumber(redis.call('HGET', KEYS[1], 'booked'))
if total < booked then return -5 end
redis.call('HSET', KEYS[1], 'total', total, 'updated_at', ARGV[2])
local status = redis.call('HGET', KEYS[1], 'status')
if status == 'Active' or status == 'Full' then
    if total == booked then
        redis.call('HSET', KEYS[1], 'status', 'Full')
    else
        redis.call('HSET', KEYS[1], 'status', 'Active')
    end
end
return booked
"#;

// -1 missing, >0 booked slots left, 0 cancelled (or already was)
const CANCEL_IF_UNBOOKED: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 0 then return -1 end
if redis.call('HGET', KEYS[1], 'status') == 'Cancelled' then return 0 end
local booked = tonumber(redis.call('HGET', KEYS[1], 'booked'))
if booked > 0 then return booked end
redis.call('HSET', KEYS[1], 'status', 'Cancelled', 'updated_at', ARGV[1])
return 0
"#;

const INSERT_QUEUE_ENTRY: &str = r#"
local number = redis.call('INCR', KEYS[1])
redis.call('HSET', KEYS[2],
    'json', ARGV[2], 'number', number, 'status', 'Waiting', 'updated_at', ARGV[3])
redis.call('ZADD', KEYS[3], ARGV[4], ARGV[1])
redis.call('SADD', KEYS[4], ARGV[1])
redis.call('SADD', KEYS[5], ARGV[1])
return number
"#;

const SWAP_STATUS: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 0 then return false end
local previous = redis.call('HGET', KEYS[1], 'status')
redis.call('HSET', KEYS[1], 'status', ARGV[1], 'updated_at', ARGV[2])
return previous
"#;

struct Scripts {
    insert_schedule: Script,
    reserve_slot: Script,
    release_slot: Script,
    set_total_slots: Script,
    cancel_if_unbooked: Script,
    insert_queue_entry: Script,
    swap_status: Script,
}

impl Scripts {
    fn load() -> Self {
        Self {
            insert_schedule: Script::new(INSERT_SCHEDULE),
            reserve_slot: Script::new(RESERVE_SLOT),
            release_slot: Script::new(RELEASE_SLOT),
            set_total_slots: Script::new(SET_TOTAL_SLOTS),
            cancel_if_unbooked: Script::new(CANCEL_IF_UNBOOKED),
            insert_queue_entry: Script::new(INSERT_QUEUE_ENTRY),
            swap_status: Script::new(SWAP_STATUS),
        }
    }
}

pub struct RedisStore {
    pool: Pool,
    prefix: String,
    scripts: Scripts,
}

impl RedisStore {
    pub async fn connect(redis_url: &str) -> StoreResult<Self> {
        Self::connect_with_prefix(redis_url, "").await
    }

    /// Every key is namespaced under `prefix`, which lets tests share a server.
    pub async fn connect_with_prefix(redis_url: &str, prefix: &str) -> StoreResult<Self> {
        let cfg = Config::from_url(redis_url);
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| StoreError::Backend(format!("Pool creation error: {}", e)))?;

        let mut conn = pool
            .get()
            .await
            .map_err(|e| StoreError::Backend(format!("Connection error: {}", e)))?;

        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        info!("Redis store initialized successfully");

        Ok(Self {
            pool,
            prefix: prefix.to_string(),
            scripts: Scripts::load(),
        })
    }

    async fn conn(&self) -> StoreResult<Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to get Redis connection: {}", e)))
    }

    fn key(&self, suffix: impl AsRef<str>) -> String {
        format!("{}{}", self.prefix, suffix.as_ref())
    }

    fn schedule_key(&self, id: Uuid) -> String {
        self.key(format!("schedule:{}", id))
    }

    fn entry_key(&self, id: Uuid) -> String {
        self.key(format!("queue_entry:{}", id))
    }

    async fn read_schedule(&self, conn: &mut Connection, id: Uuid) -> StoreResult<Option<Schedule>> {
        let (json, total, booked, status, updated_at): (
            Option<String>,
            Option<u32>,
            Option<u32>,
            Option<String>,
            Option<String>,
        ) = redis::cmd("HMGET")
            .arg(self.schedule_key(id))
            .arg("json")
            .arg("total")
            .arg("booked")
            .arg("status")
            .arg("updated_at")
            .query_async(conn)
            .await?;

        let Some(json) = json else {
            return Ok(None);
        };

        let mut schedule: Schedule = serde_json::from_str(&json)?;
        let total = total.unwrap_or(schedule.total_slots);
        let booked = booked.unwrap_or(0);
        schedule.total_slots = total;
        schedule.booked_slots = booked;
        schedule.available_slots = total.saturating_sub(booked);
        if let Some(status) = status.as_deref().and_then(ScheduleStatus::parse) {
            schedule.status = status;
        }
        if let Some(updated_at) = parse_timestamp(updated_at.as_deref()) {
            schedule.updated_at = updated_at;
        }
        Ok(Some(schedule))
    }

    async fn require_schedule(&self, conn: &mut Connection, id: Uuid) -> StoreResult<Schedule> {
        self.read_schedule(conn, id)
            .await?
            .ok_or_else(|| StoreError::not_found("Schedule", id))
    }

    async fn read_entry(&self, conn: &mut Connection, id: Uuid) -> StoreResult<Option<QueueEntry>> {
        let (json, number, status, updated_at): (
            Option<String>,
            Option<u32>,
            Option<String>,
            Option<String>,
        ) = redis::cmd("HMGET")
            .arg(self.entry_key(id))
            .arg("json")
            .arg("number")
            .arg("status")
            .arg("updated_at")
            .query_async(conn)
            .await?;

        let Some(json) = json else {
            return Ok(None);
        };

        let mut entry: QueueEntry = serde_json::from_str(&json)?;
        entry.queue_number = number.unwrap_or(entry.queue_number);
        if let Some(status) = status.as_deref().and_then(QueueStatus::parse) {
            entry.status = status;
        }
        if let Some(updated_at) = parse_timestamp(updated_at.as_deref()) {
            entry.updated_at = updated_at;
        }
        Ok(Some(entry))
    }

    async fn read_entries(&self, conn: &mut Connection, ids: Vec<String>) -> StoreResult<Vec<QueueEntry>> {
        let mut entries = Vec::with_capacity(ids.len());
        for raw in ids {
            let Ok(id) = Uuid::parse_str(&raw) else {
                debug!("Skipping malformed queue entry id {}", raw);
                continue;
            };
            if let Some(entry) = self.read_entry(conn, id).await? {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    async fn entries_in_set(&self, set_key: String) -> StoreResult<Vec<QueueEntry>> {
        let mut conn = self.conn().await?;
        let ids: Vec<String> = conn.smembers(set_key).await?;
        self.read_entries(&mut conn, ids).await
    }

    async fn put_document<T: Serialize>(
        &self,
        kind: &str,
        id: Uuid,
        document: &T,
    ) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        let json = serde_json::to_string(document)?;
        let _: () = conn.set(self.key(format!("{}:{}", kind, id)), json).await?;
        let _: () = conn.sadd(self.key(format!("{}:all", kind)), id.to_string()).await?;
        Ok(())
    }

    /// Claims `{kind}_email:{email}` for `id`; fails if another record owns it.
    async fn claim_email(&self, kind: &str, email: &str, id: Uuid) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        let email = email_key(email);
        let claimed: bool = conn
            .set_nx(self.key(format!("{}_email:{}", kind, email)), id.to_string())
            .await?;
        if !claimed {
            return Err(StoreError::Duplicate(format!("{} email {}", kind, email)));
        }
        Ok(())
    }

    async fn get_document<T: DeserializeOwned>(&self, kind: &str, id: Uuid) -> StoreResult<Option<T>> {
        let mut conn = self.conn().await?;
        let json: Option<String> = conn.get(self.key(format!("{}:{}", kind, id))).await?;
        json.map(|j| serde_json::from_str(&j))
            .transpose()
            .map_err(StoreError::from)
    }

    async fn list_documents<T: DeserializeOwned>(&self, kind: &str) -> StoreResult<Vec<T>> {
        let mut conn = self.conn().await?;
        let ids: Vec<String> = conn.smembers(self.key(format!("{}:all", kind))).await?;
        let mut documents = Vec::with_capacity(ids.len());
        for id in ids {
            let json: Option<String> = conn.get(self.key(format!("{}:{}", kind, id))).await?;
            if let Some(json) = json {
                documents.push(serde_json::from_str(&json)?);
            }
        }
        Ok(documents)
    }
}

fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|r| DateTime::parse_from_rfc3339(r).ok())
        .map(|t| t.with_timezone(&Utc))
}

fn class_key(class: UserClass) -> &'static str {
    match class {
        UserClass::Staff => "staff",
        UserClass::Patient => "patient",
    }
}

#[async_trait]
impl ScheduleStore for RedisStore {
    async fn insert_if_no_overlap(&self, schedule: Schedule) -> StoreResult<Schedule> {
        let mut conn = self.conn().await?;
        let json = serde_json::to_string(&schedule)?;

        let conflict: String = self
            .scripts
            .insert_schedule
            .key(self.key(format!("doctor_schedules:{}:{}", schedule.doctor_id, schedule.date)))
            .key(self.schedule_key(schedule.id))
            .key(self.key("schedules:all"))
            .arg(schedule.id.to_string())
            .arg(&schedule.start_time)
            .arg(&schedule.end_time)
            .arg(json)
            .arg(schedule.total_slots)
            .arg(schedule.updated_at.to_rfc3339())
            .arg(&self.prefix)
            .invoke_async(&mut conn)
            .await?;

        if !conflict.is_empty() {
            let existing = Uuid::parse_str(&conflict)
                .map_err(|_| StoreError::Invariant(format!("bad schedule id {}", conflict)))?;
            return Err(StoreError::Overlap(existing));
        }

        Ok(schedule)
    }

    async fn get_schedule(&self, id: Uuid) -> StoreResult<Option<Schedule>> {
        let mut conn = self.conn().await?;
        self.read_schedule(&mut conn, id).await
    }

    async fn list_schedules(&self, filter: &ScheduleFilter) -> StoreResult<Vec<Schedule>> {
        let mut conn = self.conn().await?;
        let ids: Vec<String> = conn.smembers(self.key("schedules:all")).await?;

        let mut schedules = Vec::new();
        for raw in ids {
            let Ok(id) = Uuid::parse_str(&raw) else { continue };
            if let Some(schedule) = self.read_schedule(&mut conn, id).await? {
                if filter.matches(&schedule) {
                    schedules.push(schedule);
                }
            }
        }
        Ok(schedules)
    }

    async fn reserve_slot(&self, id: Uuid) -> StoreResult<Schedule> {
        let mut conn = self.conn().await?;
        let outcome: i64 = self
            .scripts
            .reserve_slot
            .key(self.schedule_key(id))
            .arg(Utc::now().to_rfc3339())
            .invoke_async(&mut conn)
            .await?;

        match outcome {
            -1 => Err(StoreError::not_found("Schedule", id)),
            -2 => {
                let schedule = self.require_schedule(&mut conn, id).await?;
                Err(StoreError::NotBookable {
                    id,
                    status: schedule.status.to_string(),
                })
            }
            -3 => Err(StoreError::CapacityExceeded(id)),
            -4 => Err(StoreError::Invariant(format!(
                "schedule {} has more booked than total slots",
                id
            ))),
            _ => self.require_schedule(&mut conn, id).await,
        }
    }

    async fn release_slot(&self, id: Uuid) -> StoreResult<Schedule> {
        let mut conn = self.conn().await?;
        let outcome: i64 = self
            .scripts
            .release_slot
            .key(self.schedule_key(id))
            .arg(Utc::now().to_rfc3339())
            .invoke_async(&mut conn)
            .await?;

        match outcome {
            -1 => Err(StoreError::not_found("Schedule", id)),
            -4 => Err(StoreError::Invariant(format!(
                "release on schedule {} with no booked slots",
                id
            ))),
            _ => self.require_schedule(&mut conn, id).await,
        }
    }

    async fn set_total_slots(&self, id: Uuid, total: u32) -> StoreResult<Schedule> {
        let mut conn = self.conn().await?;
        let outcome: i64 = self
            .scripts
            .set_total_slots
            .key(self.schedule_key(id))
            .arg(total)
            .arg(Utc::now().to_rfc3339())
            .invoke_async(&mut conn)
            .await?;

        match outcome {
            -1 => Err(StoreError::not_found("Schedule", id)),
            -5 => {
                let schedule = self.require_schedule(&mut conn, id).await?;
                Err(StoreError::BelowBooked {
                    booked: schedule.booked_slots,
                    requested: total,
                })
            }
            _ => self.require_schedule(&mut conn, id).await,
        }
    }

    async fn set_schedule_status(&self, id: Uuid, status: ScheduleStatus) -> StoreResult<Schedule> {
        let mut conn = self.conn().await?;
        let key = self.schedule_key(id);
        let exists: bool = conn.exists(&key).await?;
        if !exists {
            return Err(StoreError::not_found("Schedule", id));
        }

        let _: () = conn
            .hset_multiple(
                &key,
                &[
                    ("status", status.as_str().to_string()),
                    ("updated_at", Utc::now().to_rfc3339()),
                ],
            )
            .await?;
        self.require_schedule(&mut conn, id).await
    }

    async fn cancel_if_unbooked(&self, id: Uuid) -> StoreResult<Schedule> {
        let mut conn = self.conn().await?;
        let outcome: i64 = self
            .scripts
            .cancel_if_unbooked
            .key(self.schedule_key(id))
            .arg(Utc::now().to_rfc3339())
            .invoke_async(&mut conn)
            .await?;

        match outcome {
            -1 => Err(StoreError::not_found("Schedule", id)),
            0 => self.require_schedule(&mut conn, id).await,
            booked => Err(StoreError::InUse {
                id,
                booked: u32::try_from(booked).unwrap_or(u32::MAX),
            }),
        }
    }
}

#[async_trait]
impl QueueStore for RedisStore {
    async fn insert_next(&self, entry: NewQueueEntry) -> StoreResult<QueueEntry> {
        let mut conn = self.conn().await?;

        // Number 0 is a placeholder; the script writes the real one beside the JSON.
        let mut created = entry.into_entry(0);
        let json = serde_json::to_string(&created)?;

        let number: u32 = self
            .scripts
            .insert_queue_entry
            .key(self.key(format!("queue_seq:{}", created.schedule_id)))
            .key(self.entry_key(created.id))
            .key(self.key("queue_by_date"))
            .key(self.key(format!("schedule_entries:{}", created.schedule_id)))
            .key(self.key(format!("patient_entries:{}", created.patient_id)))
            .arg(created.id.to_string())
            .arg(json)
            .arg(created.updated_at.to_rfc3339())
            .arg(created.queue_date.timestamp_millis())
            .invoke_async(&mut conn)
            .await?;

        created.queue_number = number;
        Ok(created)
    }

    async fn get_entry(&self, id: Uuid) -> StoreResult<Option<QueueEntry>> {
        let mut conn = self.conn().await?;
        self.read_entry(&mut conn, id).await
    }

    async fn swap_status(&self, id: Uuid, status: QueueStatus) -> StoreResult<(QueueStatus, QueueEntry)> {
        let mut conn = self.conn().await?;
        let previous: Option<String> = self
            .scripts
            .swap_status
            .key(self.entry_key(id))
            .arg(status.label())
            .arg(Utc::now().to_rfc3339())
            .invoke_async(&mut conn)
            .await?;

        let previous = previous.ok_or_else(|| StoreError::not_found("Queue entry", id))?;
        let previous = QueueStatus::parse(&previous)
            .ok_or_else(|| StoreError::Invariant(format!("unknown queue status {}", previous)))?;

        let entry = self
            .read_entry(&mut conn, id)
            .await?
            .ok_or_else(|| StoreError::not_found("Queue entry", id))?;
        Ok((previous, entry))
    }

    async fn list_by_queue_date(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<QueueEntry>> {
        let mut conn = self.conn().await?;
        let ids: Vec<String> = conn
            .zrangebyscore(
                self.key("queue_by_date"),
                from.timestamp_millis(),
                format!("({}", to.timestamp_millis()),
            )
            .await?;
        self.read_entries(&mut conn, ids).await
    }

    async fn list_for_schedule(&self, schedule_id: Uuid) -> StoreResult<Vec<QueueEntry>> {
        self.entries_in_set(self.key(format!("schedule_entries:{}", schedule_id)))
            .await
    }

    async fn list_for_patient(&self, patient_id: Uuid) -> StoreResult<Vec<QueueEntry>> {
        self.entries_in_set(self.key(format!("patient_entries:{}", patient_id)))
            .await
    }
}

#[async_trait]
impl DirectoryStore for RedisStore {
    async fn insert_patient(&self, patient: Patient) -> StoreResult<Patient> {
        self.claim_email("patient", &patient.email, patient.id).await?;
        self.put_document("patient", patient.id, &patient).await?;
        Ok(patient)
    }

    async fn get_patient(&self, id: Uuid) -> StoreResult<Option<Patient>> {
        self.get_document("patient", id).await
    }

    async fn list_patients(&self) -> StoreResult<Vec<Patient>> {
        self.list_documents("patient").await
    }

    async fn insert_doctor(&self, doctor: Doctor) -> StoreResult<Doctor> {
        self.put_document("doctor", doctor.id, &doctor).await?;
        Ok(doctor)
    }

    async fn get_doctor(&self, id: Uuid) -> StoreResult<Option<Doctor>> {
        self.get_document("doctor", id).await
    }

    async fn list_doctors(&self) -> StoreResult<Vec<Doctor>> {
        self.list_documents("doctor").await
    }

    async fn insert_clinic(&self, clinic: Clinic) -> StoreResult<Clinic> {
        self.put_document("clinic", clinic.id, &clinic).await?;
        Ok(clinic)
    }

    async fn get_clinic(&self, id: Uuid) -> StoreResult<Option<Clinic>> {
        self.get_document("clinic", id).await
    }

    async fn list_clinics(&self) -> StoreResult<Vec<Clinic>> {
        self.list_documents("clinic").await
    }

    async fn insert_staff(&self, staff: StaffAccount) -> StoreResult<StaffAccount> {
        self.claim_email("staff", &staff.email, staff.id).await?;
        self.put_document("staff", staff.id, &staff).await?;
        Ok(staff)
    }

    async fn get_staff(&self, id: Uuid) -> StoreResult<Option<StaffAccount>> {
        self.get_document("staff", id).await
    }

    async fn insert_credential(&self, class: UserClass, credential: Credential) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        let email = email_key(&credential.email);
        let json = serde_json::to_string(&credential)?;
        let stored: bool = conn
            .set_nx(self.key(format!("credential:{}:{}", class_key(class), email)), json)
            .await?;
        if !stored {
            return Err(StoreError::Duplicate(format!("credential {}", email)));
        }
        Ok(())
    }

    async fn find_credential(&self, class: UserClass, email: &str) -> StoreResult<Option<Credential>> {
        let mut conn = self.conn().await?;
        let json: Option<String> = conn
            .get(self.key(format!("credential:{}:{}", class_key(class), email_key(email))))
            .await?;
        json.map(|j| serde_json::from_str(&j))
            .transpose()
            .map_err(StoreError::from)
    }
}
