use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{Duration, Local, NaiveDate, Utc};
use uuid::Uuid;

use booking_queue_cell::{EnqueueRequest, QueueError, QueueNotifier, QueueRegister};
use schedule_cell::{CreateScheduleRequest, ScheduleError, ScheduleLedger};
use shared_database::Database;
use shared_models::directory::{Clinic, Doctor, Patient};
use shared_models::queue::QueueStatus;
use shared_models::schedule::{Schedule, ScheduleStatus};

struct Fixture {
    database: Database,
    ledger: Arc<ScheduleLedger>,
    register: Arc<QueueRegister>,
    notifier: QueueNotifier,
    doctor_id: Uuid,
    clinic_id: Uuid,
}

impl Fixture {
    async fn new() -> Self {
        let database = Database::in_memory();
        let doctor = Doctor {
            id: Uuid::new_v4(),
            first_name: "John".to_string(),
            last_name: "Snow".to_string(),
            specialty: "Epidemiology".to_string(),
            email: None,
            is_available: true,
            created_at: Utc::now(),
        };
        let clinic = Clinic {
            id: Uuid::new_v4(),
            name: "General Medicine".to_string(),
            department: None,
            floor: Some("1".to_string()),
            created_at: Utc::now(),
        };
        database.directory.insert_doctor(doctor.clone()).await.unwrap();
        database.directory.insert_clinic(clinic.clone()).await.unwrap();

        let notifier = QueueNotifier::new(16);
        let ledger = Arc::new(ScheduleLedger::new(&database));
        let register = Arc::new(QueueRegister::new(&database, ledger.clone(), notifier.clone()));

        Self {
            database,
            ledger,
            register,
            notifier,
            doctor_id: doctor.id,
            clinic_id: clinic.id,
        }
    }

    async fn schedule_on(&self, date: NaiveDate, start: &str, end: &str, total_slots: u32) -> Schedule {
        self.ledger
            .create_schedule(CreateScheduleRequest {
                doctor_id: self.doctor_id,
                clinic_id: self.clinic_id,
                date,
                start_time: start.to_string(),
                end_time: end.to_string(),
                total_slots,
            })
            .await
            .unwrap()
    }

    async fn today_schedule(&self, total_slots: u32) -> Schedule {
        self.schedule_on(Local::now().date_naive(), "00:00", "23:59", total_slots).await
    }

    async fn patient(&self, first_name: &str) -> Patient {
        let patient = Patient {
            id: Uuid::new_v4(),
            first_name: first_name.to_string(),
            last_name: "Doe".to_string(),
            email: format!("{}.{}@example.com", first_name.to_lowercase(), Uuid::new_v4()),
            phone: None,
            date_of_birth: None,
            created_at: Utc::now(),
        };
        self.database.directory.insert_patient(patient).await.unwrap()
    }
}

fn request(patient_id: Uuid, schedule_id: Uuid) -> EnqueueRequest {
    EnqueueRequest {
        patient_id,
        schedule_id,
        notes: None,
        priority: None,
    }
}

#[tokio::test]
async fn test_sequential_enqueues_get_one_then_two() {
    let f = Fixture::new().await;
    let schedule = f.today_schedule(5).await;
    let alice = f.patient("Alice").await;
    let bob = f.patient("Bob").await;

    let first = f.register.enqueue(request(alice.id, schedule.id)).await.unwrap();
    let second = f.register.enqueue(request(bob.id, schedule.id)).await.unwrap();

    assert_eq!(first.queue_number, 1);
    assert_eq!(second.queue_number, 2);
    assert_eq!(first.status, QueueStatus::Waiting);
    assert_eq!(first.doctor_id, f.doctor_id);

    let schedule = f.ledger.get_schedule(schedule.id).await.unwrap();
    assert_eq!((schedule.booked_slots, schedule.available_slots), (2, 3));
}

#[tokio::test]
async fn test_concurrent_enqueues_number_without_gaps() {
    let f = Fixture::new().await;
    let schedule = f.today_schedule(20).await;

    let mut handles = Vec::new();
    for i in 0..20 {
        let patient = f.patient(&format!("P{}", i)).await;
        let register = f.register.clone();
        let schedule_id = schedule.id;
        handles.push(tokio::spawn(async move {
            register.enqueue(request(patient.id, schedule_id)).await
        }));
    }

    let mut numbers = Vec::new();
    for handle in handles {
        numbers.push(handle.await.unwrap().unwrap().queue_number);
    }
    numbers.sort_unstable();
    assert_eq!(numbers, (1..=20).collect::<Vec<u32>>());

    let schedule = f.ledger.get_schedule(schedule.id).await.unwrap();
    assert_eq!(schedule.available_slots, 0);
    assert_eq!(schedule.status, ScheduleStatus::Full);
}

#[tokio::test]
async fn test_single_slot_second_concurrent_enqueue_fails() {
    let f = Fixture::new().await;
    let schedule = f.today_schedule(1).await;
    let alice = f.patient("Alice").await;
    let bob = f.patient("Bob").await;

    let (a, b) = tokio::join!(
        f.register.enqueue(request(alice.id, schedule.id)),
        f.register.enqueue(request(bob.id, schedule.id)),
    );

    let results = [a, b];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(QueueError::SlotUnavailable(_)))));

    let schedule = f.ledger.get_schedule(schedule.id).await.unwrap();
    assert_eq!(schedule.available_slots, 0);
}

#[tokio::test]
async fn test_enqueue_unknown_references() {
    let f = Fixture::new().await;
    let schedule = f.today_schedule(2).await;
    let alice = f.patient("Alice").await;

    assert_matches!(
        f.register.enqueue(request(alice.id, Uuid::new_v4())).await,
        Err(QueueError::NotFound(_))
    );
    assert_matches!(
        f.register.enqueue(request(Uuid::new_v4(), schedule.id)).await,
        Err(QueueError::NotFound(_))
    );

    let schedule = f.ledger.get_schedule(schedule.id).await.unwrap();
    assert_eq!(schedule.booked_slots, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cancel_schedule_racing_enqueue_never_both_succeed() {
    for _ in 0..25 {
        let f = Fixture::new().await;
        let schedule_id = f.today_schedule(3).await.id;
        let patient_id = f.patient("Alice").await.id;

        let enqueueing = tokio::spawn({
            let register = f.register.clone();
            async move { register.enqueue(request(patient_id, schedule_id)).await }
        });
        let cancelling = tokio::spawn({
            let ledger = f.ledger.clone();
            async move { ledger.cancel_schedule(schedule_id).await }
        });

        let enqueued = enqueueing.await.unwrap();
        let cancelled = cancelling.await.unwrap();

        match (&enqueued, &cancelled) {
            (Ok(_), Err(ScheduleError::SchedulesInUse { active_entries: 1 })) => {}
            (Err(QueueError::SlotUnavailable(_)), Ok(_)) => {}
            other => panic!("enqueue and cancel must exclude each other, got {:?}", other),
        }

        let after = f.ledger.get_schedule(schedule_id).await.unwrap();
        let holding = f
            .register
            .list_for_schedule(schedule_id)
            .await
            .unwrap()
            .into_iter()
            .filter(|entry| entry.status.holds_slot())
            .count();
        assert_eq!(after.booked_slots as usize, holding);
        if after.status == ScheduleStatus::Cancelled {
            assert_eq!(holding, 0);
        }
    }
}

#[tokio::test]
async fn test_cancel_schedule_refused_after_enqueue() {
    let f = Fixture::new().await;
    let schedule = f.today_schedule(2).await;
    let alice = f.patient("Alice").await;
    let entry = f.register.enqueue(request(alice.id, schedule.id)).await.unwrap();

    assert_matches!(
        f.ledger.cancel_schedule(schedule.id).await,
        Err(ScheduleError::SchedulesInUse { active_entries: 1 })
    );

    f.register.cancel(entry.id).await.unwrap();
    let cancelled = f.ledger.cancel_schedule(schedule.id).await.unwrap();
    assert_eq!(cancelled.status, ScheduleStatus::Cancelled);
}

#[tokio::test]
async fn test_enqueue_on_cancelled_schedule_is_unavailable() {
    let f = Fixture::new().await;
    let schedule = f.today_schedule(2).await;
    let alice = f.patient("Alice").await;
    f.ledger.cancel_schedule(schedule.id).await.unwrap();

    assert_matches!(
        f.register.enqueue(request(alice.id, schedule.id)).await,
        Err(QueueError::SlotUnavailable(_))
    );
}

#[tokio::test]
async fn test_cancel_restores_available_slot() {
    let f = Fixture::new().await;
    let schedule = f.today_schedule(3).await;
    let alice = f.patient("Alice").await;

    let entry = f.register.enqueue(request(alice.id, schedule.id)).await.unwrap();
    let cancelled = f.register.cancel(entry.id).await.unwrap();
    assert_eq!(cancelled.status, QueueStatus::Cancelled);

    let after = f.ledger.get_schedule(schedule.id).await.unwrap();
    assert_eq!(after.available_slots, schedule.available_slots);
    assert_eq!(after.booked_slots, 0);

    // Second cancel changes nothing.
    f.register.cancel(entry.id).await.unwrap();
    let again = f.ledger.get_schedule(schedule.id).await.unwrap();
    assert_eq!(again.available_slots, 3);
}

#[tokio::test]
async fn test_status_changes_follow_cancelled_boundary() {
    let f = Fixture::new().await;
    let schedule = f.today_schedule(1).await;
    let alice = f.patient("Alice").await;
    let bob = f.patient("Bob").await;

    let entry = f.register.enqueue(request(alice.id, schedule.id)).await.unwrap();

    let in_progress = f.register.update_status(entry.id, QueueStatus::InProgress).await.unwrap();
    assert_eq!(in_progress.status, QueueStatus::InProgress);
    assert_eq!(f.ledger.get_schedule(schedule.id).await.unwrap().booked_slots, 1);

    f.register.update_status(entry.id, QueueStatus::Cancelled).await.unwrap();
    assert_eq!(f.ledger.get_schedule(schedule.id).await.unwrap().booked_slots, 0);

    // Bob takes the freed slot, so Alice cannot come back.
    f.register.enqueue(request(bob.id, schedule.id)).await.unwrap();
    assert_matches!(
        f.register.update_status(entry.id, QueueStatus::Waiting).await,
        Err(QueueError::SlotUnavailable(_))
    );
    assert_eq!(
        f.register.get_entry(entry.id).await.unwrap().status,
        QueueStatus::Cancelled
    );
}

#[tokio::test]
async fn test_failed_release_restores_previous_status() {
    let f = Fixture::new().await;
    let schedule = f.today_schedule(2).await;
    let alice = f.patient("Alice").await;

    let entry = f.register.enqueue(request(alice.id, schedule.id)).await.unwrap();
    f.register.update_status(entry.id, QueueStatus::InProgress).await.unwrap();

    // Drain the ledger behind the register's back so the release has nothing to free.
    f.ledger.release_slot(schedule.id).await.unwrap();

    assert_matches!(
        f.register.update_status(entry.id, QueueStatus::Cancelled).await,
        Err(QueueError::Invariant(_))
    );
    assert_eq!(
        f.register.get_entry(entry.id).await.unwrap().status,
        QueueStatus::InProgress
    );
    assert_eq!(f.ledger.get_schedule(schedule.id).await.unwrap().booked_slots, 0);
}

#[tokio::test]
async fn test_update_status_unknown_entry() {
    let f = Fixture::new().await;
    assert_matches!(
        f.register.update_status(Uuid::new_v4(), QueueStatus::Completed).await,
        Err(QueueError::NotFound(_))
    );
}

#[tokio::test]
async fn test_list_today_excludes_other_days() {
    let f = Fixture::new().await;
    let today = f.today_schedule(5).await;
    let tomorrow_date = Local::now().date_naive() + Duration::days(1);
    let tomorrow = f.schedule_on(tomorrow_date, "09:00", "10:00", 5).await;
    let alice = f.patient("Alice").await;
    let bob = f.patient("Bob").await;

    f.register.enqueue(request(alice.id, today.id)).await.unwrap();
    f.register.enqueue(request(bob.id, tomorrow.id)).await.unwrap();

    let views = f.register.list_today(100).await.unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].patient_name, "Alice Doe");
    assert_eq!(views[0].doctor_name, "Dr. John Snow");
    assert_eq!(views[0].clinic_name, "General Medicine");
    assert_eq!(views[0].status, "waiting");
}

#[tokio::test]
async fn test_list_today_orders_and_limits() {
    let f = Fixture::new().await;
    let schedule = f.today_schedule(5).await;

    for name in ["Alice", "Bob", "Carol"] {
        let patient = f.patient(name).await;
        f.register.enqueue(request(patient.id, schedule.id)).await.unwrap();
    }

    let views = f.register.list_today(100).await.unwrap();
    let numbers: Vec<u32> = views.iter().map(|v| v.queue_number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);

    let limited = f.register.list_today(2).await.unwrap();
    assert_eq!(limited.len(), 2);
}

#[tokio::test]
async fn test_today_stats() {
    let f = Fixture::new().await;
    let schedule = f.today_schedule(5).await;
    let alice = f.patient("Alice").await;
    let bob = f.patient("Bob").await;
    let carol = f.patient("Carol").await;

    let a = f.register.enqueue(request(alice.id, schedule.id)).await.unwrap();
    let b = f.register.enqueue(request(bob.id, schedule.id)).await.unwrap();
    f.register.enqueue(request(carol.id, schedule.id)).await.unwrap();

    f.register.update_status(a.id, QueueStatus::InProgress).await.unwrap();
    f.register.cancel(b.id).await.unwrap();

    let stats = f.register.today_stats().await.unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.waiting, 1);
    assert_eq!(stats.in_progress, 1);
    assert_eq!(stats.cancelled, 1);
    assert!(stats.average_wait_minutes >= 0.0);
}

#[tokio::test]
async fn test_mutations_push_snapshot_to_viewers() {
    let f = Fixture::new().await;
    let schedule = f.today_schedule(5).await;
    let alice = f.patient("Alice").await;
    let mut viewer = f.notifier.subscribe();

    let entry = f.register.enqueue(request(alice.id, schedule.id)).await.unwrap();
    let frame: serde_json::Value = serde_json::from_str(&viewer.recv().await.unwrap()).unwrap();
    assert_eq!(frame["type"], "queue_update");
    assert_eq!(frame["data"][0]["queueNumber"], 1);
    assert_eq!(frame["data"][0]["status"], "waiting");

    f.register.update_status(entry.id, QueueStatus::InProgress).await.unwrap();
    let frame: serde_json::Value = serde_json::from_str(&viewer.recv().await.unwrap()).unwrap();
    assert_eq!(frame["data"][0]["status"], "in-progress");
}

#[tokio::test]
async fn test_list_for_patient_and_schedule() {
    let f = Fixture::new().await;
    let schedule = f.today_schedule(5).await;
    let alice = f.patient("Alice").await;
    let bob = f.patient("Bob").await;

    f.register.enqueue(request(alice.id, schedule.id)).await.unwrap();
    f.register.enqueue(request(bob.id, schedule.id)).await.unwrap();

    let mine = f.register.list_for_patient(alice.id).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].patient_id, alice.id);

    let all = f.register.list_for_schedule(schedule.id).await.unwrap();
    assert_eq!(all.iter().map(|e| e.queue_number).collect::<Vec<_>>(), vec![1, 2]);
}
