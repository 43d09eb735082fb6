use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use schedule_cell::{schedule_routes, ScheduleLedger, ScheduleState};
use shared_database::Database;
use shared_models::directory::{Clinic, Doctor};
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

struct TestApp {
    router: Router,
    staff_token: String,
    patient_token: String,
    doctor_id: Uuid,
    clinic_id: Uuid,
}

async fn setup() -> TestApp {
    let config = TestConfig::default().to_app_config();
    let database = Database::in_memory();

    let doctor = Doctor {
        id: Uuid::new_v4(),
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        specialty: "Neurology".to_string(),
        email: None,
        is_available: true,
        created_at: Utc::now(),
    };
    let clinic = Clinic {
        id: Uuid::new_v4(),
        name: "Neurology".to_string(),
        department: Some("Outpatients".to_string()),
        floor: None,
        created_at: Utc::now(),
    };
    database.directory.insert_doctor(doctor.clone()).await.unwrap();
    database.directory.insert_clinic(clinic.clone()).await.unwrap();

    let staff_token = JwtTestUtils::staff_token(&TestUser::staff("desk@example.com"), &config);
    let patient_token = JwtTestUtils::patient_token(&TestUser::patient("pat@example.com"), &config);

    let state = ScheduleState {
        config: Arc::new(config),
        ledger: Arc::new(ScheduleLedger::new(&database)),
    };

    TestApp {
        router: schedule_routes(state),
        staff_token,
        patient_token,
        doctor_id: doctor.id,
        clinic_id: clinic.id,
    }
}

async fn send(router: &Router, method: &str, uri: &str, token: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", JwtTestUtils::bearer(token));

    let body = match body {
        Some(value) => {
            builder = builder.header("Content-Type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = router.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn schedule_body(app: &TestApp, start: &str, end: &str, total: u32) -> Value {
    json!({
        "doctorId": app.doctor_id,
        "clinicId": app.clinic_id,
        "date": "2024-09-02",
        "startTime": start,
        "endTime": end,
        "totalSlots": total
    })
}

#[tokio::test]
async fn test_staff_creates_and_reads_schedule() {
    let app = setup().await;

    let (status, body) = send(
        &app.router,
        "POST",
        "/",
        &app.staff_token,
        Some(schedule_body(&app, "09:00", "12:00", 10)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["availableSlots"], 10);
    assert_eq!(body["data"]["status"], "Active");

    let id = body["data"]["id"].as_str().unwrap().to_string();
    let (status, body) = send(&app.router, "GET", &format!("/{}", id), &app.patient_token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["startTime"], "09:00");
}

#[tokio::test]
async fn test_patient_cannot_create_schedule() {
    let app = setup().await;

    let (status, body) = send(
        &app.router,
        "POST",
        "/",
        &app.patient_token,
        Some(schedule_body(&app, "09:00", "12:00", 10)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_overlapping_schedule_is_conflict() {
    let app = setup().await;

    send(&app.router, "POST", "/", &app.staff_token, Some(schedule_body(&app, "09:00", "12:00", 10))).await;
    let (status, _) = send(
        &app.router,
        "POST",
        "/",
        &app.staff_token,
        Some(schedule_body(&app, "10:00", "11:00", 2)),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_update_slots_and_cancel() {
    let app = setup().await;

    let (_, body) = send(&app.router, "POST", "/", &app.staff_token, Some(schedule_body(&app, "09:00", "12:00", 4))).await;
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app.router,
        "PATCH",
        &format!("/{}/slots", id),
        &app.staff_token,
        Some(json!({ "totalSlots": 6 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["availableSlots"], 6);

    let (status, body) = send(&app.router, "POST", &format!("/{}/cancel", id), &app.staff_token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "Cancelled");
}

#[tokio::test]
async fn test_list_rejects_unknown_status_filter() {
    let app = setup().await;

    let (status, _) = send(&app.router, "GET", "/?status=sideways", &app.staff_token, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app.router, "GET", "/?status=active", &app.staff_token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn test_unknown_schedule_is_not_found() {
    let app = setup().await;

    let (status, _) = send(&app.router, "GET", &format!("/{}", Uuid::new_v4()), &app.staff_token, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
