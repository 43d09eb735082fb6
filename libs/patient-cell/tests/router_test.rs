use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use patient_cell::{patient_routes, PatientService, PatientState};
use shared_database::Database;
use shared_models::auth::UserRole;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

fn app() -> (Router, String) {
    let config = TestConfig::default().to_app_config();
    let staff_token = JwtTestUtils::staff_token(&TestUser::staff("desk@example.com"), &config);

    let state = PatientState {
        config: Arc::new(config),
        service: Arc::new(PatientService::new(&Database::in_memory())),
    };
    (patient_routes(state), staff_token)
}

async fn call(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn create_request(token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/")
        .header("Authorization", JwtTestUtils::bearer(token))
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_request(token: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("Authorization", JwtTestUtils::bearer(token))
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_staff_creates_and_searches_patients() {
    let (router, staff_token) = app();

    let (status, body) = call(
        &router,
        create_request(
            &staff_token,
            json!({ "firstName": "Mary", "lastName": "Seacole", "email": "mary@example.com", "dateOfBirth": "1805-11-23" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["dateOfBirth"], "1805-11-23");

    let (status, body) = call(&router, get_request(&staff_token, "/?search=seacole")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_duplicate_email_is_conflict() {
    let (router, staff_token) = app();
    let body = json!({ "firstName": "Mary", "lastName": "Seacole", "email": "mary@example.com" });

    call(&router, create_request(&staff_token, body.clone())).await;
    let (status, _) = call(&router, create_request(&staff_token, body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_patient_reads_only_own_record() {
    let (router, staff_token) = app();
    let config = TestConfig::default().to_app_config();

    let (_, body) = call(
        &router,
        create_request(
            &staff_token,
            json!({ "firstName": "Mary", "lastName": "Seacole", "email": "mary@example.com" }),
        ),
    )
    .await;
    let id: uuid::Uuid = body["data"]["id"].as_str().unwrap().parse().unwrap();

    let owner = TestUser::with_id(id, "mary@example.com", UserRole::Patient);
    let owner_token = JwtTestUtils::patient_token(&owner, &config);
    let (status, _) = call(&router, get_request(&owner_token, &format!("/{}", id))).await;
    assert_eq!(status, StatusCode::OK);

    let stranger_token = JwtTestUtils::patient_token(&TestUser::patient("other@example.com"), &config);
    let (status, _) = call(&router, get_request(&stranger_token, &format!("/{}", id))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(&router, get_request(&owner_token, "/")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
