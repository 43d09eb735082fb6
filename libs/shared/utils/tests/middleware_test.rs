use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware,
    routing::get,
    Extension, Router,
};
use tower::ServiceExt;

use shared_models::auth::User;
use shared_utils::extractor::auth_middleware;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

fn protected_app() -> Router {
    let config = TestConfig::default().to_arc();

    Router::new()
        .route(
            "/whoami",
            get(|Extension(user): Extension<User>| async move { user.role.to_string() }),
        )
        .layer(middleware::from_fn_with_state(config, auth_middleware))
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let response = protected_app()
        .oneshot(Request::builder().uri("/whoami").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_staff_and_patient_tokens_are_accepted() {
    let config = TestConfig::default().to_app_config();

    for (user, token) in [
        {
            let u = TestUser::staff("staff@example.com");
            let t = JwtTestUtils::staff_token(&u, &config);
            (u, t)
        },
        {
            let u = TestUser::patient("patient@example.com");
            let t = JwtTestUtils::patient_token(&u, &config);
            (u, t)
        },
    ] {
        let response = protected_app()
            .oneshot(
                Request::builder()
                    .uri("/whoami")
                    .header("Authorization", JwtTestUtils::bearer(&token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(std::str::from_utf8(&body).unwrap(), user.role.as_str());
    }
}

#[tokio::test]
async fn test_expired_token_is_unauthorized() {
    let config = TestConfig::default().to_app_config();
    let user = TestUser::staff("staff@example.com");
    let token = JwtTestUtils::create_expired_token(&user, &config.staff_jwt_secret);

    let response = protected_app()
        .oneshot(
            Request::builder()
                .uri("/whoami")
                .header("Authorization", JwtTestUtils::bearer(&token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
