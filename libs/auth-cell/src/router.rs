use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, AuthState};

pub fn auth_routes(state: AuthState) -> Router {
    let public_routes = Router::new()
        .route("/staff/login", post(handlers::staff_login))
        .route("/patient/login", post(handlers::patient_login))
        .route("/patient/register", post(handlers::register_patient))
        .route("/validate", post(handlers::validate_token));

    let protected_routes = Router::new()
        .route("/staff", post(handlers::create_staff))
        .route("/me", get(handlers::me))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
