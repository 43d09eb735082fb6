use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, ScheduleState};

pub fn schedule_routes(state: ScheduleState) -> Router {
    Router::new()
        .route("/", get(handlers::list_schedules).post(handlers::create_schedule))
        .route("/{schedule_id}", get(handlers::get_schedule))
        .route("/{schedule_id}/slots", patch(handlers::update_slots))
        .route("/{schedule_id}/cancel", post(handlers::cancel_schedule))
        .route("/{schedule_id}/complete", post(handlers::complete_schedule))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}
