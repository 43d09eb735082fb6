use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, QueueState};

pub fn queue_routes(state: QueueState) -> Router {
    // Display boards connect without a token.
    let public_routes = Router::new().route("/ws", get(handlers::queue_socket));

    let protected_routes = Router::new()
        .route("/", post(handlers::enqueue))
        .route("/today", get(handlers::list_today))
        .route("/stats", get(handlers::today_stats))
        .route("/mine", get(handlers::my_queue))
        .route("/schedule/{schedule_id}", get(handlers::schedule_queue))
        .route("/{queue_id}", get(handlers::get_entry))
        .route("/{queue_id}/status", patch(handlers::update_status))
        .route("/{queue_id}/cancel", post(handlers::cancel_entry))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
