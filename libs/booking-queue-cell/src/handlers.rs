use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Extension, Path, Query, State,
    },
    http::StatusCode,
    response::Response,
    Json,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_models::queue::{QueueEntry, QueueStatus};
use shared_models::response::ApiResponse;
use shared_utils::extractor::{require_self_or_staff, require_staff};

use crate::models::{
    EnqueueRequest, QueueEntryView, QueueStats, TodayQuery, UpdateStatusRequest, DEFAULT_TODAY_LIMIT,
};
use crate::services::{QueueReceiver, QueueRegister};
use crate::QueueError;

#[derive(Clone)]
pub struct QueueState {
    pub config: Arc<AppConfig>,
    pub register: Arc<QueueRegister>,
}

/// Patients may only queue themselves; staff may queue anyone.
#[axum::debug_handler]
pub async fn enqueue(
    State(state): State<QueueState>,
    Extension(user): Extension<User>,
    Json(request): Json<EnqueueRequest>,
) -> Result<(StatusCode, Json<ApiResponse<QueueEntry>>), AppError> {
    require_self_or_staff(&user, request.patient_id)?;

    let entry = state.register.enqueue(request).await?;
    let message = format!("Queue number {}", entry.queue_number);
    Ok((StatusCode::CREATED, Json(ApiResponse::ok_with_message(entry, message))))
}

#[axum::debug_handler]
pub async fn list_today(
    State(state): State<QueueState>,
    Extension(user): Extension<User>,
    Query(query): Query<TodayQuery>,
) -> Result<Json<ApiResponse<Vec<QueueEntryView>>>, AppError> {
    require_staff(&user)?;

    let limit = query.limit.unwrap_or(DEFAULT_TODAY_LIMIT);
    let entries = state.register.list_today(limit).await?;
    Ok(Json(ApiResponse::ok(entries)))
}

#[axum::debug_handler]
pub async fn today_stats(
    State(state): State<QueueState>,
    Extension(user): Extension<User>,
) -> Result<Json<ApiResponse<QueueStats>>, AppError> {
    require_staff(&user)?;

    let stats = state.register.today_stats().await?;
    Ok(Json(ApiResponse::ok(stats)))
}

#[axum::debug_handler]
pub async fn my_queue(
    State(state): State<QueueState>,
    Extension(user): Extension<User>,
) -> Result<Json<ApiResponse<Vec<QueueEntry>>>, AppError> {
    let entries = state.register.list_for_patient(user.id).await?;
    Ok(Json(ApiResponse::ok(entries)))
}

#[axum::debug_handler]
pub async fn schedule_queue(
    State(state): State<QueueState>,
    Extension(user): Extension<User>,
    Path(schedule_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<QueueEntry>>>, AppError> {
    require_staff(&user)?;

    let entries = state.register.list_for_schedule(schedule_id).await?;
    Ok(Json(ApiResponse::ok(entries)))
}

#[axum::debug_handler]
pub async fn get_entry(
    State(state): State<QueueState>,
    Extension(user): Extension<User>,
    Path(queue_id): Path<Uuid>,
) -> Result<Json<ApiResponse<QueueEntry>>, AppError> {
    let entry = state.register.get_entry(queue_id).await?;
    require_self_or_staff(&user, entry.patient_id)?;
    Ok(Json(ApiResponse::ok(entry)))
}

#[axum::debug_handler]
pub async fn update_status(
    State(state): State<QueueState>,
    Extension(user): Extension<User>,
    Path(queue_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<QueueEntry>>, AppError> {
    require_staff(&user)?;

    let status = QueueStatus::parse(&request.status)
        .ok_or_else(|| QueueError::InvalidStatus(request.status.clone()))?;

    let entry = state.register.update_status(queue_id, status).await?;
    Ok(Json(ApiResponse::ok_with_message(entry, "Queue status updated")))
}

#[axum::debug_handler]
pub async fn cancel_entry(
    State(state): State<QueueState>,
    Extension(user): Extension<User>,
    Path(queue_id): Path<Uuid>,
) -> Result<Json<ApiResponse<QueueEntry>>, AppError> {
    let entry = state.register.get_entry(queue_id).await?;
    require_self_or_staff(&user, entry.patient_id)?;

    let entry = state.register.cancel(queue_id).await?;
    Ok(Json(ApiResponse::ok_with_message(entry, "Queue entry cancelled")))
}

/// Read-only feed for display boards. Nothing is sent until the queue changes.
pub async fn queue_socket(State(state): State<QueueState>, ws: WebSocketUpgrade) -> Response {
    let updates = state.register.notifier().subscribe();
    ws.on_upgrade(move |socket| stream_queue_updates(socket, updates))
}

async fn stream_queue_updates(socket: WebSocket, mut updates: QueueReceiver) {
    info!("Queue viewer connected");
    let (mut sender, mut receiver) = socket.split();

    let mut forward = tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(frame) => {
                    if sender.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Queue viewer lagging, skipped {} updates", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    // Viewers never send anything meaningful; drain until they hang up.
    let mut drain = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            if let Message::Close(_) = message {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut forward => drain.abort(),
        _ = &mut drain => forward.abort(),
    }

    debug!("Queue viewer disconnected");
}
