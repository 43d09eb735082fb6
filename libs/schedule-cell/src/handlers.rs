use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_models::response::ApiResponse;
use shared_models::schedule::{Schedule, ScheduleFilter, ScheduleStatus};
use shared_utils::extractor::require_staff;

use crate::models::{CreateScheduleRequest, ScheduleQuery, UpdateSlotsRequest};
use crate::services::ScheduleLedger;

#[derive(Clone)]
pub struct ScheduleState {
    pub config: Arc<AppConfig>,
    pub ledger: Arc<ScheduleLedger>,
}

#[axum::debug_handler]
pub async fn list_schedules(
    State(state): State<ScheduleState>,
    Extension(_user): Extension<User>,
    Query(query): Query<ScheduleQuery>,
) -> Result<Json<ApiResponse<Vec<Schedule>>>, AppError> {
    let status = match query.status.as_deref() {
        Some(raw) => Some(ScheduleStatus::parse(raw).ok_or_else(|| {
            AppError::BadRequest(format!("Unknown schedule status '{}'", raw))
        })?),
        None => None,
    };

    let filter = ScheduleFilter {
        doctor_id: query.doctor_id,
        clinic_id: query.clinic_id,
        date: query.date,
        status,
    };

    let schedules = state.ledger.list_schedules(&filter).await?;
    debug!("Listed {} schedules", schedules.len());
    Ok(Json(ApiResponse::ok(schedules)))
}

#[axum::debug_handler]
pub async fn get_schedule(
    State(state): State<ScheduleState>,
    Extension(_user): Extension<User>,
    Path(schedule_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Schedule>>, AppError> {
    let schedule = state.ledger.get_schedule(schedule_id).await?;
    Ok(Json(ApiResponse::ok(schedule)))
}

#[axum::debug_handler]
pub async fn create_schedule(
    State(state): State<ScheduleState>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateScheduleRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Schedule>>), AppError> {
    require_staff(&user)?;

    let schedule = state.ledger.create_schedule(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok_with_message(schedule, "Schedule created")),
    ))
}

#[axum::debug_handler]
pub async fn update_slots(
    State(state): State<ScheduleState>,
    Extension(user): Extension<User>,
    Path(schedule_id): Path<Uuid>,
    Json(request): Json<UpdateSlotsRequest>,
) -> Result<Json<ApiResponse<Schedule>>, AppError> {
    require_staff(&user)?;

    let schedule = state
        .ledger
        .update_total_slots(schedule_id, request.total_slots)
        .await?;
    Ok(Json(ApiResponse::ok_with_message(schedule, "Slots updated")))
}

#[axum::debug_handler]
pub async fn cancel_schedule(
    State(state): State<ScheduleState>,
    Extension(user): Extension<User>,
    Path(schedule_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Schedule>>, AppError> {
    require_staff(&user)?;

    let schedule = state.ledger.cancel_schedule(schedule_id).await?;
    Ok(Json(ApiResponse::ok_with_message(schedule, "Schedule cancelled")))
}

#[axum::debug_handler]
pub async fn complete_schedule(
    State(state): State<ScheduleState>,
    Extension(user): Extension<User>,
    Path(schedule_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Schedule>>, AppError> {
    require_staff(&user)?;

    let schedule = state.ledger.complete_schedule(schedule_id).await?;
    Ok(Json(ApiResponse::ok_with_message(schedule, "Schedule completed")))
}
