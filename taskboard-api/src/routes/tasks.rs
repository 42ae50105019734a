/// Task endpoints
///
/// - `GET /v1/tasks` - Visible tasks, filtered by `status`, `priority`,
///   `assignedTo`, `from`, `to`
/// - `POST /v1/tasks` - Create a task in the caller's active organization
/// - `GET /v1/tasks/:id` - One task (404 when missing or not visible)
/// - `PUT /v1/tasks/:id` - Partial update, optional `version` precondition
/// - `DELETE /v1/tasks/:id` - Delete (creator or deletion tier)
/// - `PUT /v1/tasks/:id/status` - Status transition only
/// - `PUT /v1/tasks/:id/assignees` - Replace the assignee set
/// - `GET /v1/tasks/:id/history` - Edit history

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use taskboard_shared::{
    auth::middleware::AuthContext,
    models::task_history::TaskHistory,
    tasks::{self, canonical::parse_status, CreateTaskInput, TaskFilter, TaskPatch, TaskView},
};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct AssigneesRequest {
    pub assignees: Vec<Uuid>,
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(filter): Query<TaskFilter>,
) -> ApiResult<Json<Vec<TaskView>>> {
    Ok(Json(tasks::list_tasks(&state.db, &ctx, filter).await?))
}

/// Create a task
///
/// ```text
/// POST /v1/tasks
///
/// {
///   "title": "Grade exams",
///   "priority": "alta",
///   "due_date": "2025-03-14 09:30:00",
///   "assignees": ["uuid"]
/// }
/// ```
pub async fn create_task(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(input): Json<CreateTaskInput>,
) -> ApiResult<(StatusCode, Json<TaskView>)> {
    let task = tasks::create_task(&state.db, &state.task_rules(), &ctx, input).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TaskView>> {
    Ok(Json(tasks::get_task(&state.db, &ctx, id).await?))
}

pub async fn update_task(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(patch): Json<TaskPatch>,
) -> ApiResult<Json<TaskView>> {
    Ok(Json(
        tasks::update_task(&state.db, &state.task_rules(), &ctx, id, patch).await?,
    ))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    tasks::delete_task(&state.db, &ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Status transition; accepts the same aliases as task updates
pub async fn set_status(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusRequest>,
) -> ApiResult<Json<TaskView>> {
    let status = parse_status(&req.status)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown status: {}", req.status)))?;

    Ok(Json(
        tasks::transition_task(&state.db, &state.task_rules(), &ctx, id, status).await?,
    ))
}

pub async fn set_assignees(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<AssigneesRequest>,
) -> ApiResult<Json<TaskView>> {
    Ok(Json(tasks::assign_task(&state.db, &ctx, id, &req.assignees).await?))
}

pub async fn history(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<TaskHistory>>> {
    Ok(Json(tasks::task_history(&state.db, &ctx, id).await?))
}
