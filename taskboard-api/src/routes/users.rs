/// User administration endpoints
///
/// - `GET /v1/users` - Whole active organization with `users.view_all`, otherwise only the caller
/// - `POST /v1/users` - Create a user with a temporary password
/// - `PUT /v1/users/:id` - Edit name or role
/// - `POST /v1/users/:id/deactivate` - Soft delete
/// - `DELETE /v1/users/:id` - Purge (hard delete)
/// - `POST /v1/users/:id/reset-password` - Issue a new temporary password
///
/// Creation and resets notify the user through the configured channel; see
/// [`crate::notify`] for what the response contains when that fails.

use crate::{
    app::AppState,
    error::{validate_request, ApiResult},
    notify::{notify_issued, IssuedCredentialsResponse, NoticeKind},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use taskboard_shared::{
    accounts::{self, NewUser},
    auth::{middleware::AuthContext, permissions::Role},
    models::user::{UpdateUser, User},
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: Option<String>,

    pub role: Option<Role>,
}

pub async fn list_users(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(accounts::list_users(&state.db, &ctx).await?))
}

/// Create a user
///
/// The account is committed before the notification is attempted; a failed
/// or slow notification never undoes it.
///
/// # Errors
///
/// - `403 Forbidden`: caller cannot create users or grant `role`
/// - `409 Conflict`: email already registered
pub async fn create_user(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(req): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<IssuedCredentialsResponse>)> {
    validate_request(&req)?;

    let issued = accounts::create_user(
        &state.db,
        &ctx,
        NewUser {
            name: req.name,
            email: req.email,
            role: req.role.unwrap_or(Role::Member),
        },
    )
    .await?;

    let response = notify_issued(
        state.notifier.as_ref(),
        NoticeKind::AccountCreated,
        issued,
        state.config.notify.timeout,
    )
    .await;

    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn update_user(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> ApiResult<Json<User>> {
    validate_request(&req)?;

    let patch = UpdateUser {
        name: req.name,
        role: req.role,
    };

    Ok(Json(accounts::update_user(&state.db, &ctx, id, patch).await?))
}

pub async fn deactivate_user(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<User>> {
    Ok(Json(accounts::deactivate_user(&state.db, &ctx, id).await?))
}

/// Hard delete
///
/// Removes the user's password-reset records and assignments; tasks they
/// created remain.
pub async fn purge_user(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    accounts::purge_user(&state.db, &ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn reset_password(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<IssuedCredentialsResponse>> {
    let issued = accounts::reset_user_password(&state.db, &ctx, id).await?;

    let response = notify_issued(
        state.notifier.as_ref(),
        NoticeKind::PasswordReset,
        issued,
        state.config.notify.timeout,
    )
    .await;

    Ok(Json(response))
}
