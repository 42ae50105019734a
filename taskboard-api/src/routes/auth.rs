/// Authentication endpoints
///
/// - `POST /v1/auth/login` - Sign in and receive a 24h session token
/// - `POST /v1/auth/register` - Join an organization by its code
/// - `POST /v1/auth/reset-password` - Set a password with a one-time reset token
/// - `GET /v1/auth/me` - Current identity and permissions
/// - `POST /v1/auth/switch-organization` - Re-scope the session (switch tier)
/// - `POST /v1/auth/change-password` - Replace the caller's password

use crate::{
    app::AppState,
    error::{validate_request, ApiResult},
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use taskboard_shared::{
    accounts::{self, Registration},
    auth::{
        middleware::AuthContext,
        permissions::{permissions_for, PermissionSet},
        session::{authenticate, Session},
    },
    error::StoreError,
    models::user::User,
    registry,
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Session plus the permissions it carries
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: User,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub organization_id: Uuid,
    pub permissions: PermissionSet,
}

impl SessionResponse {
    fn new(session: Session, organization_id: Uuid) -> Self {
        Self {
            permissions: permissions_for(session.user.role),
            organization_id,
            user: session.user,
            token: session.token,
            expires_at: session.expires_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "Organization code is required"))]
    pub organization_code: String,

    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,

    pub new_password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, message = "Reset token is required"))]
    pub token: String,

    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct SwitchOrganizationRequest {
    pub organization_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: User,
    pub organization_id: Uuid,
    pub permissions: PermissionSet,
}

/// Login endpoint
///
/// ```text
/// POST /v1/auth/login
///
/// { "email": "ana@school.test", "password": "..." }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: "Invalid email or password" for an unknown email,
///   a deactivated account and a wrong password alike
/// - `403 Forbidden`: the organization is deactivated
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<SessionResponse>> {
    validate_request(&req)?;

    let session = authenticate(&state.db, state.jwt_secret(), &req.email, &req.password).await?;
    let organization_id = session.user.organization_id;

    Ok(Json(SessionResponse::new(session, organization_id)))
}

/// Self-registration as a member
///
/// # Errors
///
/// - `400 Bad Request`: weak password
/// - `404 Not Found`: no active organization with that code
/// - `409 Conflict`: email already registered
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    validate_request(&req)?;

    let user = accounts::register(
        &state.db,
        Registration {
            organization_code: req.organization_code,
            name: req.name,
            email: req.email,
            password: req.password,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> ApiResult<Json<MeResponse>> {
    let user = User::find_by_id(&state.db, ctx.user_id)
        .await?
        .ok_or(StoreError::NotFound("User"))?;

    Ok(Json(MeResponse {
        user,
        organization_id: ctx.organization_id,
        permissions: ctx.permissions,
    }))
}

/// Issues a token scoped to another organization
///
/// # Errors
///
/// - `403 Forbidden`: role lacks `organization.switch_organization`
/// - `404 Not Found`: organization missing or inactive
pub async fn switch_organization(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(req): Json<SwitchOrganizationRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let session =
        registry::switch_organization(&state.db, state.jwt_secret(), &ctx, req.organization_id)
            .await?;

    Ok(Json(SessionResponse::new(session, req.organization_id)))
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<StatusCode> {
    validate_request(&req)?;

    accounts::change_password(&state.db, ctx.user_id, &req.current_password, &req.new_password)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> ApiResult<StatusCode> {
    validate_request(&req)?;

    accounts::reset_password_with_token(&state.db, &req.token, &req.new_password).await?;

    Ok(StatusCode::NO_CONTENT)
}
