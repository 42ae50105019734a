/// Organization registry endpoints
///
/// - `GET /v1/organizations` - All organizations for the switch tier, otherwise the caller's own
/// - `POST /v1/organizations` - Create an organization and its first admin
/// - `GET /v1/organizations/:id` - One organization
/// - `PUT /v1/organizations/:id/settings` - Replace branding and feature toggles
/// - `POST /v1/organizations/:id/deactivate` - Deactivate (super admin only)

use crate::{
    app::AppState,
    error::ApiResult,
    notify::{notify_issued, IssuedCredentialsResponse, NoticeKind},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Serialize;
use taskboard_shared::{
    auth::middleware::AuthContext,
    models::organization::{Organization, OrganizationSettings},
    registry::{self, NewOrganization},
};
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct CreatedOrganizationResponse {
    pub organization: Organization,
    pub admin: IssuedCredentialsResponse,
}

pub async fn list_organizations(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> ApiResult<Json<Vec<Organization>>> {
    Ok(Json(registry::list_organizations(&state.db, &ctx).await?))
}

/// Create an organization
///
/// ```text
/// POST /v1/organizations
///
/// {
///   "name": "Acme School",
///   "code": "ACM001",
///   "type": "SCHOOL",
///   "adminName": "Jane Admin",
///   "adminEmail": "jane@acme.test"
/// }
/// ```
///
/// # Errors
///
/// - `403 Forbidden`: caller is below the tenant-admin tier
/// - `409 Conflict`: code or admin email already in use (nothing is created)
pub async fn create_organization(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(input): Json<NewOrganization>,
) -> ApiResult<(StatusCode, Json<CreatedOrganizationResponse>)> {
    let created = registry::create_organization(&state.db, &ctx, input).await?;

    let admin = notify_issued(
        state.notifier.as_ref(),
        NoticeKind::OrganizationCreated,
        created.admin,
        state.config.notify.timeout,
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(CreatedOrganizationResponse {
            organization: created.organization,
            admin,
        }),
    ))
}

pub async fn get_organization(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Organization>> {
    Ok(Json(registry::get_organization(&state.db, &ctx, id).await?))
}

pub async fn update_settings(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(settings): Json<OrganizationSettings>,
) -> ApiResult<Json<Organization>> {
    Ok(Json(
        registry::update_settings(&state.db, &ctx, id, settings).await?,
    ))
}

pub async fn deactivate_organization(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Organization>> {
    Ok(Json(
        registry::deactivate_organization(&state.db, &ctx, id).await?,
    ))
}
