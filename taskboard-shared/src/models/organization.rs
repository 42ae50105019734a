/// Organization (tenant) model
///
/// Organizations are schools or departments. Every user and task belongs to
/// one. Organizations are deactivated rather than deleted; while inactive
/// their members cannot sign in.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE organization_type AS ENUM ('SCHOOL', 'DEPARTMENT');
///
/// CREATE TABLE organizations (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name TEXT NOT NULL,
///     code TEXT NOT NULL,
///     org_type organization_type NOT NULL DEFAULT 'SCHOOL',
///     settings JSONB NOT NULL DEFAULT '{}'::jsonb,
///     active BOOLEAN NOT NULL DEFAULT TRUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT organizations_code_key UNIQUE (code)
/// );
/// ```
///
/// # Settings
///
/// The `settings` blob is decoded into [`OrganizationSettings`]. Missing keys
/// fall back to defaults, so an empty `{}` is a valid settings document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgExecutor, types::Json, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "organization_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrganizationType {
    School,
    Department,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branding {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub logo_url: Option<String>,
}

fn enabled() -> bool {
    true
}

/// Per-organization feature toggles and branding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationSettings {
    #[serde(default)]
    pub branding: Branding,

    /// When false only roles with `tasks.edit_due_date` may change due dates
    #[serde(default = "enabled")]
    pub can_edit_due_dates: bool,

    /// When false tasks cannot be created or flagged private
    #[serde(default = "enabled")]
    pub allow_private_tasks: bool,
}

impl Default for OrganizationSettings {
    fn default() -> Self {
        Self {
            branding: Branding::default(),
            can_edit_due_dates: true,
            allow_private_tasks: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,

    /// Globally unique short code, used for self-registration
    pub code: String,

    pub org_type: OrganizationType,
    pub settings: Json<OrganizationSettings>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateOrganization {
    pub name: String,
    pub code: String,
    pub org_type: OrganizationType,
    pub settings: OrganizationSettings,
}

/// Canonical form of an organization code
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

impl Organization {
    pub async fn create<'e>(
        executor: impl PgExecutor<'e>,
        data: CreateOrganization,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Organization>(
            r#"
            INSERT INTO organizations (name, code, org_type, settings)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, code, org_type, settings, active, created_at, updated_at
            "#,
        )
        .bind(data.name.trim())
        .bind(normalize_code(&data.code))
        .bind(data.org_type)
        .bind(Json(data.settings))
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id<'e>(
        executor: impl PgExecutor<'e>,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Organization>(
            r#"
            SELECT id, name, code, org_type, settings, active, created_at, updated_at
            FROM organizations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    pub async fn find_by_code<'e>(
        executor: impl PgExecutor<'e>,
        code: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Organization>(
            r#"
            SELECT id, name, code, org_type, settings, active, created_at, updated_at
            FROM organizations
            WHERE code = $1
            "#,
        )
        .bind(normalize_code(code))
        .fetch_optional(executor)
        .await
    }

    pub async fn code_exists<'e>(
        executor: impl PgExecutor<'e>,
        code: &str,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM organizations WHERE code = $1)")
            .bind(normalize_code(code))
            .fetch_one(executor)
            .await
    }

    /// Every organization, ordered by name
    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Organization>(
            r#"
            SELECT id, name, code, org_type, settings, active, created_at, updated_at
            FROM organizations
            ORDER BY name
            "#,
        )
        .fetch_all(pool)
        .await
    }

    pub async fn set_active(
        pool: &PgPool,
        id: Uuid,
        active: bool,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Organization>(
            r#"
            UPDATE organizations
            SET active = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, code, org_type, settings, active, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(active)
        .fetch_optional(pool)
        .await
    }

    pub async fn update_settings(
        pool: &PgPool,
        id: Uuid,
        settings: OrganizationSettings,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Organization>(
            r#"
            UPDATE organizations
            SET settings = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, code, org_type, settings, active, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(Json(settings))
        .fetch_optional(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_settings_document_uses_defaults() {
        let settings: OrganizationSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, OrganizationSettings::default());
        assert!(settings.can_edit_due_dates);
        assert!(settings.allow_private_tasks);
    }

    #[test]
    fn test_partial_settings_document() {
        let settings: OrganizationSettings = serde_json::from_value(serde_json::json!({
            "branding": { "title": "Escuela 12" },
            "allow_private_tasks": false
        }))
        .unwrap();

        assert_eq!(settings.branding.title.as_deref(), Some("Escuela 12"));
        assert!(settings.branding.logo_url.is_none());
        assert!(!settings.allow_private_tasks);
        assert!(settings.can_edit_due_dates);
    }

    #[test]
    fn test_organization_type_wire_format() {
        assert_eq!(
            serde_json::to_value(OrganizationType::Department).unwrap(),
            "DEPARTMENT"
        );
        let parsed: OrganizationType = serde_json::from_str("\"SCHOOL\"").unwrap();
        assert_eq!(parsed, OrganizationType::School);
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code(" esc-12 "), "ESC-12");
    }
}
