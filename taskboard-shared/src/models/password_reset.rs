/// Password-reset records
///
/// One row per issued reset token. Only the SHA-256 digest of the token is
/// stored; a record is usable once, before `expires_at`.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::postgres::PgExecutor;
use uuid::Uuid;

/// How long an issued reset token stays valid
pub const RESET_TOKEN_TTL_HOURS: i64 = 72;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PasswordReset {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(skip_serializing)]
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PasswordReset {
    /// Stores a digest valid for [`RESET_TOKEN_TTL_HOURS`]
    pub async fn create<'e>(
        executor: impl PgExecutor<'e>,
        user_id: Uuid,
        token_hash: &str,
    ) -> Result<Self, sqlx::Error> {
        let expires_at = Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS);

        sqlx::query_as::<_, PasswordReset>(
            r#"
            INSERT INTO password_resets (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, token_hash, expires_at, used_at, created_at
            "#,
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .fetch_one(executor)
        .await
    }

    /// Unused, unexpired record for a digest
    pub async fn find_valid<'e>(
        executor: impl PgExecutor<'e>,
        token_hash: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, PasswordReset>(
            r#"
            SELECT id, user_id, token_hash, expires_at, used_at, created_at
            FROM password_resets
            WHERE token_hash = $1 AND used_at IS NULL AND expires_at > NOW()
            FOR UPDATE
            "#,
        )
        .bind(token_hash)
        .fetch_optional(executor)
        .await
    }

    pub async fn mark_used<'e>(executor: impl PgExecutor<'e>, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE password_resets SET used_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(())
    }

    /// Number of records issued for a user
    pub async fn count_for_user<'e>(
        executor: impl PgExecutor<'e>,
        user_id: Uuid,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM password_resets WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(executor)
            .await
    }
}
