/// User model and database operations
///
/// Users belong to exactly one organization and hold exactly one [`Role`].
/// Emails are unique across the whole system regardless of case; they are
/// stored lowercased and the `users_email_key` index is on `LOWER(email)`.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     organization_id UUID NOT NULL REFERENCES organizations(id),
///     name TEXT NOT NULL,
///     email TEXT NOT NULL,
///     password_hash TEXT NOT NULL,
///     role user_role NOT NULL DEFAULT 'member',
///     active BOOLEAN NOT NULL DEFAULT TRUE,
///     first_login_completed BOOLEAN NOT NULL DEFAULT FALSE,
///     last_login_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// CREATE UNIQUE INDEX users_email_key ON users (LOWER(email));
/// ```
///
/// # Lifecycle
///
/// Accounts are normally retired with [`User::set_active`]. [`User::purge`]
/// is the hard delete: it removes password-reset records and task
/// assignments in the same transaction but leaves authored tasks in place,
/// so their `created_by` keeps pointing at the removed id.
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::models::user::{CreateUser, User};
/// use taskboard_shared::auth::permissions::Role;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, org_id: Uuid) -> Result<(), sqlx::Error> {
/// let user = User::create(&pool, CreateUser {
///     organization_id: org_id,
///     name: "Ana Pérez".to_string(),
///     email: "Ana@School.test".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     role: Role::Member,
///     first_login_completed: true,
/// }).await?;
///
/// assert_eq!(user.email, "ana@school.test");
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgExecutor, PgPool};
use uuid::Uuid;

pub use crate::auth::permissions::Role;

/// Canonical form used for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,

    pub organization_id: Uuid,

    pub name: String,

    /// Always lowercase
    pub email: String,

    /// Argon2id PHC string, never serialized
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    pub role: Role,

    pub active: bool,

    /// False until the user replaces the temporary password they were given
    pub first_login_completed: bool,

    pub last_login_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for creating a user
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub organization_id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub first_login_completed: bool,
}

/// Partial update; `None` leaves the column untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub role: Option<Role>,
}

impl UpdateUser {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.role.is_none()
    }
}

impl User {
    /// Inserts a user, lowercasing the email
    ///
    /// # Errors
    ///
    /// A duplicate email surfaces as a database error on `users_email_key`.
    pub async fn create<'e>(
        executor: impl PgExecutor<'e>,
        data: CreateUser,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (organization_id, name, email, password_hash, role, first_login_completed)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, organization_id, name, email, password_hash, role, active,
                      first_login_completed, last_login_at, created_at, updated_at
            "#,
        )
        .bind(data.organization_id)
        .bind(data.name.trim())
        .bind(normalize_email(&data.email))
        .bind(data.password_hash)
        .bind(data.role)
        .bind(data.first_login_completed)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id<'e>(
        executor: impl PgExecutor<'e>,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, organization_id, name, email, password_hash, role, active,
                   first_login_completed, last_login_at, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Case-insensitive lookup
    pub async fn find_by_email<'e>(
        executor: impl PgExecutor<'e>,
        email: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, organization_id, name, email, password_hash, role, active,
                   first_login_completed, last_login_at, created_at, updated_at
            FROM users
            WHERE LOWER(email) = $1
            "#,
        )
        .bind(normalize_email(email))
        .fetch_optional(executor)
        .await
    }

    /// Whether any account already uses `email`
    pub async fn email_exists<'e>(
        executor: impl PgExecutor<'e>,
        email: &str,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE LOWER(email) = $1)")
            .bind(normalize_email(email))
            .fetch_one(executor)
            .await
    }

    /// Members of an organization, ordered by name
    pub async fn list_by_organization(
        pool: &PgPool,
        organization_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, organization_id, name, email, password_hash, role, active,
                   first_login_completed, last_login_at, created_at, updated_at
            FROM users
            WHERE organization_id = $1
            ORDER BY name, email
            "#,
        )
        .bind(organization_id)
        .fetch_all(pool)
        .await
    }

    /// Number of `ids` that are active users of `organization_id`
    pub async fn count_active_in_organization<'e>(
        executor: impl PgExecutor<'e>,
        organization_id: Uuid,
        ids: &[Uuid],
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE organization_id = $1 AND active AND id = ANY($2)",
        )
        .bind(organization_id)
        .bind(ids)
        .fetch_one(executor)
        .await
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE users SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.role.is_some() {
            bind_count += 1;
            query.push_str(&format!(", role = ${}", bind_count));
        }

        query.push_str(
            " WHERE id = $1 RETURNING id, organization_id, name, email, password_hash, role, active, \
             first_login_completed, last_login_at, created_at, updated_at",
        );

        let mut q = sqlx::query_as::<_, User>(&query).bind(id);

        if let Some(name) = data.name {
            q = q.bind(name.trim().to_string());
        }
        if let Some(role) = data.role {
            q = q.bind(role);
        }

        q.fetch_optional(pool).await
    }

    /// Flips the active flag; returns the updated row
    pub async fn set_active(
        pool: &PgPool,
        id: Uuid,
        active: bool,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET active = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, organization_id, name, email, password_hash, role, active,
                      first_login_completed, last_login_at, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(active)
        .fetch_optional(pool)
        .await
    }

    /// Replaces the password digest
    pub async fn set_password<'e>(
        executor: impl PgExecutor<'e>,
        id: Uuid,
        password_hash: &str,
        first_login_completed: bool,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2, first_login_completed = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .bind(first_login_completed)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn update_last_login(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Hard delete. Dependent rows go first, authored tasks stay.
    ///
    /// Returns `false` if no such user existed.
    pub async fn purge(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM password_resets WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM task_assignments WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ana@School.TEST "), "ana@school.test");
        assert_eq!(normalize_email("plain@x.io"), "plain@x.io");
    }

    #[test]
    fn test_update_user_is_empty() {
        assert!(UpdateUser::default().is_empty());
        assert!(!UpdateUser {
            role: Some(Role::Coordinator),
            ..Default::default()
        }
        .is_empty());
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            name: "Ana".to_string(),
            email: "ana@school.test".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            role: Role::Member,
            active: true,
            first_login_completed: true,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "member");
    }
}
