//! Common utilities for database-backed tests
//!
//! Every test builds its own organization with a random code so tests can
//! share one database and run in parallel. When `DATABASE_URL` is not set,
//! [`context`] returns `None` and the test returns early.

#![allow(dead_code)]

use sqlx::PgPool;
use taskboard_shared::auth::middleware::AuthContext;
use taskboard_shared::auth::password::hash_password;
use taskboard_shared::auth::permissions::Role;
use taskboard_shared::db::migrations::run_migrations;
use taskboard_shared::db::pool::{create_pool, DatabaseConfig};
use taskboard_shared::models::organization::{
    CreateOrganization, Organization, OrganizationSettings, OrganizationType,
};
use taskboard_shared::models::user::{CreateUser, User};
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "Sup3rSecret!";

pub struct TestContext {
    pub db: PgPool,
    pub organizations: Vec<Uuid>,
}

/// Connects and migrates, or `None` when no database is configured
pub async fn context() -> Option<TestContext> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("DATABASE_URL not set; skipping database test");
            return None;
        }
    };

    let db = create_pool(DatabaseConfig {
        max_connections: 5,
        ..DatabaseConfig::with_url(url)
    })
    .await
    .expect("Failed to connect to test database");
    run_migrations(&db).await.expect("Failed to run migrations");

    Some(TestContext {
        db,
        organizations: Vec::new(),
    })
}

pub fn unique_code(prefix: &str) -> String {
    format!("{}-{}", prefix, &Uuid::new_v4().simple().to_string()[..8])
}

pub fn unique_email(name: &str) -> String {
    format!("{}-{}@taskboard.test", name, Uuid::new_v4().simple())
}

impl TestContext {
    pub async fn organization(&mut self) -> Organization {
        self.organization_with(OrganizationSettings::default()).await
    }

    pub async fn organization_with(&mut self, settings: OrganizationSettings) -> Organization {
        let org = Organization::create(
            &self.db,
            CreateOrganization {
                name: "Test School".to_string(),
                code: unique_code("T"),
                org_type: OrganizationType::School,
                settings,
            },
        )
        .await
        .expect("Failed to create organization");

        self.organizations.push(org.id);
        org
    }

    /// Creates an active user and the identity a session for them resolves to
    pub async fn user(&self, organization_id: Uuid, role: Role) -> (User, AuthContext) {
        let user = User::create(
            &self.db,
            CreateUser {
                organization_id,
                name: format!("{} user", role),
                email: unique_email(role.as_str()),
                password_hash: hash_password(TEST_PASSWORD).expect("hash"),
                role,
                first_login_completed: true,
            },
        )
        .await
        .expect("Failed to create user");

        let ctx = AuthContext::new(user.id, organization_id, role, user.email.clone());
        (user, ctx)
    }

    /// Removes everything created under the tracked organizations
    pub async fn cleanup(&self) {
        for org_id in &self.organizations {
            let statements = [
                "DELETE FROM task_assignments WHERE task_id IN (SELECT id FROM tasks WHERE organization_id = $1)",
                "DELETE FROM task_assignments WHERE user_id IN (SELECT id FROM users WHERE organization_id = $1)",
                "DELETE FROM tasks WHERE organization_id = $1",
                "DELETE FROM password_resets WHERE user_id IN (SELECT id FROM users WHERE organization_id = $1)",
                "DELETE FROM users WHERE organization_id = $1",
                "DELETE FROM organizations WHERE id = $1",
            ];
            for sql in statements {
                sqlx::query(sql)
                    .bind(org_id)
                    .execute(&self.db)
                    .await
                    .expect("cleanup");
            }
        }
    }
}
