/// Task assignments (task ↔ user, many-to-many)
///
/// ```sql
/// CREATE TABLE task_assignments (
///     task_id UUID NOT NULL REFERENCES tasks(id),
///     user_id UUID NOT NULL REFERENCES users(id),
///     assigned_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (task_id, user_id)
/// );
/// ```
///
/// The foreign key on `task_id` does not cascade: deleting a task must clear
/// its assignments first.

use std::collections::HashMap;

use sqlx::{postgres::PgExecutor, PgConnection, PgPool};
use uuid::Uuid;

pub struct TaskAssignment;

impl TaskAssignment {
    /// Replaces the full assignee set of a task
    ///
    /// Duplicate ids in `user_ids` collapse to one row.
    pub async fn replace_all(
        conn: &mut PgConnection,
        task_id: Uuid,
        user_ids: &[Uuid],
    ) -> Result<(), sqlx::Error> {
        Self::delete_for_task(&mut *conn, task_id).await?;

        if user_ids.is_empty() {
            return Ok(());
        }

        sqlx::query(
            r#"
            INSERT INTO task_assignments (task_id, user_id)
            SELECT $1, u FROM UNNEST($2::uuid[]) AS u
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(task_id)
        .bind(user_ids)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn delete_for_task<'e>(
        executor: impl PgExecutor<'e>,
        task_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM task_assignments WHERE task_id = $1")
            .bind(task_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    /// Assignee ids of one task, in assignment order
    pub async fn assignees<'e>(
        executor: impl PgExecutor<'e>,
        task_id: Uuid,
    ) -> Result<Vec<Uuid>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT user_id FROM task_assignments WHERE task_id = $1 ORDER BY assigned_at, user_id",
        )
        .bind(task_id)
        .fetch_all(executor)
        .await
    }

    /// Assignee ids for many tasks at once
    pub async fn assignees_for(
        pool: &PgPool,
        task_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<Uuid>>, sqlx::Error> {
        let rows: Vec<(Uuid, Uuid)> = sqlx::query_as(
            r#"
            SELECT task_id, user_id FROM task_assignments
            WHERE task_id = ANY($1)
            ORDER BY assigned_at, user_id
            "#,
        )
        .bind(task_ids)
        .fetch_all(pool)
        .await?;

        let mut map: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for (task_id, user_id) in rows {
            map.entry(task_id).or_default().push(user_id);
        }

        Ok(map)
    }
}
