use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    query::TaskQuery,
    repo_types::{StarToggle, Task, TaskPatch},
};
use crate::error::StoreError;

/// Task store. Every operation is scoped to the owning user.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn list(&self, owner: i64, query: &TaskQuery) -> Result<Vec<Task>, StoreError>;
    async fn find(&self, owner: i64, id: Uuid) -> Result<Option<Task>, StoreError>;
    async fn insert(&self, task: &Task) -> Result<(), StoreError>;
    /// Merge `patch` and bump `last_updated`; `None` if no such task.
    async fn update(&self, owner: i64, id: Uuid, patch: &TaskPatch)
        -> Result<Option<Task>, StoreError>;
    async fn delete(&self, owner: i64, id: Uuid) -> Result<bool, StoreError>;
    async fn toggle_star(&self, owner: i64, id: Uuid) -> Result<Option<StarToggle>, StoreError>;
}

const TASK_COLUMNS: &str = "id, name, details, created_date, starred, last_updated, user_id";

// Strictly later than the stored value even when the clock has not moved.
const NEXT_UPDATE: &str =
    "GREATEST(clock_timestamp(), last_updated + INTERVAL '1 microsecond')";

#[derive(Clone)]
pub struct PgTaskStore {
    db: PgPool,
}

impl PgTaskStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TaskStore for PgTaskStore {
    async fn list(&self, owner: i64, query: &TaskQuery) -> Result<Vec<Task>, StoreError> {
        let mut qb = query.to_sql(owner);
        let rows = qb.build_query_as::<Task>().fetch_all(&self.db).await?;
        Ok(rows)
    }

    async fn find(&self, owner: i64, id: Uuid) -> Result<Option<Task>, StoreError> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1 AND user_id = $2");
        let task = sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .bind(owner)
            .fetch_optional(&self.db)
            .await?;
        Ok(task)
    }

    async fn insert(&self, task: &Task) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO tasks (id, name, details, created_date, starred, last_updated, user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(task.id)
        .bind(&task.name)
        .bind(&task.details)
        .bind(task.created_date)
        .bind(task.starred)
        .bind(task.last_updated)
        .bind(task.user_id)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn update(
        &self,
        owner: i64,
        id: Uuid,
        patch: &TaskPatch,
    ) -> Result<Option<Task>, StoreError> {
        let sql = format!(
            r#"
            UPDATE tasks
               SET name = COALESCE($3, name),
                   details = COALESCE($4, details),
                   starred = COALESCE($5, starred),
                   last_updated = {NEXT_UPDATE}
             WHERE id = $1 AND user_id = $2
            RETURNING {TASK_COLUMNS}
            "#
        );
        let task = sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .bind(owner)
            .bind(&patch.name)
            .bind(&patch.details)
            .bind(patch.starred)
            .fetch_optional(&self.db)
            .await?;
        Ok(task)
    }

    async fn delete(&self, owner: i64, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn toggle_star(&self, owner: i64, id: Uuid) -> Result<Option<StarToggle>, StoreError> {
        let sql = format!(
            r#"
            UPDATE tasks
               SET starred = NOT starred,
                   last_updated = {NEXT_UPDATE}
             WHERE id = $1 AND user_id = $2
            RETURNING starred, last_updated
            "#
        );
        let row = sqlx::query_as::<_, (bool, time::OffsetDateTime)>(&sql)
            .bind(id)
            .bind(owner)
            .fetch_optional(&self.db)
            .await?;
        Ok(row.map(|(have_star, last_updated)| StarToggle {
            have_star,
            last_updated,
        }))
    }
}
