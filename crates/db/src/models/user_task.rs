use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, types::Json};
use ts_rs::TS;
use uuid::Uuid;

use super::snapshot::TaskSnapshot;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
pub struct TaskProgress {
    pub current_step: i64,
    pub total_steps: i64,
    pub percent_complete: f64,
}

impl Default for TaskProgress {
    fn default() -> Self {
        Self {
            current_step: 0,
            total_steps: 1,
            percent_complete: 0.0,
        }
    }
}

/// Immutable per-user snapshot of a DomainTask, created once at assignment.
/// Only the progress/interaction fields below the snapshot are ever mutated;
/// rows are retained forever for the audit trail.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct UserTask {
    pub id: Uuid,
    pub user_id: Uuid,
    pub domain_task_id: Uuid,
    pub master_task_id: String,
    #[sqlx(json)]
    pub task_snapshot: TaskSnapshot,
    pub assigned_at: DateTime<Utc>,
    pub assigned_by: Option<Uuid>,
    pub assignment_reason: Option<String>,
    pub is_hidden: bool,
    pub hidden_at: Option<DateTime<Utc>>,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    #[sqlx(json(nullable))]
    pub completion_data: Option<JsonValue>,
    pub last_viewed_at: Option<DateTime<Utc>>,
    pub view_count: i64,
    #[sqlx(json)]
    pub progress: TaskProgress,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateUserTask {
    pub user_id: Uuid,
    pub domain_task_id: Uuid,
    pub master_task_id: String,
    pub task_snapshot: TaskSnapshot,
    pub assigned_by: Option<Uuid>,
    pub assignment_reason: Option<String>,
}

impl UserTask {
    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, UserTask>("SELECT * FROM user_tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_user_id(
        pool: &SqlitePool,
        user_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, UserTask>(
            "SELECT * FROM user_tasks WHERE user_id = $1 ORDER BY assigned_at DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_user_and_domain_task(
        pool: &SqlitePool,
        user_id: Uuid,
        domain_task_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, UserTask>(
            "SELECT * FROM user_tasks WHERE user_id = $1 AND domain_task_id = $2",
        )
        .bind(user_id)
        .bind(domain_task_id)
        .fetch_optional(pool)
        .await
    }

    /// Completed tasks the user has among the given domain task ids. Used for
    /// prerequisite gating.
    pub async fn count_completed_in(
        pool: &SqlitePool,
        user_id: Uuid,
        domain_task_ids: &[Uuid],
    ) -> Result<i64, sqlx::Error> {
        if domain_task_ids.is_empty() {
            return Ok(0);
        }

        let mut query_builder = sqlx::QueryBuilder::new(
            "SELECT COUNT(*) FROM user_tasks WHERE is_completed = 1 AND user_id = ",
        );
        query_builder.push_bind(user_id);
        query_builder.push(" AND domain_task_id IN (");
        let mut separated = query_builder.separated(", ");
        for id in domain_task_ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let count: i64 = query_builder.build_query_scalar().fetch_one(pool).await?;
        Ok(count)
    }

    pub async fn create<'e, E>(
        executor: E,
        data: &CreateUserTask,
        id: Uuid,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let now = Utc::now();
        sqlx::query_as::<_, UserTask>(
            r#"INSERT INTO user_tasks (
                   id, user_id, domain_task_id, master_task_id, task_snapshot,
                   assigned_at, assigned_by, assignment_reason, is_hidden,
                   is_completed, view_count, progress, created_at, updated_at
               )
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 0, 0, 0, $9, $6, $6)
               RETURNING *"#,
        )
        .bind(id)
        .bind(data.user_id)
        .bind(data.domain_task_id)
        .bind(&data.master_task_id)
        .bind(Json(&data.task_snapshot))
        .bind(now)
        .bind(data.assigned_by)
        .bind(&data.assignment_reason)
        .bind(Json(TaskProgress::default()))
        .fetch_one(executor)
        .await
    }

    pub async fn set_hidden(
        pool: &SqlitePool,
        id: Uuid,
        hidden: bool,
    ) -> Result<Option<Self>, sqlx::Error> {
        let now = Utc::now();
        let hidden_at = hidden.then_some(now);
        sqlx::query_as::<_, UserTask>(
            r#"UPDATE user_tasks
               SET is_hidden = $2, hidden_at = $3, updated_at = $4
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(hidden)
        .bind(hidden_at)
        .bind(now)
        .fetch_optional(pool)
        .await
    }

    /// Bump the view counter. Returns the number of rows touched so the
    /// caller can decide what a miss means.
    pub async fn record_view(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"UPDATE user_tasks
               SET view_count = view_count + 1, last_viewed_at = $2, updated_at = $2
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(now)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Guarded on `is_completed = 0` so two racing completions cannot both
    /// write; the loser sees `None`.
    pub async fn mark_completed(
        pool: &SqlitePool,
        id: Uuid,
        completion_data: Option<&JsonValue>,
        progress: &TaskProgress,
    ) -> Result<Option<Self>, sqlx::Error> {
        let now = Utc::now();
        sqlx::query_as::<_, UserTask>(
            r#"UPDATE user_tasks
               SET is_completed = 1, completed_at = $2, completion_data = $3,
                   progress = $4, updated_at = $2
               WHERE id = $1 AND is_completed = 0
               RETURNING *"#,
        )
        .bind(id)
        .bind(now)
        .bind(completion_data.map(Json))
        .bind(Json(progress))
        .fetch_optional(pool)
        .await
    }

    pub async fn update_progress(
        pool: &SqlitePool,
        id: Uuid,
        progress: &TaskProgress,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, UserTask>(
            r#"UPDATE user_tasks
               SET progress = $2, updated_at = $3
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(Json(progress))
        .bind(Utc::now())
        .fetch_optional(pool)
        .await
    }
}
