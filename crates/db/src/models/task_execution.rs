use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type, types::Json};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

use super::snapshot::TaskSnapshot;

#[derive(
    Debug, Clone, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExecutionStatus {
    #[default]
    Assigned,
    InProgress,
    Completed,
}

#[derive(
    Debug, Clone, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display,
)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MessageRole {
    System,
    Assistant,
    User,
}

/// Conversational run of a UserTask. Carries its own frozen snapshot and the
/// system prompt built once at creation; neither is ever recomputed.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct TaskExecution {
    pub id: Uuid,
    pub user_id: Uuid,
    pub domain_task_id: Uuid,
    pub user_task_id: Uuid,
    #[sqlx(json)]
    pub task_snapshot: TaskSnapshot,
    pub system_prompt: String,
    pub status: ExecutionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateTaskExecution {
    pub user_id: Uuid,
    pub domain_task_id: Uuid,
    pub user_task_id: Uuid,
    pub task_snapshot: TaskSnapshot,
    pub system_prompt: String,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct ExecutionMessage {
    pub id: Uuid,
    pub execution_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl TaskExecution {
    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, TaskExecution>("SELECT * FROM task_executions WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Most recent execution for a user task. The first existing execution is
    /// treated as canonical and reused rather than duplicated.
    pub async fn find_latest_by_user_task(
        pool: &SqlitePool,
        user_task_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, TaskExecution>(
            r#"SELECT * FROM task_executions
               WHERE user_task_id = $1
               ORDER BY created_at DESC
               LIMIT 1"#,
        )
        .bind(user_task_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn create<'e, E>(
        executor: E,
        data: &CreateTaskExecution,
        id: Uuid,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let now = Utc::now();
        sqlx::query_as::<_, TaskExecution>(
            r#"INSERT INTO task_executions (
                   id, user_id, domain_task_id, user_task_id, task_snapshot,
                   system_prompt, status, created_at, updated_at
               )
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
               RETURNING *"#,
        )
        .bind(id)
        .bind(data.user_id)
        .bind(data.domain_task_id)
        .bind(data.user_task_id)
        .bind(Json(&data.task_snapshot))
        .bind(&data.system_prompt)
        .bind(ExecutionStatus::Assigned)
        .bind(now)
        .fetch_one(executor)
        .await
    }

    pub async fn update_status(
        pool: &SqlitePool,
        id: Uuid,
        status: ExecutionStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, TaskExecution>(
            r#"UPDATE task_executions
               SET status = $2, updated_at = $3
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(status)
        .bind(Utc::now())
        .fetch_optional(pool)
        .await
    }
}

impl ExecutionMessage {
    pub async fn create<'e, E>(
        executor: E,
        execution_id: Uuid,
        role: MessageRole,
        content: &str,
        id: Uuid,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, ExecutionMessage>(
            r#"INSERT INTO execution_messages (id, execution_id, role, content, created_at)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING *"#,
        )
        .bind(id)
        .bind(execution_id)
        .bind(role)
        .bind(content)
        .bind(Utc::now())
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_execution_id(
        pool: &SqlitePool,
        execution_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ExecutionMessage>(
            "SELECT * FROM execution_messages WHERE execution_id = $1 ORDER BY created_at ASC",
        )
        .bind(execution_id)
        .fetch_all(pool)
        .await
    }
}
