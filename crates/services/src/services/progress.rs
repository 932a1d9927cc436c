use db::models::user_task::{TaskProgress, UserTask};
use serde_json::Value as JsonValue;
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ProgressError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("User task not found")]
    NotFound,
    #[error("Task already completed")]
    AlreadyCompleted,
}

/// Mutates only a UserTask's own status fields; never touches the domain
/// task or template.
pub struct ProgressService;

impl ProgressService {
    /// Fire-and-forget view telemetry: a missing task is logged and ignored.
    pub async fn mark_viewed(pool: &SqlitePool, user_task_id: Uuid) -> Result<(), ProgressError> {
        let rows = UserTask::record_view(pool, user_task_id).await?;
        if rows == 0 {
            tracing::debug!("mark_viewed: user task {} not found, ignoring", user_task_id);
        }
        Ok(())
    }

    /// Flip visibility. `can_hide` is not checked here; hiding is a
    /// client-side affordance and the snapshot flag is advisory.
    pub async fn toggle_hidden(
        pool: &SqlitePool,
        user_task_id: Uuid,
    ) -> Result<UserTask, ProgressError> {
        let task = UserTask::find_by_id(pool, user_task_id)
            .await?
            .ok_or(ProgressError::NotFound)?;

        UserTask::set_hidden(pool, task.id, !task.is_hidden)
            .await?
            .ok_or(ProgressError::NotFound)
    }

    /// Terminal completion. A second call fails and leaves `completed_at`
    /// unchanged.
    pub async fn complete(
        pool: &SqlitePool,
        user_task_id: Uuid,
        completion_data: Option<JsonValue>,
    ) -> Result<UserTask, ProgressError> {
        let task = UserTask::find_by_id(pool, user_task_id)
            .await?
            .ok_or(ProgressError::NotFound)?;
        if task.is_completed {
            return Err(ProgressError::AlreadyCompleted);
        }

        let progress = TaskProgress {
            current_step: task.progress.total_steps,
            total_steps: task.progress.total_steps,
            percent_complete: 100.0,
        };

        // The UPDATE itself is guarded on is_completed, so a concurrent
        // completion that slipped past the read above loses here.
        let completed = UserTask::mark_completed(
            pool,
            task.id,
            completion_data.as_ref(),
            &progress,
        )
        .await?
        .ok_or(ProgressError::AlreadyCompleted)?;

        tracing::info!("User task {} completed", completed.id);
        Ok(completed)
    }

    pub async fn update_progress(
        pool: &SqlitePool,
        user_task_id: Uuid,
        progress: TaskProgress,
    ) -> Result<UserTask, ProgressError> {
        UserTask::update_progress(pool, user_task_id, &progress)
            .await?
            .ok_or(ProgressError::NotFound)
    }
}
