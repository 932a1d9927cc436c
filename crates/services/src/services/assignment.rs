use db::models::{
    domain_task::DomainTask,
    snapshot::TaskSnapshot,
    user_task::{CreateUserTask, UserTask},
};
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AssignmentError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("Domain task not found")]
    DomainTaskNotFound,
    #[error("Domain task is not active")]
    DomainTaskInactive,
    #[error("Task already assigned to this user")]
    AlreadyAssigned,
    #[error("Prerequisites not met: {completed} of {required} prerequisite tasks completed")]
    PrerequisitesNotMet { required: usize, completed: usize },
}

pub struct AssignmentService;

impl AssignmentService {
    /// Copy a DomainTask into a per-user UserTask snapshot.
    ///
    /// Re-assigning a hidden task un-hides the existing row instead of
    /// creating a duplicate; re-assigning a visible one fails. The snapshot
    /// taken here is what the execution context builder reads later, so
    /// subsequent template or customization edits are not observable through
    /// this UserTask.
    pub async fn assign(
        pool: &SqlitePool,
        user_id: Uuid,
        domain_task_id: Uuid,
        assigned_by: Option<Uuid>,
        reason: Option<String>,
    ) -> Result<UserTask, AssignmentError> {
        let domain_task = DomainTask::find_by_id(pool, domain_task_id)
            .await?
            .ok_or(AssignmentError::DomainTaskNotFound)?;
        if !domain_task.is_active {
            return Err(AssignmentError::DomainTaskInactive);
        }

        if let Some(existing) =
            UserTask::find_by_user_and_domain_task(pool, user_id, domain_task_id).await?
        {
            if existing.is_hidden {
                tracing::debug!(
                    "Un-hiding previously assigned user task {} for user {}",
                    existing.id,
                    user_id
                );
                return UserTask::set_hidden(pool, existing.id, false)
                    .await?
                    .ok_or(AssignmentError::AlreadyAssigned);
            }
            return Err(AssignmentError::AlreadyAssigned);
        }

        // Count-based gate: the user must have completed at least as many of
        // the prerequisite tasks as the list names.
        if !domain_task.prerequisite_tasks.is_empty() {
            let required = domain_task.prerequisite_tasks.len();
            let completed =
                UserTask::count_completed_in(pool, user_id, &domain_task.prerequisite_tasks)
                    .await? as usize;
            if completed < required {
                return Err(AssignmentError::PrerequisitesNotMet {
                    required,
                    completed,
                });
            }
        }

        let data = CreateUserTask {
            user_id,
            domain_task_id,
            master_task_id: domain_task.master_task_id.clone(),
            task_snapshot: TaskSnapshot::capture(&domain_task),
            assigned_by,
            assignment_reason: reason,
        };

        // Two concurrent assigns race on UNIQUE(user_id, domain_task_id);
        // the loser surfaces as AlreadyAssigned and must re-fetch.
        let user_task = UserTask::create(pool, &data, Uuid::new_v4())
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                    AssignmentError::AlreadyAssigned
                }
                other => AssignmentError::Database(other),
            })?;

        tracing::info!(
            "Assigned domain task {} to user {} as user task {}",
            domain_task_id,
            user_id,
            user_task.id
        );

        Ok(user_task)
    }
}
