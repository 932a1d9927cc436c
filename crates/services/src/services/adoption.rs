use db::models::{
    domain_adoption::{CreateDomainAdoption, DomainAdoption},
    domain_task::{
        CallToAction, CreateDomainTask, CtaAction, DomainCustomizations, DomainTask,
        DomainTaskCategory, TaskPriority,
    },
    master_task::{ExecutionModel, MasterTask, TaskCategory},
    snapshot::MasterTaskSnapshot,
};
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AdoptionError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("Master task not found")]
    TemplateNotFound,
    #[error("Master task is not active")]
    TemplateInactive,
    #[error("Task already adopted by this domain")]
    AlreadyAdopted,
}

/// Display defaults derived from the template, applied when the tenant does
/// not override them.
struct DisplayDefaults {
    icon: &'static str,
    color: &'static str,
    cta: CallToAction,
}

fn display_defaults(category: &TaskCategory, execution_model: &ExecutionModel) -> DisplayDefaults {
    let (icon, color) = match category {
        TaskCategory::Identity => ("shield-check", "#2563eb"),
        TaskCategory::Onboarding => ("rocket", "#7c3aed"),
        TaskCategory::Compliance => ("clipboard-list", "#dc2626"),
        TaskCategory::Training => ("graduation-cap", "#059669"),
        TaskCategory::Operational => ("wrench", "#6b7280"),
        TaskCategory::Financial => ("banknotes", "#d97706"),
    };

    let (action, label) = match execution_model {
        ExecutionModel::Form => (CtaAction::Form, "Fill out form"),
        ExecutionModel::Sop => (CtaAction::Process, "Start process"),
        ExecutionModel::Knowledge => (CtaAction::Chat, "Ask a question"),
        ExecutionModel::Bpmn => (CtaAction::Process, "Start workflow"),
        ExecutionModel::Training => (CtaAction::Course, "Start course"),
    };

    DisplayDefaults {
        icon,
        color,
        cta: CallToAction {
            label: label.to_string(),
            action,
            target: None,
            params: None,
        },
    }
}

pub struct AdoptionService;

impl AdoptionService {
    /// Copy a MasterTask into a tenant-scoped DomainTask.
    ///
    /// The template's execution-relevant fields are deep-copied into
    /// `master_task_snapshot`; the tenant's customizations stay a separate
    /// overlay. The DomainTask insert and the adoption ledger row commit in
    /// one transaction.
    pub async fn adopt(
        pool: &SqlitePool,
        domain_id: Uuid,
        master_task_id: &str,
        adopted_by: Option<Uuid>,
        customizations: Option<DomainCustomizations>,
    ) -> Result<DomainTask, AdoptionError> {
        let template = MasterTask::find_by_external_id(pool, master_task_id)
            .await?
            .ok_or(AdoptionError::TemplateNotFound)?;
        if !template.active {
            return Err(AdoptionError::TemplateInactive);
        }

        if DomainTask::find_by_domain_and_master(pool, domain_id, master_task_id)
            .await?
            .is_some()
        {
            return Err(AdoptionError::AlreadyAdopted);
        }

        let snapshot = MasterTaskSnapshot::capture(&template);
        let defaults = display_defaults(&template.category, &template.execution_model);

        // Identity verification tasks cannot themselves require a verified
        // identity, and are always surfaced first.
        let is_identity = template.category == TaskCategory::Identity;
        let (requires_identity_verification, priority, category, cta) = if is_identity {
            (
                false,
                TaskPriority::Urgent,
                DomainTaskCategory::Required,
                CallToAction {
                    action: CtaAction::Process,
                    ..defaults.cta
                },
            )
        } else {
            (
                true,
                TaskPriority::Normal,
                DomainTaskCategory::Recommended,
                defaults.cta,
            )
        };

        let data = CreateDomainTask {
            domain_id,
            master_task_id: template.master_task_id.clone(),
            master_task_version: template.version(),
            master_task_snapshot: snapshot,
            domain_customizations: customizations,
            icon: Some(defaults.icon.to_string()),
            color: Some(defaults.color.to_string()),
            cta,
            requires_identity_verification,
            can_hide: !is_identity,
            priority,
            category,
            prerequisite_tasks: Vec::new(),
            next_tasks: Vec::new(),
        };

        let mut tx = pool.begin().await?;

        let domain_task = DomainTask::create(&mut *tx, &data, Uuid::new_v4())
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                    AdoptionError::AlreadyAdopted
                }
                other => AdoptionError::Database(other),
            })?;

        DomainAdoption::create(
            &mut *tx,
            &CreateDomainAdoption {
                master_task_id: template.master_task_id.clone(),
                domain_id,
                adopted_by,
                allowed_roles: DomainAdoption::default_allowed_roles(),
                custom_name: None,
                custom_description: None,
            },
            Uuid::new_v4(),
        )
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AdoptionError::AlreadyAdopted
            }
            other => AdoptionError::Database(other),
        })?;

        tx.commit().await?;

        tracing::info!(
            "Domain {} adopted master task '{}' (version {})",
            domain_id,
            domain_task.master_task_id,
            domain_task.master_task_version
        );

        Ok(domain_task)
    }
}
