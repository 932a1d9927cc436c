use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type, types::Json};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

use super::snapshot::MasterTaskSnapshot;

#[derive(
    Debug, Clone, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TaskPriority {
    Urgent,
    High,
    #[default]
    Normal,
    Low,
}

#[derive(
    Debug, Clone, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DomainTaskCategory {
    Required,
    #[default]
    Recommended,
    Optional,
}

#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CtaAction {
    Process,
    Form,
    #[default]
    Chat,
    Course,
    Link,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
pub struct CallToAction {
    pub label: String,
    pub action: CtaAction,
    pub target: Option<String>,
    pub params: Option<JsonValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
pub struct Reward {
    pub amount: f64,
    pub currency: String,
    pub display_text: Option<String>,
}

/// Tenant-specific overrides. Applied on top of, never merged into, the
/// master task snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS, Default)]
pub struct DomainCustomizations {
    pub title: Option<String>,
    pub description: Option<String>,
    pub estimated_minutes: Option<i64>,
    pub system_prompt_additions: Option<String>,
    pub reward: Option<Reward>,
    pub additional_context: Option<String>,
}

/// A tenant's adopted copy of a MasterTask. `master_task_snapshot` is frozen
/// at adoption time; customization updates touch only `domain_customizations`
/// and the denormalized display fields.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct DomainTask {
    pub id: Uuid,
    pub domain_id: Uuid,
    pub master_task_id: String,
    pub master_task_version: String,
    #[sqlx(json)]
    pub master_task_snapshot: MasterTaskSnapshot,
    #[sqlx(json(nullable))]
    pub domain_customizations: Option<DomainCustomizations>,
    pub icon: Option<String>,
    pub color: Option<String>,
    #[sqlx(json)]
    pub cta: CallToAction,
    pub requires_identity_verification: bool,
    pub can_hide: bool,
    pub priority: TaskPriority,
    pub category: DomainTaskCategory,
    #[sqlx(json)]
    pub prerequisite_tasks: Vec<Uuid>,
    #[sqlx(json)]
    pub next_tasks: Vec<Uuid>,
    pub is_qms_compliant: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fully-resolved row the adoption engine inserts. Built in one place so the
/// identity-category special case and display defaults stay together.
#[derive(Debug, Clone)]
pub struct CreateDomainTask {
    pub domain_id: Uuid,
    pub master_task_id: String,
    pub master_task_version: String,
    pub master_task_snapshot: MasterTaskSnapshot,
    pub domain_customizations: Option<DomainCustomizations>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub cta: CallToAction,
    pub requires_identity_verification: bool,
    pub can_hide: bool,
    pub priority: TaskPriority,
    pub category: DomainTaskCategory,
    pub prerequisite_tasks: Vec<Uuid>,
    pub next_tasks: Vec<Uuid>,
}

impl DomainTask {
    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, DomainTask>("SELECT * FROM domain_tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_domain_id(
        pool: &SqlitePool,
        domain_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, DomainTask>(
            "SELECT * FROM domain_tasks WHERE domain_id = $1 AND is_active = 1 ORDER BY created_at DESC",
        )
        .bind(domain_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_domain_and_master(
        pool: &SqlitePool,
        domain_id: Uuid,
        master_task_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, DomainTask>(
            "SELECT * FROM domain_tasks WHERE domain_id = $1 AND master_task_id = $2",
        )
        .bind(domain_id)
        .bind(master_task_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn create<'e, E>(
        executor: E,
        data: &CreateDomainTask,
        id: Uuid,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let now = Utc::now();
        sqlx::query_as::<_, DomainTask>(
            r#"INSERT INTO domain_tasks (
                   id, domain_id, master_task_id, master_task_version,
                   master_task_snapshot, domain_customizations, icon, color, cta,
                   requires_identity_verification, can_hide, priority, category,
                   prerequisite_tasks, next_tasks, is_qms_compliant, is_active,
                   created_at, updated_at
               )
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                       $14, $15, 1, 1, $16, $16)
               RETURNING *"#,
        )
        .bind(id)
        .bind(data.domain_id)
        .bind(&data.master_task_id)
        .bind(&data.master_task_version)
        .bind(Json(&data.master_task_snapshot))
        .bind(data.domain_customizations.as_ref().map(Json))
        .bind(&data.icon)
        .bind(&data.color)
        .bind(Json(&data.cta))
        .bind(data.requires_identity_verification)
        .bind(data.can_hide)
        .bind(&data.priority)
        .bind(&data.category)
        .bind(Json(&data.prerequisite_tasks))
        .bind(Json(&data.next_tasks))
        .bind(now)
        .fetch_one(executor)
        .await
    }

    /// Replace the customization overlay. The master task snapshot is never
    /// touched here.
    pub async fn update_customizations(
        pool: &SqlitePool,
        id: Uuid,
        customizations: Option<&DomainCustomizations>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, DomainTask>(
            r#"UPDATE domain_tasks
               SET domain_customizations = $2, updated_at = $3
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(customizations.map(Json))
        .bind(Utc::now())
        .fetch_optional(pool)
        .await
    }

    pub async fn set_prerequisites(
        pool: &SqlitePool,
        id: Uuid,
        prerequisite_tasks: &[Uuid],
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, DomainTask>(
            r#"UPDATE domain_tasks
               SET prerequisite_tasks = $2, updated_at = $3
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(Json(prerequisite_tasks))
        .bind(Utc::now())
        .fetch_optional(pool)
        .await
    }

    pub async fn deactivate(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("UPDATE domain_tasks SET is_active = 0, updated_at = $2 WHERE id = $1")
                .bind(id)
                .bind(Utc::now())
                .execute(pool)
                .await?;
        Ok(result.rows_affected())
    }
}
