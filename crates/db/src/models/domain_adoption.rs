use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, types::Json};
use ts_rs::TS;
use uuid::Uuid;

/// One row per tenant that has adopted a template. Keyed
/// `(master_task_id, domain_id)` so each adoption can be updated atomically
/// instead of mutating an array on the template row.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct DomainAdoption {
    pub id: Uuid,
    pub master_task_id: String,
    pub domain_id: Uuid,
    pub adopted_at: DateTime<Utc>,
    pub adopted_by: Option<Uuid>,
    #[sqlx(json)]
    pub allowed_roles: Vec<String>,
    pub custom_name: Option<String>,
    pub custom_description: Option<String>,
    pub active: bool,
    /// Aggregate counters kept for schema parity; no operation in this
    /// subsystem increments them.
    pub execution_count: i64,
    pub average_completion_minutes: Option<f64>,
    pub success_rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateDomainAdoption {
    pub master_task_id: String,
    pub domain_id: Uuid,
    pub adopted_by: Option<Uuid>,
    pub allowed_roles: Vec<String>,
    pub custom_name: Option<String>,
    pub custom_description: Option<String>,
}

impl DomainAdoption {
    pub fn default_allowed_roles() -> Vec<String> {
        vec!["user".to_string(), "admin".to_string()]
    }

    pub async fn create<'e, E>(
        executor: E,
        data: &CreateDomainAdoption,
        id: Uuid,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, DomainAdoption>(
            r#"INSERT INTO domain_adoptions (
                   id, master_task_id, domain_id, adopted_at, adopted_by,
                   allowed_roles, custom_name, custom_description, active
               )
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 1)
               RETURNING *"#,
        )
        .bind(id)
        .bind(&data.master_task_id)
        .bind(data.domain_id)
        .bind(Utc::now())
        .bind(data.adopted_by)
        .bind(Json(&data.allowed_roles))
        .bind(&data.custom_name)
        .bind(&data.custom_description)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_domain_id(
        pool: &SqlitePool,
        domain_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, DomainAdoption>(
            "SELECT * FROM domain_adoptions WHERE domain_id = $1 ORDER BY adopted_at DESC",
        )
        .bind(domain_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_master_task_id(
        pool: &SqlitePool,
        master_task_id: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, DomainAdoption>(
            "SELECT * FROM domain_adoptions WHERE master_task_id = $1 ORDER BY adopted_at DESC",
        )
        .bind(master_task_id)
        .fetch_all(pool)
        .await
    }
}
