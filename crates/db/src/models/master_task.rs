use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::{FromRow, SqlitePool, Type, types::Json};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(
    Debug, Clone, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TaskCategory {
    Identity,
    Onboarding,
    Compliance,
    Training,
    #[default]
    Operational,
    Financial,
}

#[derive(
    Debug, Clone, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ExecutionModel {
    Form,
    #[default]
    Sop,
    Knowledge,
    Bpmn,
    Training,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS, Default)]
pub struct SopScope {
    #[serde(default)]
    pub included: Vec<String>,
    #[serde(default)]
    pub excluded: Vec<String>,
    #[serde(default)]
    pub applicable_to: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
pub struct SopRole {
    pub name: String,
    #[serde(default)]
    pub responsibilities: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
pub struct DecisionPoint {
    pub condition: String,
    #[serde(default)]
    pub outcomes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
pub struct SopProcedure {
    pub step_number: i64,
    pub name: String,
    pub description: Option<String>,
    pub responsible: Option<String>,
    #[serde(default)]
    pub decision_points: Vec<DecisionPoint>,
}

/// Structured objective/scope/policies/roles/procedures document attached to
/// an `sop`-model task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
pub struct StandardOperatingProcedure {
    pub objective: String,
    #[serde(default)]
    pub scope: SopScope,
    #[serde(default)]
    pub policies: Vec<String>,
    #[serde(default)]
    pub compliance_standards: Vec<String>,
    #[serde(default)]
    pub regulations: Vec<String>,
    #[serde(default)]
    pub roles: Vec<SopRole>,
    #[serde(default)]
    pub procedures: Vec<SopProcedure>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
pub struct SopMetadata {
    pub version: String,
    #[serde(default)]
    pub compliance_standards: Vec<String>,
    pub risk_level: Option<String>,
    pub estimated_duration: Option<String>,
}

/// Typed parameter the AI is expected to collect from the user, with
/// extraction examples.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
pub struct RequiredParameter {
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub param_type: String,
    #[serde(default)]
    pub required: bool,
    pub min_length: Option<i64>,
    pub max_length: Option<i64>,
    #[serde(default)]
    pub examples: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
pub struct ChecklistStep {
    pub step: i64,
    pub title: String,
    #[serde(default)]
    pub sub_steps: Vec<String>,
}

/// Reusable task template, tenant-independent. The canonical task content:
/// SOP, parameters, AI config. `master_task_id` is the only stable
/// cross-tenant identifier; downstream snapshots retain it purely for audit.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct MasterTask {
    pub id: Uuid,
    pub master_task_id: String,
    pub name: String,
    pub description: Option<String>,
    pub category: TaskCategory,
    pub execution_model: ExecutionModel,
    pub system_prompt: Option<String>,
    pub intro: Option<String>,
    pub ai_agent_attached: bool,
    pub ai_agent_role: Option<String>,
    #[sqlx(json(nullable))]
    pub standard_operating_procedure: Option<StandardOperatingProcedure>,
    #[sqlx(json(nullable))]
    pub sop_metadata: Option<SopMetadata>,
    #[sqlx(json(nullable))]
    pub required_parameters: Option<Vec<RequiredParameter>>,
    #[sqlx(json(nullable))]
    pub checklist: Option<Vec<ChecklistStep>>,
    #[sqlx(json(nullable))]
    pub context_documents: Option<JsonValue>,
    #[sqlx(json(nullable))]
    pub form_schema: Option<JsonValue>,
    #[sqlx(json(nullable))]
    pub validation_rules: Option<JsonValue>,
    #[sqlx(json(nullable))]
    pub workflow_definition: Option<JsonValue>,
    #[sqlx(json(nullable))]
    pub curriculum: Option<JsonValue>,
    pub active: bool,
    pub execution_count: i64,
    pub average_completion_minutes: Option<f64>,
    pub success_rate: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateMasterTask {
    pub master_task_id: String,
    pub name: String,
    pub description: Option<String>,
    pub category: TaskCategory,
    pub execution_model: ExecutionModel,
    pub system_prompt: Option<String>,
    pub intro: Option<String>,
    #[serde(default)]
    pub ai_agent_attached: bool,
    pub ai_agent_role: Option<String>,
    pub standard_operating_procedure: Option<StandardOperatingProcedure>,
    pub sop_metadata: Option<SopMetadata>,
    pub required_parameters: Option<Vec<RequiredParameter>>,
    pub checklist: Option<Vec<ChecklistStep>>,
    pub context_documents: Option<JsonValue>,
    pub form_schema: Option<JsonValue>,
    pub validation_rules: Option<JsonValue>,
    pub workflow_definition: Option<JsonValue>,
    pub curriculum: Option<JsonValue>,
}

impl MasterTask {
    /// Version recorded on adoption. Comes from the SOP metadata when the
    /// template carries one.
    pub fn version(&self) -> String {
        self.sop_metadata
            .as_ref()
            .map(|m| m.version.clone())
            .unwrap_or_else(|| "1.0.0".to_string())
    }

    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, MasterTask>(
            "SELECT * FROM master_tasks ORDER BY created_at DESC",
        )
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, MasterTask>("SELECT * FROM master_tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_external_id(
        pool: &SqlitePool,
        master_task_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, MasterTask>("SELECT * FROM master_tasks WHERE master_task_id = $1")
            .bind(master_task_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(
        pool: &SqlitePool,
        data: &CreateMasterTask,
        id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let now = Utc::now();
        sqlx::query_as::<_, MasterTask>(
            r#"INSERT INTO master_tasks (
                   id, master_task_id, name, description, category, execution_model,
                   system_prompt, intro, ai_agent_attached, ai_agent_role,
                   standard_operating_procedure, sop_metadata, required_parameters,
                   checklist, context_documents, form_schema, validation_rules,
                   workflow_definition, curriculum, active, created_at, updated_at
               )
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                       $15, $16, $17, $18, $19, 1, $20, $20)
               RETURNING *"#,
        )
        .bind(id)
        .bind(&data.master_task_id)
        .bind(&data.name)
        .bind(&data.description)
        .bind(&data.category)
        .bind(&data.execution_model)
        .bind(&data.system_prompt)
        .bind(&data.intro)
        .bind(data.ai_agent_attached)
        .bind(&data.ai_agent_role)
        .bind(data.standard_operating_procedure.as_ref().map(Json))
        .bind(data.sop_metadata.as_ref().map(Json))
        .bind(data.required_parameters.as_ref().map(Json))
        .bind(data.checklist.as_ref().map(Json))
        .bind(data.context_documents.as_ref().map(Json))
        .bind(data.form_schema.as_ref().map(Json))
        .bind(data.validation_rules.as_ref().map(Json))
        .bind(data.workflow_definition.as_ref().map(Json))
        .bind(data.curriculum.as_ref().map(Json))
        .bind(now)
        .fetch_one(pool)
        .await
    }

    /// Soft-deactivate. Templates are never deleted while tenants reference
    /// them.
    pub async fn deactivate(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE master_tasks SET active = 0, updated_at = $2 WHERE id = $1")
            .bind(id)
            .bind(Utc::now())
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
