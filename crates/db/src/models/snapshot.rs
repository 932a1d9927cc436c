//! Snapshot value types for the copy-on-adopt / copy-on-assign pipeline.
//!
//! These deliberately share no struct with the live `MasterTask` /
//! `DomainTask` models: a snapshot is captured once by a pure function and
//! from then on only ever travels inside the owning row's JSON column. Code
//! holding a snapshot cannot accidentally reach back into live template data.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use ts_rs::TS;

use super::{
    domain_task::{
        CallToAction, DomainCustomizations, DomainTask, DomainTaskCategory, TaskPriority,
    },
    master_task::{
        ChecklistStep, ExecutionModel, MasterTask, RequiredParameter, SopMetadata,
        StandardOperatingProcedure, TaskCategory,
    },
};

/// Deep copy of a MasterTask's execution-relevant fields, taken at adoption
/// time and stored on the DomainTask.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
pub struct MasterTaskSnapshot {
    pub name: String,
    pub description: Option<String>,
    pub category: TaskCategory,
    pub execution_model: ExecutionModel,
    pub system_prompt: Option<String>,
    pub intro: Option<String>,
    pub ai_agent_attached: bool,
    pub ai_agent_role: Option<String>,
    pub standard_operating_procedure: Option<StandardOperatingProcedure>,
    pub sop_metadata: Option<SopMetadata>,
    #[serde(default)]
    pub required_parameters: Vec<RequiredParameter>,
    #[serde(default)]
    pub checklist: Vec<ChecklistStep>,
    pub context_documents: Option<JsonValue>,
    pub form_schema: Option<JsonValue>,
    pub validation_rules: Option<JsonValue>,
    pub workflow_definition: Option<JsonValue>,
    pub curriculum: Option<JsonValue>,
}

impl MasterTaskSnapshot {
    pub fn capture(template: &MasterTask) -> Self {
        Self {
            name: template.name.clone(),
            description: template.description.clone(),
            category: template.category.clone(),
            execution_model: template.execution_model.clone(),
            system_prompt: template.system_prompt.clone(),
            intro: template.intro.clone(),
            ai_agent_attached: template.ai_agent_attached,
            ai_agent_role: template.ai_agent_role.clone(),
            standard_operating_procedure: template.standard_operating_procedure.clone(),
            sop_metadata: template.sop_metadata.clone(),
            required_parameters: template.required_parameters.clone().unwrap_or_default(),
            checklist: template.checklist.clone().unwrap_or_default(),
            context_documents: template.context_documents.clone(),
            form_schema: template.form_schema.clone(),
            validation_rules: template.validation_rules.clone(),
            workflow_definition: template.workflow_definition.clone(),
            curriculum: template.curriculum.clone(),
        }
    }
}

/// Everything the execution context builder is allowed to read when a task
/// runs. Copied from the DomainTask's own master task snapshot at assignment
/// time, never from the live template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
pub struct ExecutionData {
    pub execution_model: ExecutionModel,
    pub ai_agent_attached: bool,
    pub ai_agent_role: Option<String>,
    pub system_prompt: Option<String>,
    pub intro: Option<String>,
    pub standard_operating_procedure: Option<StandardOperatingProcedure>,
    pub sop_metadata: Option<SopMetadata>,
    #[serde(default)]
    pub required_parameters: Vec<RequiredParameter>,
    #[serde(default)]
    pub checklist: Vec<ChecklistStep>,
    pub form_schema: Option<JsonValue>,
    pub validation_rules: Option<JsonValue>,
    pub workflow_definition: Option<JsonValue>,
    pub curriculum: Option<JsonValue>,
}

/// Deep copy of a DomainTask taken at assignment time and stored on the
/// UserTask. Display fields arrive already resolved against the tenant's
/// customization overlay; the overlay itself is kept for prompt additions and
/// extra context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
pub struct TaskSnapshot {
    pub title: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub cta: CallToAction,
    pub priority: TaskPriority,
    pub category: DomainTaskCategory,
    pub requires_identity_verification: bool,
    pub can_hide: bool,
    pub is_qms_compliant: bool,
    pub master_task_id: String,
    pub master_task_version: String,
    pub domain_customizations: Option<DomainCustomizations>,
    pub execution_data: Option<ExecutionData>,
}

impl TaskSnapshot {
    pub fn capture(domain_task: &DomainTask) -> Self {
        let master = &domain_task.master_task_snapshot;
        let customizations = domain_task.domain_customizations.as_ref();

        let title = customizations
            .and_then(|c| c.title.clone())
            .unwrap_or_else(|| master.name.clone());
        let description = customizations
            .and_then(|c| c.description.clone())
            .or_else(|| master.description.clone());

        Self {
            title,
            description,
            icon: domain_task.icon.clone(),
            color: domain_task.color.clone(),
            cta: domain_task.cta.clone(),
            priority: domain_task.priority.clone(),
            category: domain_task.category.clone(),
            requires_identity_verification: domain_task.requires_identity_verification,
            can_hide: domain_task.can_hide,
            is_qms_compliant: domain_task.is_qms_compliant,
            master_task_id: domain_task.master_task_id.clone(),
            master_task_version: domain_task.master_task_version.clone(),
            domain_customizations: domain_task.domain_customizations.clone(),
            execution_data: Some(ExecutionData {
                execution_model: master.execution_model.clone(),
                ai_agent_attached: master.ai_agent_attached,
                ai_agent_role: master.ai_agent_role.clone(),
                system_prompt: master.system_prompt.clone(),
                intro: master.intro.clone(),
                standard_operating_procedure: master.standard_operating_procedure.clone(),
                sop_metadata: master.sop_metadata.clone(),
                required_parameters: master.required_parameters.clone(),
                checklist: master.checklist.clone(),
                form_schema: master.form_schema.clone(),
                validation_rules: master.validation_rules.clone(),
                workflow_definition: master.workflow_definition.clone(),
                curriculum: master.curriculum.clone(),
            }),
        }
    }
}
