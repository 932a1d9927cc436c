use db::models::{
    snapshot::{ExecutionData, TaskSnapshot},
    task_execution::{CreateTaskExecution, ExecutionMessage, MessageRole, TaskExecution},
    user_task::UserTask,
};
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ExecutionContextError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("Task is not configured for execution")]
    NotConfiguredForExecution,
    #[error("Task is not AI-assisted")]
    NotAiAssisted,
}

pub struct ExecutionContextService;

impl ExecutionContextService {
    /// Assemble the system prompt strictly from the assignment-time snapshot.
    ///
    /// Section order is fixed; each section is appended only when the
    /// corresponding data exists. Live template or domain-task rows are never
    /// consulted.
    pub fn build_system_prompt(snapshot: &TaskSnapshot) -> Result<String, ExecutionContextError> {
        let execution_data = snapshot
            .execution_data
            .as_ref()
            .ok_or(ExecutionContextError::NotConfiguredForExecution)?;
        if !execution_data.ai_agent_attached {
            return Err(ExecutionContextError::NotAiAssisted);
        }

        let mut prompt = String::new();

        match execution_data.system_prompt.as_deref().map(str::trim) {
            Some(base) if !base.is_empty() => prompt.push_str(base),
            _ => {
                prompt.push_str(&format!(
                    "You are an AI assistant guiding a user through the task \"{}\". \
                     Follow the procedure below exactly and collect every required \
                     parameter before completing the task.",
                    snapshot.title
                ));
            }
        }

        if let Some(sop) = &execution_data.standard_operating_procedure {
            prompt.push_str("\n\n## Standard Operating Procedure\n");
            prompt.push_str(&format!("\n### Objective\n{}\n", sop.objective));

            if !sop.scope.included.is_empty()
                || !sop.scope.excluded.is_empty()
                || !sop.scope.applicable_to.is_empty()
            {
                prompt.push_str("\n### Scope\n");
                if !sop.scope.included.is_empty() {
                    prompt.push_str(&format!("Included: {}\n", sop.scope.included.join(", ")));
                }
                if !sop.scope.excluded.is_empty() {
                    prompt.push_str(&format!("Excluded: {}\n", sop.scope.excluded.join(", ")));
                }
                if !sop.scope.applicable_to.is_empty() {
                    prompt.push_str(&format!(
                        "Applicable to: {}\n",
                        sop.scope.applicable_to.join(", ")
                    ));
                }
            }

            if !sop.policies.is_empty() {
                prompt.push_str("\n### Policies\n");
                for policy in &sop.policies {
                    prompt.push_str(&format!("- {}\n", policy));
                }
            }
            if !sop.compliance_standards.is_empty() {
                prompt.push_str(&format!(
                    "\nCompliance standards: {}\n",
                    sop.compliance_standards.join(", ")
                ));
            }
            if !sop.regulations.is_empty() {
                prompt.push_str(&format!("Regulations: {}\n", sop.regulations.join(", ")));
            }

            if !sop.roles.is_empty() {
                prompt.push_str("\n### Roles & Responsibilities\n");
                for role in &sop.roles {
                    prompt.push_str(&format!(
                        "- {}: {}\n",
                        role.name,
                        role.responsibilities.join("; ")
                    ));
                }
            }

            if !sop.procedures.is_empty() {
                prompt.push_str("\n### Procedure\n");
                let mut procedures: Vec<_> = sop.procedures.iter().collect();
                procedures.sort_by_key(|p| p.step_number);
                for procedure in procedures {
                    prompt.push_str(&format!("{}. {}", procedure.step_number, procedure.name));
                    if let Some(description) = &procedure.description {
                        prompt.push_str(&format!(" - {}", description));
                    }
                    if let Some(responsible) = &procedure.responsible {
                        prompt.push_str(&format!(" (responsible: {})", responsible));
                    }
                    prompt.push('\n');
                    for decision in &procedure.decision_points {
                        prompt.push_str(&format!("   Decision: {}", decision.condition));
                        if !decision.outcomes.is_empty() {
                            prompt.push_str(&format!(" -> {}", decision.outcomes.join(" / ")));
                        }
                        prompt.push('\n');
                    }
                }
            }

            if let Some(metadata) = &execution_data.sop_metadata {
                prompt.push_str("\n### SOP Metadata\n");
                if !metadata.compliance_standards.is_empty() {
                    prompt.push_str(&format!(
                        "Compliance standards: {}\n",
                        metadata.compliance_standards.join(", ")
                    ));
                }
                if let Some(risk_level) = &metadata.risk_level {
                    prompt.push_str(&format!("Risk level: {}\n", risk_level));
                }
                if let Some(duration) = &metadata.estimated_duration {
                    prompt.push_str(&format!("Estimated duration: {}\n", duration));
                }
            }
        } else if !execution_data.checklist.is_empty() {
            prompt.push_str("\n\n## Checklist\n");
            let mut steps: Vec<_> = execution_data.checklist.iter().collect();
            steps.sort_by_key(|s| s.step);
            for step in steps {
                prompt.push_str(&format!("{}. {}\n", step.step, step.title));
                for sub_step in &step.sub_steps {
                    prompt.push_str(&format!("   - {}\n", sub_step));
                }
            }
        }

        if !execution_data.required_parameters.is_empty() {
            prompt.push_str("\n\n## Required Parameters\n");
            for parameter in &execution_data.required_parameters {
                prompt.push_str(&format!("- {}", parameter.display_name));
                if let Some(description) = &parameter.description {
                    prompt.push_str(&format!(": {}", description));
                }
                let mut constraints = Vec::new();
                if parameter.required {
                    constraints.push("required".to_string());
                }
                if let Some(min) = parameter.min_length {
                    constraints.push(format!("min length {}", min));
                }
                if let Some(max) = parameter.max_length {
                    constraints.push(format!("max length {}", max));
                }
                if !constraints.is_empty() {
                    prompt.push_str(&format!(" ({})", constraints.join(", ")));
                }
                prompt.push('\n');
            }
        }

        if let Some(intro) = execution_data.intro.as_deref().map(str::trim) {
            if !intro.is_empty() {
                prompt.push_str(&format!("\n\n## Introduction Message\n{}\n", intro));
            }
        }

        prompt.push_str("\n\n## Current Task\n");
        prompt.push_str(&format!("Title: {}\n", snapshot.title));
        if let Some(description) = &snapshot.description {
            prompt.push_str(&format!("Description: {}\n", description));
        }
        prompt.push_str(&format!("Type: {}\n", execution_data.execution_model));
        prompt.push_str(&format!("Priority: {}\n", snapshot.priority));

        if let Some(customizations) = &snapshot.domain_customizations {
            if let Some(additions) = customizations.system_prompt_additions.as_deref() {
                if !additions.trim().is_empty() {
                    prompt.push_str(&format!("\n\n## Domain Instructions\n{}\n", additions.trim()));
                }
            }
            if let Some(context) = customizations.additional_context.as_deref() {
                if !context.trim().is_empty() {
                    prompt.push_str(&format!("\n\n## Additional Context\n{}\n", context.trim()));
                }
            }
        }

        Ok(prompt)
    }

    /// Create the conversational run for a user task, or return the existing
    /// one. Prompt construction happens only on the create path; an existing
    /// execution is returned as-is.
    pub async fn create_execution(
        pool: &SqlitePool,
        user_task: &UserTask,
    ) -> Result<TaskExecution, ExecutionContextError> {
        if let Some(existing) = TaskExecution::find_latest_by_user_task(pool, user_task.id).await? {
            tracing::debug!(
                "Reusing execution {} for user task {}",
                existing.id,
                user_task.id
            );
            return Ok(existing);
        }

        let system_prompt = Self::build_system_prompt(&user_task.task_snapshot)?;
        let intro = user_task
            .task_snapshot
            .execution_data
            .as_ref()
            .and_then(|data: &ExecutionData| data.intro.clone())
            .filter(|intro| !intro.trim().is_empty());

        // Execution row and intro message commit together so a crash cannot
        // leave a run without its opening message.
        let mut tx = pool.begin().await?;

        let execution = TaskExecution::create(
            &mut *tx,
            &CreateTaskExecution {
                user_id: user_task.user_id,
                domain_task_id: user_task.domain_task_id,
                user_task_id: user_task.id,
                task_snapshot: user_task.task_snapshot.clone(),
                system_prompt,
            },
            Uuid::new_v4(),
        )
        .await?;

        if let Some(intro) = intro {
            ExecutionMessage::create(
                &mut *tx,
                execution.id,
                MessageRole::Assistant,
                &intro,
                Uuid::new_v4(),
            )
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            "Created execution {} for user task {}",
            execution.id,
            user_task.id
        );

        Ok(execution)
    }
}

#[cfg(test)]
mod tests {
    use db::models::{
        domain_task::{CallToAction, CtaAction, DomainCustomizations, DomainTaskCategory, TaskPriority},
        master_task::{ChecklistStep, ExecutionModel, RequiredParameter},
        snapshot::{ExecutionData, TaskSnapshot},
    };

    use super::*;

    fn snapshot_with(execution_data: Option<ExecutionData>) -> TaskSnapshot {
        TaskSnapshot {
            title: "Verify supplier invoices".to_string(),
            description: Some("Check each invoice against the purchase order".to_string()),
            icon: None,
            color: None,
            cta: CallToAction {
                label: "Start process".to_string(),
                action: CtaAction::Process,
                target: None,
                params: None,
            },
            priority: TaskPriority::Normal,
            category: DomainTaskCategory::Recommended,
            requires_identity_verification: false,
            can_hide: true,
            is_qms_compliant: true,
            master_task_id: "invoice-verification".to_string(),
            master_task_version: "1.0.0".to_string(),
            domain_customizations: None,
            execution_data,
        }
    }

    fn execution_data() -> ExecutionData {
        ExecutionData {
            execution_model: ExecutionModel::Sop,
            ai_agent_attached: true,
            ai_agent_role: None,
            system_prompt: Some("You are the invoice verification assistant.".to_string()),
            intro: None,
            standard_operating_procedure: None,
            sop_metadata: None,
            required_parameters: Vec::new(),
            checklist: Vec::new(),
            form_schema: None,
            validation_rules: None,
            workflow_definition: None,
            curriculum: None,
        }
    }

    #[test]
    fn missing_execution_data_is_not_configured() {
        let snapshot = snapshot_with(None);
        assert!(matches!(
            ExecutionContextService::build_system_prompt(&snapshot),
            Err(ExecutionContextError::NotConfiguredForExecution)
        ));
    }

    #[test]
    fn ai_agent_detached_is_refused() {
        let mut data = execution_data();
        data.ai_agent_attached = false;
        let snapshot = snapshot_with(Some(data));
        assert!(matches!(
            ExecutionContextService::build_system_prompt(&snapshot),
            Err(ExecutionContextError::NotAiAssisted)
        ));
    }

    #[test]
    fn default_prompt_generated_when_template_has_none() {
        let mut data = execution_data();
        data.system_prompt = None;
        let snapshot = snapshot_with(Some(data));
        let prompt = ExecutionContextService::build_system_prompt(&snapshot).unwrap();
        assert!(prompt.starts_with("You are an AI assistant guiding a user through the task"));
        assert!(prompt.contains("Verify supplier invoices"));
    }

    #[test]
    fn checklist_renders_when_no_sop_present() {
        let mut data = execution_data();
        data.checklist = vec![
            ChecklistStep {
                step: 2,
                title: "Match totals".to_string(),
                sub_steps: vec!["Compare currency".to_string()],
            },
            ChecklistStep {
                step: 1,
                title: "Open invoice".to_string(),
                sub_steps: Vec::new(),
            },
        ];
        let snapshot = snapshot_with(Some(data));
        let prompt = ExecutionContextService::build_system_prompt(&snapshot).unwrap();
        let open = prompt.find("1. Open invoice").unwrap();
        let match_totals = prompt.find("2. Match totals").unwrap();
        assert!(open < match_totals);
        assert!(prompt.contains("   - Compare currency"));
    }

    #[test]
    fn parameter_constraints_are_rendered() {
        let mut data = execution_data();
        data.required_parameters = vec![RequiredParameter {
            name: "invoice_number".to_string(),
            display_name: "Invoice number".to_string(),
            description: Some("The supplier's invoice reference".to_string()),
            param_type: "string".to_string(),
            required: true,
            min_length: Some(4),
            max_length: Some(32),
            examples: vec!["INV-2024-0001".to_string()],
        }];
        let snapshot = snapshot_with(Some(data));
        let prompt = ExecutionContextService::build_system_prompt(&snapshot).unwrap();
        assert!(prompt.contains(
            "- Invoice number: The supplier's invoice reference (required, min length 4, max length 32)"
        ));
    }

    #[test]
    fn domain_context_sections_come_last() {
        let mut snapshot = snapshot_with(Some(execution_data()));
        snapshot.domain_customizations = Some(DomainCustomizations {
            system_prompt_additions: Some("Always answer in German.".to_string()),
            additional_context: Some("This tenant operates in the EU.".to_string()),
            ..Default::default()
        });
        let prompt = ExecutionContextService::build_system_prompt(&snapshot).unwrap();
        let task_block = prompt.find("## Current Task").unwrap();
        let instructions = prompt.find("## Domain Instructions").unwrap();
        let context = prompt.find("## Additional Context").unwrap();
        assert!(task_block < instructions);
        assert!(instructions < context);
    }
}
