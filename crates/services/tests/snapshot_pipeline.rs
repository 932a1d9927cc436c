use db::{
    DBService,
    models::{
        domain_adoption::DomainAdoption,
        domain_task::{CtaAction, DomainCustomizations, DomainTask, DomainTaskCategory, TaskPriority},
        master_task::{
            ChecklistStep, CreateMasterTask, ExecutionModel, MasterTask, SopMetadata, SopProcedure,
            SopScope, StandardOperatingProcedure, TaskCategory,
        },
        task_execution::{ExecutionMessage, MessageRole, TaskExecution},
        user_task::UserTask,
    },
};
use services::services::{
    AdoptionError, AdoptionService, AssignmentError, AssignmentService, ExecutionContextError,
    ExecutionContextService, ProgressError, ProgressService,
};
use uuid::Uuid;

async fn setup() -> DBService {
    DBService::new_in_memory()
        .await
        .expect("in-memory database")
}

fn sample_sop() -> StandardOperatingProcedure {
    StandardOperatingProcedure {
        objective: "Verify the identity of a new user".to_string(),
        scope: SopScope {
            included: vec!["new users".to_string()],
            excluded: vec!["service accounts".to_string()],
            applicable_to: vec!["all tenants".to_string()],
        },
        policies: vec!["Verify documents before approving".to_string()],
        compliance_standards: vec!["ISO 9001".to_string()],
        regulations: vec!["KYC".to_string()],
        roles: vec![],
        procedures: vec![
            SopProcedure {
                step_number: 1,
                name: "Collect document".to_string(),
                description: Some("Ask for a government-issued ID".to_string()),
                responsible: None,
                decision_points: vec![],
            },
            SopProcedure {
                step_number: 2,
                name: "Check expiry".to_string(),
                description: None,
                responsible: None,
                decision_points: vec![],
            },
            SopProcedure {
                step_number: 3,
                name: "Record result".to_string(),
                description: None,
                responsible: Some("Compliance officer".to_string()),
                decision_points: vec![],
            },
        ],
    }
}

fn sample_template(external_id: &str, category: TaskCategory) -> CreateMasterTask {
    CreateMasterTask {
        master_task_id: external_id.to_string(),
        name: format!("Template {}", external_id),
        description: Some("A sample task template".to_string()),
        category,
        execution_model: ExecutionModel::Sop,
        system_prompt: Some("You are a meticulous verification assistant.".to_string()),
        intro: Some("Hi! Let's get your verification done.".to_string()),
        ai_agent_attached: true,
        ai_agent_role: Some("verifier".to_string()),
        standard_operating_procedure: Some(sample_sop()),
        sop_metadata: Some(SopMetadata {
            version: "2.1.0".to_string(),
            compliance_standards: vec!["ISO 9001".to_string()],
            risk_level: Some("medium".to_string()),
            estimated_duration: Some("10 minutes".to_string()),
        }),
        required_parameters: None,
        checklist: Some(vec![ChecklistStep {
            step: 1,
            title: "Prepare documents".to_string(),
            sub_steps: vec![],
        }]),
        context_documents: None,
        form_schema: None,
        validation_rules: None,
        workflow_definition: None,
        curriculum: None,
    }
}

async fn create_template(db: &DBService, external_id: &str, category: TaskCategory) -> MasterTask {
    MasterTask::create(&db.pool, &sample_template(external_id, category), Uuid::new_v4())
        .await
        .expect("create master task")
}

async fn adopt(db: &DBService, domain_id: Uuid, external_id: &str) -> DomainTask {
    AdoptionService::adopt(&db.pool, domain_id, external_id, None, None)
        .await
        .expect("adopt template")
}

async fn assign(db: &DBService, user_id: Uuid, domain_task_id: Uuid) -> UserTask {
    AssignmentService::assign(&db.pool, user_id, domain_task_id, None, None)
        .await
        .expect("assign task")
}

#[tokio::test]
async fn adopting_identity_template_forces_identity_defaults() {
    let db = setup().await;
    create_template(&db, "identity-verification", TaskCategory::Identity).await;

    let domain_task = adopt(&db, Uuid::new_v4(), "identity-verification").await;

    assert!(!domain_task.requires_identity_verification);
    assert_eq!(domain_task.priority, TaskPriority::Urgent);
    assert_eq!(domain_task.category, DomainTaskCategory::Required);
    assert_eq!(domain_task.cta.action, CtaAction::Process);
    assert_eq!(domain_task.master_task_version, "2.1.0");
}

#[tokio::test]
async fn adopting_twice_fails_with_already_adopted() {
    let db = setup().await;
    create_template(&db, "onboarding-intro", TaskCategory::Onboarding).await;
    let domain_id = Uuid::new_v4();

    adopt(&db, domain_id, "onboarding-intro").await;
    let second = AdoptionService::adopt(&db.pool, domain_id, "onboarding-intro", None, None).await;

    assert!(matches!(second, Err(AdoptionError::AlreadyAdopted)));
    let tasks = DomainTask::find_by_domain_id(&db.pool, domain_id)
        .await
        .unwrap();
    assert_eq!(tasks.len(), 1);
}

#[tokio::test]
async fn adopting_records_a_ledger_row() {
    let db = setup().await;
    create_template(&db, "compliance-check", TaskCategory::Compliance).await;
    let domain_id = Uuid::new_v4();

    adopt(&db, domain_id, "compliance-check").await;

    let adoptions = DomainAdoption::find_by_master_task_id(&db.pool, "compliance-check")
        .await
        .unwrap();
    assert_eq!(adoptions.len(), 1);
    assert_eq!(adoptions[0].domain_id, domain_id);
    assert_eq!(adoptions[0].allowed_roles, vec!["user", "admin"]);
    assert!(adoptions[0].active);
}

#[tokio::test]
async fn adopting_unknown_or_inactive_template_fails() {
    let db = setup().await;
    let missing =
        AdoptionService::adopt(&db.pool, Uuid::new_v4(), "does-not-exist", None, None).await;
    assert!(matches!(missing, Err(AdoptionError::TemplateNotFound)));

    let template = create_template(&db, "retired-task", TaskCategory::Operational).await;
    MasterTask::deactivate(&db.pool, template.id).await.unwrap();
    let inactive =
        AdoptionService::adopt(&db.pool, Uuid::new_v4(), "retired-task", None, None).await;
    assert!(matches!(inactive, Err(AdoptionError::TemplateInactive)));
}

#[tokio::test]
async fn assignment_freezes_the_domain_task_into_the_user_task() {
    let db = setup().await;
    create_template(&db, "sop-task", TaskCategory::Operational).await;
    let domain_task = adopt(&db, Uuid::new_v4(), "sop-task").await;

    let user_task = assign(&db, Uuid::new_v4(), domain_task.id).await;

    assert_eq!(user_task.progress.current_step, 0);
    assert_eq!(user_task.progress.total_steps, 1);
    assert_eq!(user_task.progress.percent_complete, 0.0);
    assert_eq!(user_task.view_count, 0);
    assert!(!user_task.is_completed);
    assert!(!user_task.is_hidden);
    assert_eq!(user_task.master_task_id, "sop-task");

    let execution_data = user_task.task_snapshot.execution_data.as_ref().unwrap();
    assert_eq!(
        execution_data
            .standard_operating_procedure
            .as_ref()
            .unwrap()
            .procedures
            .len(),
        3
    );
}

#[tokio::test]
async fn assigning_a_visible_task_twice_fails() {
    let db = setup().await;
    create_template(&db, "double-assign", TaskCategory::Operational).await;
    let domain_task = adopt(&db, Uuid::new_v4(), "double-assign").await;
    let user_id = Uuid::new_v4();

    assign(&db, user_id, domain_task.id).await;
    let second = AssignmentService::assign(&db.pool, user_id, domain_task.id, None, None).await;

    assert!(matches!(second, Err(AssignmentError::AlreadyAssigned)));
}

#[tokio::test]
async fn assigning_a_hidden_task_unhides_the_existing_row() {
    let db = setup().await;
    create_template(&db, "hidden-recovery", TaskCategory::Operational).await;
    let domain_task = adopt(&db, Uuid::new_v4(), "hidden-recovery").await;
    let user_id = Uuid::new_v4();

    let original = assign(&db, user_id, domain_task.id).await;
    let hidden = ProgressService::toggle_hidden(&db.pool, original.id)
        .await
        .unwrap();
    assert!(hidden.is_hidden);
    assert!(hidden.hidden_at.is_some());

    let recovered = assign(&db, user_id, domain_task.id).await;
    assert_eq!(recovered.id, original.id);
    assert!(!recovered.is_hidden);
    assert!(recovered.hidden_at.is_none());
}

#[tokio::test]
async fn prerequisites_gate_assignment_until_completed() {
    let db = setup().await;
    create_template(&db, "step-one", TaskCategory::Onboarding).await;
    create_template(&db, "step-two", TaskCategory::Onboarding).await;
    let domain_id = Uuid::new_v4();
    let first = adopt(&db, domain_id, "step-one").await;
    let second = adopt(&db, domain_id, "step-two").await;
    DomainTask::set_prerequisites(&db.pool, second.id, &[first.id])
        .await
        .unwrap()
        .unwrap();

    let user_id = Uuid::new_v4();
    let gated = AssignmentService::assign(&db.pool, user_id, second.id, None, None).await;
    assert!(matches!(
        gated,
        Err(AssignmentError::PrerequisitesNotMet {
            required: 1,
            completed: 0
        })
    ));

    let first_assignment = assign(&db, user_id, first.id).await;
    ProgressService::complete(&db.pool, first_assignment.id, None)
        .await
        .unwrap();

    let unlocked = AssignmentService::assign(&db.pool, user_id, second.id, None, None).await;
    assert!(unlocked.is_ok());
}

#[tokio::test]
async fn customization_updates_do_not_leak_into_existing_user_tasks() {
    let db = setup().await;
    create_template(&db, "immutable-snapshot", TaskCategory::Operational).await;
    let domain_task = adopt(&db, Uuid::new_v4(), "immutable-snapshot").await;
    let user_task = assign(&db, Uuid::new_v4(), domain_task.id).await;
    let original_title = user_task.task_snapshot.title.clone();

    DomainTask::update_customizations(
        &db.pool,
        domain_task.id,
        Some(&DomainCustomizations {
            title: Some("Renamed after assignment".to_string()),
            ..Default::default()
        }),
    )
    .await
    .unwrap()
    .unwrap();

    let refetched = UserTask::find_by_id(&db.pool, user_task.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refetched.task_snapshot.title, original_title);
    assert!(refetched.task_snapshot.domain_customizations.is_none());

    // New assignments see the overlay.
    let fresh = assign(&db, Uuid::new_v4(), domain_task.id).await;
    assert_eq!(fresh.task_snapshot.title, "Renamed after assignment");
}

#[tokio::test]
async fn execution_prompt_ignores_live_template_changes() {
    let db = setup().await;
    let template = create_template(&db, "frozen-context", TaskCategory::Operational).await;
    let domain_task = adopt(&db, Uuid::new_v4(), "frozen-context").await;
    let user_task = assign(&db, Uuid::new_v4(), domain_task.id).await;

    let execution = ExecutionContextService::create_execution(&db.pool, &user_task)
        .await
        .unwrap();

    MasterTask::deactivate(&db.pool, template.id).await.unwrap();
    DomainTask::update_customizations(
        &db.pool,
        domain_task.id,
        Some(&DomainCustomizations {
            system_prompt_additions: Some("IGNORE EVERYTHING".to_string()),
            ..Default::default()
        }),
    )
    .await
    .unwrap();

    let user_task = UserTask::find_by_id(&db.pool, user_task.id)
        .await
        .unwrap()
        .unwrap();
    let reused = ExecutionContextService::create_execution(&db.pool, &user_task)
        .await
        .unwrap();

    assert_eq!(reused.id, execution.id);
    assert_eq!(reused.system_prompt, execution.system_prompt);
    assert!(!reused.system_prompt.contains("IGNORE EVERYTHING"));
}

#[tokio::test]
async fn system_prompt_lists_sop_steps_in_order() {
    let db = setup().await;
    create_template(&db, "ordered-sop", TaskCategory::Operational).await;
    let domain_task = adopt(&db, Uuid::new_v4(), "ordered-sop").await;
    let user_task = assign(&db, Uuid::new_v4(), domain_task.id).await;

    let prompt = ExecutionContextService::build_system_prompt(&user_task.task_snapshot).unwrap();

    let first = prompt.find("1. Collect document").unwrap();
    let second = prompt.find("2. Check expiry").unwrap();
    let third = prompt.find("3. Record result").unwrap();
    assert!(first < second && second < third);
    assert!(prompt.contains("Risk level: medium"));
}

#[tokio::test]
async fn non_ai_tasks_cannot_get_an_execution() {
    let db = setup().await;
    let mut data = sample_template("manual-task", TaskCategory::Operational);
    data.ai_agent_attached = false;
    MasterTask::create(&db.pool, &data, Uuid::new_v4())
        .await
        .unwrap();
    let domain_task = adopt(&db, Uuid::new_v4(), "manual-task").await;
    let user_task = assign(&db, Uuid::new_v4(), domain_task.id).await;

    let result = ExecutionContextService::create_execution(&db.pool, &user_task).await;
    assert!(matches!(result, Err(ExecutionContextError::NotAiAssisted)));

    let existing = TaskExecution::find_latest_by_user_task(&db.pool, user_task.id)
        .await
        .unwrap();
    assert!(existing.is_none());
}

#[tokio::test]
async fn new_execution_gets_the_intro_as_first_assistant_message() {
    let db = setup().await;
    create_template(&db, "intro-task", TaskCategory::Onboarding).await;
    let domain_task = adopt(&db, Uuid::new_v4(), "intro-task").await;
    let user_task = assign(&db, Uuid::new_v4(), domain_task.id).await;

    let execution = ExecutionContextService::create_execution(&db.pool, &user_task)
        .await
        .unwrap();
    let messages = ExecutionMessage::find_by_execution_id(&db.pool, execution.id)
        .await
        .unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, MessageRole::Assistant);
    assert_eq!(messages[0].content, "Hi! Let's get your verification done.");

    // Reuse path must not inject the intro again.
    let reused = ExecutionContextService::create_execution(&db.pool, &user_task)
        .await
        .unwrap();
    assert_eq!(reused.id, execution.id);
    let messages = ExecutionMessage::find_by_execution_id(&db.pool, execution.id)
        .await
        .unwrap();
    assert_eq!(messages.len(), 1);
}

#[tokio::test]
async fn completion_is_terminal() {
    let db = setup().await;
    create_template(&db, "complete-once", TaskCategory::Operational).await;
    let domain_task = adopt(&db, Uuid::new_v4(), "complete-once").await;
    let user_task = assign(&db, Uuid::new_v4(), domain_task.id).await;

    let completed = ProgressService::complete(
        &db.pool,
        user_task.id,
        Some(serde_json::json!({"outcome": "approved"})),
    )
    .await
    .unwrap();
    assert!(completed.is_completed);
    assert_eq!(completed.progress.percent_complete, 100.0);
    let completed_at = completed.completed_at.unwrap();

    let second = ProgressService::complete(&db.pool, user_task.id, None).await;
    assert!(matches!(second, Err(ProgressError::AlreadyCompleted)));

    let refetched = UserTask::find_by_id(&db.pool, user_task.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refetched.completed_at.unwrap(), completed_at);
    assert_eq!(
        refetched.completion_data,
        Some(serde_json::json!({"outcome": "approved"}))
    );
}

#[tokio::test]
async fn completed_row_rejects_a_second_completion_write() {
    let db = setup().await;
    create_template(&db, "complete-guard", TaskCategory::Operational).await;
    let domain_task = adopt(&db, Uuid::new_v4(), "complete-guard").await;
    let user_task = assign(&db, Uuid::new_v4(), domain_task.id).await;

    let completed = ProgressService::complete(
        &db.pool,
        user_task.id,
        Some(serde_json::json!({"outcome": "approved"})),
    )
    .await
    .unwrap();

    // A writer that read the row before the first completion landed still
    // cannot overwrite it: the UPDATE is guarded, not just the service check.
    let stale_write = UserTask::mark_completed(
        &db.pool,
        user_task.id,
        Some(&serde_json::json!({"outcome": "rejected"})),
        &completed.progress,
    )
    .await
    .unwrap();
    assert!(stale_write.is_none());

    let refetched = UserTask::find_by_id(&db.pool, user_task.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refetched.completed_at, completed.completed_at);
    assert_eq!(
        refetched.completion_data,
        Some(serde_json::json!({"outcome": "approved"}))
    );
}

#[tokio::test]
async fn marking_viewed_twice_counts_both_views() {
    let db = setup().await;
    create_template(&db, "view-counter", TaskCategory::Operational).await;
    let domain_task = adopt(&db, Uuid::new_v4(), "view-counter").await;
    let user_task = assign(&db, Uuid::new_v4(), domain_task.id).await;

    ProgressService::mark_viewed(&db.pool, user_task.id)
        .await
        .unwrap();
    let after_first = UserTask::find_by_id(&db.pool, user_task.id)
        .await
        .unwrap()
        .unwrap();
    ProgressService::mark_viewed(&db.pool, user_task.id)
        .await
        .unwrap();

    let after_second = UserTask::find_by_id(&db.pool, user_task.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after_second.view_count, 2);
    assert!(after_second.last_viewed_at.unwrap() >= after_first.last_viewed_at.unwrap());

    // Missing targets are ignored.
    assert!(
        ProgressService::mark_viewed(&db.pool, Uuid::new_v4())
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn completing_never_touches_the_domain_task_or_template() {
    let db = setup().await;
    let template = create_template(&db, "no-rollup", TaskCategory::Operational).await;
    let domain_task = adopt(&db, Uuid::new_v4(), "no-rollup").await;
    let user_task = assign(&db, Uuid::new_v4(), domain_task.id).await;

    ProgressService::complete(&db.pool, user_task.id, None)
        .await
        .unwrap();

    let template_after = MasterTask::find_by_id(&db.pool, template.id)
        .await
        .unwrap()
        .unwrap();
    let domain_task_after = DomainTask::find_by_id(&db.pool, domain_task.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(template_after.execution_count, 0);
    assert_eq!(template_after.updated_at, template.updated_at);
    assert_eq!(domain_task_after.updated_at, domain_task.updated_at);
}
