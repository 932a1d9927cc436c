use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::{
    task_execution::TaskExecution,
    user_task::{TaskProgress, UserTask},
};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use services::services::{AssignmentService, ExecutionContextService, ProgressService};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{Deployment, error::ApiError, middleware::load_user_task_middleware};

#[derive(Debug, Serialize, Deserialize)]
pub struct UserTaskQuery {
    pub user_id: Uuid,
}

pub async fn get_user_tasks(
    State(deployment): State<Deployment>,
    Query(query): Query<UserTaskQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<UserTask>>>, ApiError> {
    let tasks = UserTask::find_by_user_id(&deployment.db().pool, query.user_id).await?;
    Ok(ResponseJson(ApiResponse::success(tasks)))
}

#[derive(Debug, Serialize, Deserialize, TS)]
pub struct AssignTaskRequest {
    pub user_id: Uuid,
    pub domain_task_id: Uuid,
    pub assigned_by: Option<Uuid>,
    pub reason: Option<String>,
}

pub async fn assign_task(
    State(deployment): State<Deployment>,
    Json(payload): Json<AssignTaskRequest>,
) -> Result<ResponseJson<ApiResponse<UserTask>>, ApiError> {
    let user_task = AssignmentService::assign(
        &deployment.db().pool,
        payload.user_id,
        payload.domain_task_id,
        payload.assigned_by,
        payload.reason,
    )
    .await?;

    Ok(ResponseJson(ApiResponse::success(user_task)))
}

pub async fn get_user_task(
    Extension(user_task): Extension<UserTask>,
) -> Result<ResponseJson<ApiResponse<UserTask>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(user_task)))
}

pub async fn mark_viewed(
    Extension(user_task): Extension<UserTask>,
    State(deployment): State<Deployment>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    ProgressService::mark_viewed(&deployment.db().pool, user_task.id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn toggle_hidden(
    Extension(user_task): Extension<UserTask>,
    State(deployment): State<Deployment>,
) -> Result<ResponseJson<ApiResponse<UserTask>>, ApiError> {
    let updated = ProgressService::toggle_hidden(&deployment.db().pool, user_task.id).await?;
    Ok(ResponseJson(ApiResponse::success(updated)))
}

#[derive(Debug, Serialize, Deserialize, TS)]
pub struct CompleteTaskRequest {
    pub completion_data: Option<JsonValue>,
}

pub async fn complete_task(
    Extension(user_task): Extension<UserTask>,
    State(deployment): State<Deployment>,
    Json(payload): Json<CompleteTaskRequest>,
) -> Result<ResponseJson<ApiResponse<UserTask>>, ApiError> {
    let completed = ProgressService::complete(
        &deployment.db().pool,
        user_task.id,
        payload.completion_data,
    )
    .await?;

    Ok(ResponseJson(ApiResponse::success(completed)))
}

pub async fn update_progress(
    Extension(user_task): Extension<UserTask>,
    State(deployment): State<Deployment>,
    Json(payload): Json<TaskProgress>,
) -> Result<ResponseJson<ApiResponse<UserTask>>, ApiError> {
    let updated =
        ProgressService::update_progress(&deployment.db().pool, user_task.id, payload).await?;
    Ok(ResponseJson(ApiResponse::success(updated)))
}

/// Create the execution for this user task, or return the existing one. The
/// system prompt is assembled strictly from the assignment-time snapshot.
pub async fn create_execution(
    Extension(user_task): Extension<UserTask>,
    State(deployment): State<Deployment>,
) -> Result<ResponseJson<ApiResponse<TaskExecution>>, ApiError> {
    let execution =
        ExecutionContextService::create_execution(&deployment.db().pool, &user_task).await?;
    Ok(ResponseJson(ApiResponse::success(execution)))
}

pub fn router(deployment: &Deployment) -> Router<Deployment> {
    let user_task_id_router = Router::new()
        .route("/", get(get_user_task))
        .route("/viewed", post(mark_viewed))
        .route("/hidden", post(toggle_hidden))
        .route("/complete", post(complete_task))
        .route("/progress", post(update_progress))
        .route("/executions", post(create_execution))
        .layer(from_fn_with_state(
            deployment.clone(),
            load_user_task_middleware,
        ));

    let inner = Router::new()
        .route("/", get(get_user_tasks).post(assign_task))
        .nest("/{user_task_id}", user_task_id_router);

    Router::new().nest("/user-tasks", inner)
}
