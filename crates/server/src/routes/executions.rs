use axum::{
    Extension, Json, Router,
    extract::State,
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::task_execution::{ExecutionMessage, ExecutionStatus, MessageRole, TaskExecution};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{Deployment, error::ApiError, middleware::load_execution_middleware};

pub async fn get_execution(
    Extension(execution): Extension<TaskExecution>,
) -> Result<ResponseJson<ApiResponse<TaskExecution>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(execution)))
}

pub async fn get_messages(
    Extension(execution): Extension<TaskExecution>,
    State(deployment): State<Deployment>,
) -> Result<ResponseJson<ApiResponse<Vec<ExecutionMessage>>>, ApiError> {
    let messages =
        ExecutionMessage::find_by_execution_id(&deployment.db().pool, execution.id).await?;
    Ok(ResponseJson(ApiResponse::success(messages)))
}

#[derive(Debug, Serialize, Deserialize, TS)]
pub struct CreateMessageRequest {
    pub role: MessageRole,
    pub content: String,
}

/// Persist a conversation turn. The chat layer calls this for both the user's
/// input and the model's reply; the system role is reserved for the stored
/// prompt.
pub async fn create_message(
    Extension(execution): Extension<TaskExecution>,
    State(deployment): State<Deployment>,
    Json(payload): Json<CreateMessageRequest>,
) -> Result<ResponseJson<ApiResponse<ExecutionMessage>>, ApiError> {
    if payload.role == MessageRole::System {
        return Err(ApiError::BadRequest(
            "System messages cannot be appended".to_string(),
        ));
    }
    if payload.content.trim().is_empty() {
        return Err(ApiError::BadRequest("Message content is empty".to_string()));
    }

    let message = ExecutionMessage::create(
        &deployment.db().pool,
        execution.id,
        payload.role,
        &payload.content,
        Uuid::new_v4(),
    )
    .await?;

    Ok(ResponseJson(ApiResponse::success(message)))
}

#[derive(Debug, Serialize, Deserialize, TS)]
pub struct UpdateStatusRequest {
    pub status: ExecutionStatus,
}

pub async fn update_status(
    Extension(execution): Extension<TaskExecution>,
    State(deployment): State<Deployment>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<ResponseJson<ApiResponse<TaskExecution>>, ApiError> {
    let updated =
        TaskExecution::update_status(&deployment.db().pool, execution.id, payload.status)
            .await?
            .ok_or_else(|| ApiError::NotFound("Execution not found".to_string()))?;

    Ok(ResponseJson(ApiResponse::success(updated)))
}

pub fn router(deployment: &Deployment) -> Router<Deployment> {
    let execution_id_router = Router::new()
        .route("/", get(get_execution))
        .route("/messages", get(get_messages).post(create_message))
        .route("/status", post(update_status))
        .layer(from_fn_with_state(
            deployment.clone(),
            load_execution_middleware,
        ));

    Router::new().nest("/executions/{execution_id}", execution_id_router)
}
