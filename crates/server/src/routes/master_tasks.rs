use axum::{
    Extension, Json, Router,
    extract::State,
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::master_task::{CreateMasterTask, MasterTask};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{Deployment, error::ApiError, middleware::load_master_task_middleware};

pub async fn get_master_tasks(
    State(deployment): State<Deployment>,
) -> Result<ResponseJson<ApiResponse<Vec<MasterTask>>>, ApiError> {
    let tasks = MasterTask::find_all(&deployment.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(tasks)))
}

pub async fn create_master_task(
    State(deployment): State<Deployment>,
    Json(payload): Json<CreateMasterTask>,
) -> Result<ResponseJson<ApiResponse<MasterTask>>, ApiError> {
    if payload.master_task_id.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "master_task_id must not be empty".to_string(),
        ));
    }

    tracing::debug!("Creating master task '{}'", payload.master_task_id);

    let task = MasterTask::create(&deployment.db().pool, &payload, Uuid::new_v4())
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                ApiError::Conflict(format!(
                    "Master task '{}' already exists",
                    payload.master_task_id
                ))
            }
            other => ApiError::Database(other),
        })?;

    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn get_master_task(
    Extension(master_task): Extension<MasterTask>,
) -> Result<ResponseJson<ApiResponse<MasterTask>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(master_task)))
}

pub async fn deactivate_master_task(
    Extension(master_task): Extension<MasterTask>,
    State(deployment): State<Deployment>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    MasterTask::deactivate(&deployment.db().pool, master_task.id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(deployment: &Deployment) -> Router<Deployment> {
    let master_task_id_router = Router::new()
        .route("/", get(get_master_task))
        .route("/deactivate", post(deactivate_master_task))
        .layer(from_fn_with_state(
            deployment.clone(),
            load_master_task_middleware,
        ));

    let inner = Router::new()
        .route("/", get(get_master_tasks).post(create_master_task))
        .nest("/{master_task_id}", master_task_id_router);

    Router::new().nest("/master-tasks", inner)
}
