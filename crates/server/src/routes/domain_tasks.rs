use axum::{
    Extension, Json, Router,
    extract::State,
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{get, post, put},
};
use db::models::domain_task::{DomainCustomizations, DomainTask};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{Deployment, error::ApiError, middleware::load_domain_task_middleware};

pub async fn get_domain_task(
    Extension(domain_task): Extension<DomainTask>,
) -> Result<ResponseJson<ApiResponse<DomainTask>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(domain_task)))
}

#[derive(Debug, Serialize, Deserialize, TS)]
pub struct UpdateCustomizationsRequest {
    /// `None` clears the overlay entirely.
    pub customizations: Option<DomainCustomizations>,
}

/// Replace the tenant's customization overlay. The adoption-time snapshot is
/// never touched by this path.
pub async fn update_customizations(
    Extension(domain_task): Extension<DomainTask>,
    State(deployment): State<Deployment>,
    Json(payload): Json<UpdateCustomizationsRequest>,
) -> Result<ResponseJson<ApiResponse<DomainTask>>, ApiError> {
    let updated = DomainTask::update_customizations(
        &deployment.db().pool,
        domain_task.id,
        payload.customizations.as_ref(),
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Domain task not found".to_string()))?;

    Ok(ResponseJson(ApiResponse::success(updated)))
}

#[derive(Debug, Serialize, Deserialize, TS)]
pub struct SetPrerequisitesRequest {
    pub prerequisite_tasks: Vec<Uuid>,
}

pub async fn set_prerequisites(
    Extension(domain_task): Extension<DomainTask>,
    State(deployment): State<Deployment>,
    Json(payload): Json<SetPrerequisitesRequest>,
) -> Result<ResponseJson<ApiResponse<DomainTask>>, ApiError> {
    let updated = DomainTask::set_prerequisites(
        &deployment.db().pool,
        domain_task.id,
        &payload.prerequisite_tasks,
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Domain task not found".to_string()))?;

    Ok(ResponseJson(ApiResponse::success(updated)))
}

pub async fn deactivate_domain_task(
    Extension(domain_task): Extension<DomainTask>,
    State(deployment): State<Deployment>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    DomainTask::deactivate(&deployment.db().pool, domain_task.id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(deployment: &Deployment) -> Router<Deployment> {
    let domain_task_id_router = Router::new()
        .route("/", get(get_domain_task))
        .route("/customizations", put(update_customizations))
        .route("/prerequisites", put(set_prerequisites))
        .route("/deactivate", post(deactivate_domain_task))
        .layer(from_fn_with_state(
            deployment.clone(),
            load_domain_task_middleware,
        ));

    Router::new().nest("/domain-tasks/{domain_task_id}", domain_task_id_router)
}
