use axum::{
    Json, Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::{
    domain_adoption::DomainAdoption,
    domain_task::{DomainCustomizations, DomainTask},
};
use serde::{Deserialize, Serialize};
use services::services::AdoptionService;
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{Deployment, error::ApiError};

#[derive(Debug, Serialize, Deserialize, TS)]
pub struct AdoptTaskRequest {
    pub master_task_id: String,
    pub adopted_by: Option<Uuid>,
    pub customizations: Option<DomainCustomizations>,
}

pub async fn adopt_task(
    State(deployment): State<Deployment>,
    Path(domain_id): Path<Uuid>,
    Json(payload): Json<AdoptTaskRequest>,
) -> Result<ResponseJson<ApiResponse<DomainTask>>, ApiError> {
    let domain_task = AdoptionService::adopt(
        &deployment.db().pool,
        domain_id,
        &payload.master_task_id,
        payload.adopted_by,
        payload.customizations,
    )
    .await?;

    Ok(ResponseJson(ApiResponse::success(domain_task)))
}

pub async fn get_domain_tasks(
    State(deployment): State<Deployment>,
    Path(domain_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<DomainTask>>>, ApiError> {
    let tasks = DomainTask::find_by_domain_id(&deployment.db().pool, domain_id).await?;
    Ok(ResponseJson(ApiResponse::success(tasks)))
}

pub async fn get_domain_adoptions(
    State(deployment): State<Deployment>,
    Path(domain_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<DomainAdoption>>>, ApiError> {
    let adoptions = DomainAdoption::find_by_domain_id(&deployment.db().pool, domain_id).await?;
    Ok(ResponseJson(ApiResponse::success(adoptions)))
}

pub fn router(_deployment: &Deployment) -> Router<Deployment> {
    let inner = Router::new()
        .route("/adoptions", post(adopt_task).get(get_domain_adoptions))
        .route("/tasks", get(get_domain_tasks));

    Router::new().nest("/domains/{domain_id}", inner)
}
