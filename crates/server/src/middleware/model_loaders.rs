use axum::{
    extract::{Path, Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use db::models::{
    domain_task::DomainTask, master_task::MasterTask, task_execution::TaskExecution,
    user_task::UserTask,
};
use uuid::Uuid;

use crate::Deployment;

pub async fn load_master_task_middleware(
    State(deployment): State<Deployment>,
    Path(master_task_id): Path<String>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    // Master tasks are addressed by their stable external key
    let master_task =
        match MasterTask::find_by_external_id(&deployment.db().pool, &master_task_id).await {
            Ok(Some(master_task)) => master_task,
            Ok(None) => {
                tracing::warn!("Master task '{}' not found", master_task_id);
                return Err(StatusCode::NOT_FOUND);
            }
            Err(e) => {
                tracing::error!("Failed to fetch master task '{}': {}", master_task_id, e);
                return Err(StatusCode::INTERNAL_SERVER_ERROR);
            }
        };

    request.extensions_mut().insert(master_task);
    Ok(next.run(request).await)
}

pub async fn load_domain_task_middleware(
    State(deployment): State<Deployment>,
    Path(domain_task_id): Path<Uuid>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let domain_task = match DomainTask::find_by_id(&deployment.db().pool, domain_task_id).await {
        Ok(Some(domain_task)) => domain_task,
        Ok(None) => {
            tracing::warn!("Domain task {} not found", domain_task_id);
            return Err(StatusCode::NOT_FOUND);
        }
        Err(e) => {
            tracing::error!("Failed to fetch domain task {}: {}", domain_task_id, e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    request.extensions_mut().insert(domain_task);
    Ok(next.run(request).await)
}

pub async fn load_user_task_middleware(
    State(deployment): State<Deployment>,
    Path(user_task_id): Path<Uuid>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let user_task = match UserTask::find_by_id(&deployment.db().pool, user_task_id).await {
        Ok(Some(user_task)) => user_task,
        Ok(None) => {
            tracing::warn!("User task {} not found", user_task_id);
            return Err(StatusCode::NOT_FOUND);
        }
        Err(e) => {
            tracing::error!("Failed to fetch user task {}: {}", user_task_id, e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    request.extensions_mut().insert(user_task);
    Ok(next.run(request).await)
}

pub async fn load_execution_middleware(
    State(deployment): State<Deployment>,
    Path(execution_id): Path<Uuid>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let execution = match TaskExecution::find_by_id(&deployment.db().pool, execution_id).await {
        Ok(Some(execution)) => execution,
        Ok(None) => {
            tracing::warn!("Execution {} not found", execution_id);
            return Err(StatusCode::NOT_FOUND);
        }
        Err(e) => {
            tracing::error!("Failed to fetch execution {}: {}", execution_id, e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    request.extensions_mut().insert(execution);
    Ok(next.run(request).await)
}
