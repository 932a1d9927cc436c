use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use services::services::{AdoptionError, AssignmentError, ExecutionContextError, ProgressError};
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Adoption(#[from] AdoptionError),
    #[error(transparent)]
    Assignment(#[from] AssignmentError),
    #[error(transparent)]
    ExecutionContext(#[from] ExecutionContextError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Database(sqlx::Error::RowNotFound) => StatusCode::NOT_FOUND,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Adoption(e) => match e {
                AdoptionError::TemplateNotFound => StatusCode::NOT_FOUND,
                AdoptionError::TemplateInactive => StatusCode::BAD_REQUEST,
                AdoptionError::AlreadyAdopted => StatusCode::CONFLICT,
                AdoptionError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Assignment(e) => match e {
                AssignmentError::DomainTaskNotFound => StatusCode::NOT_FOUND,
                AssignmentError::DomainTaskInactive => StatusCode::BAD_REQUEST,
                AssignmentError::AlreadyAssigned => StatusCode::CONFLICT,
                AssignmentError::PrerequisitesNotMet { .. } => StatusCode::BAD_REQUEST,
                AssignmentError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::ExecutionContext(e) => match e {
                ExecutionContextError::NotConfiguredForExecution
                | ExecutionContextError::NotAiAssisted => StatusCode::BAD_REQUEST,
                ExecutionContextError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Progress(e) => match e {
                ProgressError::NotFound => StatusCode::NOT_FOUND,
                ProgressError::AlreadyCompleted => StatusCode::CONFLICT,
                ProgressError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("API error: {}", self);
        }
        (status, Json(ApiResponse::<()>::error(self.to_string()))).into_response()
    }
}
