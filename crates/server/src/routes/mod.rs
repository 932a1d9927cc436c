use axum::{
    Router,
    routing::{IntoMakeService, get},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::Deployment;

pub mod domain_tasks;
pub mod domains;
pub mod executions;
pub mod health;
pub mod master_tasks;
pub mod user_tasks;

pub fn router(deployment: Deployment) -> IntoMakeService<Router> {
    let api_routes = Router::new()
        .route("/health", get(health::health_check))
        .merge(master_tasks::router(&deployment))
        .merge(domains::router(&deployment))
        .merge(domain_tasks::router(&deployment))
        .merge(user_tasks::router(&deployment))
        .merge(executions::router(&deployment))
        .with_state(deployment);

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .into_make_service()
}
