use std::env;

use db::DBService;
use server::{Deployment, routes};
use tracing_subscriber::{EnvFilter, prelude::*};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let db = DBService::new().await?;
    tracing::info!("Database ready, migrations applied");

    let deployment = Deployment::new(db);

    let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(3801);

    let listener = tokio::net::TcpListener::bind(format!("{host}:{port}")).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, routes::router(deployment)).await?;
    Ok(())
}
