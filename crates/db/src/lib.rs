use std::{env, str::FromStr};

use sqlx::{
    Error, SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

pub mod models;

#[derive(Clone)]
pub struct DBService {
    pub pool: SqlitePool,
}

impl DBService {
    /// Create a new DBService connecting to SQLite.
    /// Uses DATABASE_URL environment variable.
    pub async fn new() -> Result<DBService, Error> {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://taskpipeline.db".to_string());
        let options = SqliteConnectOptions::from_str(&database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(DBService { pool })
    }

    /// In-memory database for tests. A single long-lived connection keeps the
    /// database alive for the whole pool lifetime.
    pub async fn new_in_memory() -> Result<DBService, Error> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(DBService { pool })
    }
}
