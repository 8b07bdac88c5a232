use std::sync::Arc;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::config::Config;
use crate::errors::AppError;
use crate::models::idea::{IdeaStore, MemoryIdeaStore, PgIdeaStore};

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub async fn init_pool(config: &Config, database_url: &str) -> Result<PgPool, AppError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(config.db_acquire_timeout)
        .connect(database_url)
        .await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    MIGRATOR.run(pool).await?;
    log::info!("Database migrations complete");
    Ok(())
}

/// Build the store the server runs on: Postgres when configured, memory otherwise.
pub async fn init_store(config: &Config) -> Result<Arc<dyn IdeaStore>, AppError> {
    match &config.database_url {
        Some(url) => {
            let pool = init_pool(config, url).await?;
            run_migrations(&pool).await?;
            Ok(Arc::new(PgIdeaStore::new(pool)))
        }
        None => Ok(Arc::new(MemoryIdeaStore::new())),
    }
}
