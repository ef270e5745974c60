use crate::config::Config;
use sqlx::PgPool;

pub struct AppState {
    pub config: Config,
    pub db: PgPool,
}

impl AppState {
    pub async fn new(config: Config, db: PgPool) -> anyhow::Result<Self> {
        tracing::info!("Verifying PostgreSQL connection...");

        // Fail fast if the pool cannot serve a round trip
        tokio::time::timeout(
            std::time::Duration::from_secs(5),
            sqlx::query("SELECT 1").execute(&db),
        )
        .await
        .map_err(|_| anyhow::anyhow!("PostgreSQL ping timeout after 5s"))??;

        tracing::info!("PostgreSQL connection established successfully");

        Ok(Self { config, db })
    }
}

pub mod auth_service;
pub mod lesson_service;
pub mod profile_service;
pub mod submission_service;
