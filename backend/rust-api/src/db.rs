use serde_json::json;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

use crate::config::Config;

/// Acquire timeout bounds how long a request may wait for a pooled
/// connection before failing with a transient storage error.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);
const IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Open the PostgreSQL connection pool. The pool is the only shared mutable
/// resource in the process; it is passed by handle into `AppState` rather
/// than living in a global.
pub async fn connect(config: &Config) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .idle_timeout(IDLE_TIMEOUT)
        .connect(&config.database_url)
        .await
}

/// Apply embedded migrations from `migrations/`.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

#[derive(Debug, sqlx::FromRow)]
struct HealthRow {
    server_time: chrono::DateTime<chrono::Utc>,
    version: String,
}

/// Probe the database and report a per-dependency health snapshot.
pub async fn health_check(pool: &PgPool) -> serde_json::Map<String, serde_json::Value> {
    let mut result = serde_json::Map::new();

    match tokio::time::timeout(
        Duration::from_secs(1),
        sqlx::query_as::<_, HealthRow>("SELECT NOW() as server_time, version() as version")
            .fetch_one(pool),
    )
    .await
    {
        Ok(Ok(row)) => {
            result.insert("status".to_string(), json!("healthy"));
            result.insert("timestamp".to_string(), json!(row.server_time));
            result.insert("version".to_string(), json!(row.version));
        }
        Ok(Err(e)) => {
            result.insert("status".to_string(), json!("unhealthy"));
            result.insert("error".to_string(), json!(format!("PostgreSQL error: {}", e)));
        }
        Err(_) => {
            result.insert("status".to_string(), json!("unhealthy"));
            result.insert("error".to_string(), json!("PostgreSQL timeout after 1s"));
        }
    }

    result.insert(
        "pool".to_string(),
        json!({
            "size": pool.size(),
            "idle": pool.num_idle(),
        }),
    );

    result
}
