//! Database pool initialization

use crate::config::AppConfig;
use anyhow::Context;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;
use tracing::{info, warn};

const CONNECT_ATTEMPTS: u32 = 5;

/// Initialize the SeaORM connection pool, retrying with a short backoff so a
/// database that is still starting up does not kill the service.
pub async fn init_pool(config: &AppConfig) -> anyhow::Result<DatabaseConnection> {
    let mut opts = ConnectOptions::new(config.database_url.clone());
    opts.max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_millis(config.db_acquire_timeout_ms))
        .sqlx_logging(false);

    let mut delay = Duration::from_millis(500);
    for attempt in 1..=CONNECT_ATTEMPTS {
        match Database::connect(opts.clone()).await {
            Ok(conn) => {
                info!(attempt, "database pool ready");
                return Ok(conn);
            }
            Err(err) if attempt < CONNECT_ATTEMPTS => {
                warn!(attempt, error = %err, "database connect failed, retrying");
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            Err(err) => {
                return Err(err).context("database connect failed after retries");
            }
        }
    }
    unreachable!("connect loop always returns")
}
