//! Service entry point: load configuration, run migrations, start the sync
//! scheduler and wait for shutdown.

use std::sync::Arc;

use jiradash_sync::config::ConfigLoader;
use jiradash_sync::db::init_pool;
use jiradash_sync::scheduler::SyncScheduler;
use jiradash_sync::sync::SyncEngine;
use jiradash_sync::telemetry::init_subscriber;
use migration::{Migrator, MigratorTrait};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConfigLoader::new(".").load()?;
    init_subscriber(&config);
    info!(profile = %config.profile, "configuration loaded");

    let db = Arc::new(init_pool(&config).await?);
    Migrator::up(db.as_ref(), None).await?;

    let engine = Arc::new(SyncEngine::new(db, &config)?);
    let handle = SyncScheduler::new(engine, config.sync.clone()).start();

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    handle.stop().await;

    Ok(())
}
