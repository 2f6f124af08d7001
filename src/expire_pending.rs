//! One-shot sweep that cancels pending requests the doctor never answered.
//!
//! Meant to be run periodically by an external scheduler (cron, a Kubernetes
//! CronJob). Each expiry is an ordinary compare-and-swap transition, so it is
//! safe to run alongside the API server.

use std::sync::Arc;

use chrono::Utc;
use color_eyre::eyre::{eyre, Result};
use dotenv::dotenv;
use telecare_api::{
    config::{ApiConfig, StoreBackend},
    services::lifecycle::LifecycleManager,
    ApiState,
};
use telecare_db::{create_pool, schema::initialize_database, PgStore};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Load environment variables
    dotenv().ok();

    let config = ApiConfig::from_env()?;
    telecare_api::init_tracing(config.log_level)?;

    if config.store_backend != StoreBackend::Postgres {
        return Err(eyre!("expire-pending needs STORE_BACKEND=postgres"));
    }
    let database_url = config
        .database_url
        .as_deref()
        .ok_or_else(|| eyre!("DATABASE_URL environment variable must be set"))?;

    let db_pool = create_pool(database_url).await?;
    initialize_database(&db_pool).await?;

    let state = ApiState::new(Arc::new(PgStore::new(db_pool)), config.policy);
    let lifecycle = LifecycleManager::from_state(&state);
    let summary = lifecycle.expire_stale(Utc::now()).await?;

    info!(
        "Expired {} pending request(s), skipped {}",
        summary.expired.len(),
        summary.skipped
    );

    lifecycle.flush_deliveries().await;

    Ok(())
}
