use std::sync::Arc;

use color_eyre::eyre::{eyre, Result};
use dotenv::dotenv;
use telecare_api::config::{ApiConfig, StoreBackend};
use telecare_db::{create_pool, schema::initialize_database, BookingStore, MemoryStore, PgStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Load environment variables
    dotenv().ok();

    // Load configuration
    let config = ApiConfig::from_env()?;

    let store: Arc<dyn BookingStore> = match config.store_backend {
        StoreBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .ok_or_else(|| eyre!("DATABASE_URL environment variable must be set"))?;

            // Create database connection pool
            let db_pool = create_pool(database_url).await?;

            // Initialize database schema
            initialize_database(&db_pool).await?;

            Arc::new(PgStore::new(db_pool))
        }
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    };

    // Start API server
    telecare_api::start_server(config, store).await?;

    Ok(())
}
