// src/main.rs
// DOCUMENTATION: Application entry point
// PURPOSE: Load config, open the configured storage and report what it holds

use anyhow::Context;
use hbnb_storage::{open_storage, EntityKind, StorageConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration (reads .env as well)
    let config = StorageConfig::from_env();

    // 2. Initialize logging
    if std::env::var("RUST_LOG").is_err() {
        let log_level = if !config.log_level.is_empty() {
            config.log_level.as_str()
        } else {
            "info,sqlx=warn"
        };
        std::env::set_var("RUST_LOG", log_level);
    }
    env_logger::init();

    log::info!("Starting hbnb-storage...");
    log::info!("Environment: {}", config.environment);
    log::info!("Storage type: {:?}", config.storage_type);

    config.validate().context("invalid configuration")?;

    // 3. Open storage and start a session
    let mut storage = open_storage(&config)
        .await
        .context("failed to open storage")?;
    storage.reload().await.context("failed to reload storage")?;

    // 4. Report
    for kind in EntityKind::ALL {
        let count = storage.count(Some(kind)).await?;
        log::info!("{:<8} {}", kind.name(), count);
    }
    log::info!("Total    {}", storage.count(None).await?);

    storage.close().await?;
    log::info!("Storage closed");
    Ok(())
}
