//! Check-config command - validates configuration and exits

use crate::config::AppConfig;

/// Load configuration from files and environment and validate it
pub fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    config.validate()?;

    println!(
        "Configuration OK: environment={}, listen={}:{}, store={}, metrics={}",
        config.server.environment,
        config.server.host,
        config.server.port,
        if config.database.url.is_some() { "postgres" } else { "in-memory" },
        if config.metrics.enabled { "enabled" } else { "disabled" },
    );

    Ok(())
}
