pub mod config;
pub mod error;

pub use config::{
    Config, LoggingConfig, StorageConfig, ValidationResult, WeatherConfig,
    DEFAULT_WEATHER_API_URL,
};
pub use error::{
    AppError, ConfigError, DatabaseError, NetworkError, ReqwestErrorExt, RusqliteErrorExt,
};

use anyhow::Result;

/// Initialize tracing/logging.
///
/// `RUST_LOG` wins over `default_level` when set.
///
/// # Errors
/// Returns an error if a global subscriber is already installed.
pub fn init(default_level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    tracing::info!("Todo core initialized");
    Ok(())
}
