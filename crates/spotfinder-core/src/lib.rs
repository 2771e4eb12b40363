pub mod config;
pub mod error;
pub mod secrets;

pub use config::{
    AnalysisConfig, Config, GeocoderKind, GeocodingConfig, HomePosition, LocationConfig,
    PlacesConfig, ServerConfig, StoreConfig, ValidationResult, WeatherConfig,
    WeatherProviderKind,
};
pub use error::{AppError, ConfigError, NetworkError, ReqwestErrorExt};
pub use secrets::{CredentialProvider, EnvCredentials, StaticCredentials};

use anyhow::Result;

/// Result type used across spotfinder service boundaries.
pub type AppResult<T> = std::result::Result<T, AppError>;

/// Initialize logging for the process
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    tracing::info!("spotfinder core initialized");
    Ok(())
}
