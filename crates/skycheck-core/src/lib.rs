pub mod config;
pub mod error;

pub use config::{
    CacheBackendKind, CacheConfig, Config, ConfigValidation, GazetteerConfig, WeatherConfig,
    API_KEY_ENV, DEFAULT_API_ENDPOINT,
};
pub use error::{
    AppError, ConfigError, GazetteerError, NetworkError, ReqwestErrorExt, WeatherError,
};

use anyhow::Result;

/// Initialize logging for the application.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("skycheck core initialized");
    Ok(())
}
