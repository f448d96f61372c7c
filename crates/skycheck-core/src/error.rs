//! Centralized error types for skycheck.
//!
//! Component crates keep their own error enums; the binary maps them into
//! this hierarchy so every failure has a user-facing message.

use thiserror::Error;

/// Top-level application error type.
///
/// Use `user_message()` to get a message suitable for showing to a user.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Weather service error: {0}")]
    Weather(#[from] WeatherError),

    #[error("Gazetteer error: {0}")]
    Gazetteer(#[from] GazetteerError),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Network(e) => e.user_message(),
            AppError::Config(e) => e.user_message(),
            AppError::Weather(e) => e.user_message(),
            AppError::Gazetteer(e) => e.user_message(),
            AppError::Other(_) => "An unexpected error occurred. Please try again.",
        }
    }

    /// Whether retrying the same request later might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Network(NetworkError::InvalidResponse(_)) => false,
            AppError::Network(_) => true,
            AppError::Weather(WeatherError::ServiceUnavailable) => true,
            AppError::Weather(WeatherError::RateLimited) => true,
            _ => false,
        }
    }
}

/// Network-related errors (HTTP, connectivity).
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl NetworkError {
    pub fn user_message(&self) -> &'static str {
        match self {
            NetworkError::ConnectionFailed(_) => {
                "Unable to connect. Check your internet connection."
            }
            NetworkError::Timeout => "The request timed out. Please try again.",
            NetworkError::ServerError { status, .. } if *status >= 500 => {
                "The server is experiencing issues. Please try again later."
            }
            NetworkError::ServerError { .. } => "The request failed. Please try again.",
            NetworkError::InvalidResponse(_) => {
                "Received an unexpected response. Please try again."
            }
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Could not read configuration: {0}")]
    Unreadable(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::NotFound(_) => "Configuration file not found. Check the --config path.",
            ConfigError::Unreadable(_) => "Configuration file could not be read. Check its syntax.",
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
        }
    }
}

/// Weather service errors.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Location not found: {0}")]
    LocationNotFound(String),

    #[error("No city given and no default city configured")]
    NoLocation,

    #[error("Weather API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Rate limited by weather API")]
    RateLimited,

    #[error("Service unavailable")]
    ServiceUnavailable,
}

impl WeatherError {
    pub fn user_message(&self) -> &'static str {
        match self {
            WeatherError::LocationNotFound(_) => "Location not found. Check and try again.",
            WeatherError::NoLocation => "Enter a city or configure a default city.",
            WeatherError::ApiError { .. } => "Weather service error. Please try again.",
            WeatherError::InvalidApiKey => "Weather API key is invalid. Check settings.",
            WeatherError::RateLimited => "Too many weather requests. Please wait a minute.",
            WeatherError::ServiceUnavailable => {
                "Weather service unavailable. Please try again later."
            }
        }
    }
}

/// City/country validation errors.
#[derive(Debug, Error)]
pub enum GazetteerError {
    #[error("No such city: {0}")]
    NoSuchCity(String),

    #[error("No such city in this country: {city}, {country}")]
    NoSuchCityInCountry { city: String, country: String },

    #[error("Unknown country code: {0}")]
    UnknownCountryCode(String),
}

impl GazetteerError {
    pub fn user_message(&self) -> &'static str {
        match self {
            GazetteerError::NoSuchCity(_) => "There is no such city!",
            GazetteerError::NoSuchCityInCountry { .. } => "There is no such city in this country!",
            GazetteerError::UnknownCountryCode(_) => "Unknown country code. Use a two-letter code.",
        }
    }
}

/// Extension trait for converting reqwest errors to our error types.
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_network_error(self) -> NetworkError {
        if self.is_timeout() {
            NetworkError::Timeout
        } else if self.is_connect() {
            NetworkError::ConnectionFailed(self.to_string())
        } else if let Some(status) = self.status() {
            NetworkError::ServerError {
                status: status.as_u16(),
                message: self.to_string(),
            }
        } else if self.is_decode() {
            NetworkError::InvalidResponse(self.to_string())
        } else {
            NetworkError::ConnectionFailed(self.to_string())
        }
    }
}
