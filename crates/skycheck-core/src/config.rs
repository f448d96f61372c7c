use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// OpenWeatherMap current-weather endpoint, used when none is configured.
pub const DEFAULT_API_ENDPOINT: &str = "http://api.openweathermap.org/data/2.5/weather";

/// Environment variable that overrides `weather.api_key`.
pub const API_KEY_ENV: &str = "SKYCHECK_API_KEY";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ConfigValidation {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ConfigValidation {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,

    /// Weather API settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// City dataset settings
    #[serde(default)]
    pub gazetteer: GazetteerConfig,

    /// Response cache settings
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// API key (`appid`). Weather lookups are disabled without one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Endpoint the `q`/`appid`/`units` query is sent to
    #[serde(default = "default_api_endpoint")]
    pub api_endpoint: String,

    /// City used when a lookup names none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_city: Option<String>,

    /// ISO 3166-1 alpha-2 code paired with `default_city`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_country_code: Option<String>,
}

fn default_api_endpoint() -> String {
    DEFAULT_API_ENDPOINT.to_string()
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_endpoint: default_api_endpoint(),
            default_city: None,
            default_country_code: None,
        }
    }
}

impl WeatherConfig {
    /// True when a non-blank API key is present.
    pub fn has_api_key(&self) -> bool {
        self.api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GazetteerConfig {
    /// JSON file of `{ "name": ..., "country": ... }` records.
    /// The bundled world cities list is used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_path: Option<PathBuf>,
}

/// Which cache backend stores weather responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    #[default]
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: CacheBackendKind,

    /// Database file for the sqlite backend (defaults to `<config_dir>/weather_cache.db`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("skycheck")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            weather: WeatherConfig::default(),
            gazetteer: GazetteerConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if it doesn't exist.
    ///
    /// The `SKYCHECK_API_KEY` environment variable takes precedence over the file.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        let mut config = if config_path.exists() {
            Self::read_file(&config_path)?
        } else {
            let config = Self::default();
            config.save_to(&config_path)?;
            config
        };

        config.apply_api_key_override(std::env::var(API_KEY_ENV).ok());
        Ok(config)
    }

    /// Load configuration from an explicit file. A missing file is an error here.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::read_file(path)?;
        config.apply_api_key_override(std::env::var(API_KEY_ENV).ok());
        Ok(config)
    }

    /// Load (from `path` if given) and validate.
    ///
    /// Warnings are logged; errors fail the load.
    pub fn load_validated(path: Option<&Path>) -> Result<(Self, ConfigValidation), ConfigError> {
        let config = match path {
            Some(p) if !p.exists() => {
                return Err(ConfigError::NotFound(p.display().to_string()));
            }
            Some(p) => Self::load_from(p),
            None => Self::load(),
        }
        .map_err(|e| ConfigError::Unreadable(format!("{:#}", e)))?;

        let validation = config.validate();
        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()));
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Read the file at `path` (or the default location) for editing.
    ///
    /// Unlike `load`, the environment override is not applied, so saving the
    /// result never writes an API key that only lives in the environment.
    /// A missing file yields the defaults.
    pub fn load_for_edit(path: Option<&Path>) -> Result<(Self, PathBuf)> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };
        let config = if path.exists() {
            Self::read_file(&path)?
        } else {
            Self::default()
        };
        Ok((config, path))
    }

    fn read_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        toml::from_str(&contents).context("Failed to parse config file")
    }

    /// Replace the configured API key with `value` when it is non-blank.
    pub fn apply_api_key_override(&mut self, value: Option<String>) {
        if let Some(key) = value.filter(|k| !k.trim().is_empty()) {
            tracing::debug!("Using API key from {}", API_KEY_ENV);
            self.weather.api_key = Some(key);
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigValidation {
        let mut result = ConfigValidation::default();

        Self::validate_url(
            &self.weather.api_endpoint,
            "weather.api_endpoint",
            &mut result,
        );

        if !self.weather.has_api_key() {
            result.add_warning(
                "weather.api_key",
                "No API key configured - weather lookups are disabled",
            );
        }

        if let Some(code) = self.weather.default_country_code.as_deref() {
            if !code.is_empty() && !is_alpha2(code) {
                result.add_error(
                    "weather.default_country_code",
                    format!("Expected a two-letter country code, got: {}", code),
                );
            }
            if self.weather.default_city.is_none() {
                result.add_warning(
                    "weather.default_country_code",
                    "Default country code is ignored without a default city",
                );
            }
        }

        if let Some(path) = &self.gazetteer.dataset_path {
            if !path.exists() {
                result.add_warning(
                    "gazetteer.dataset_path",
                    format!(
                        "Path does not exist: {} (city validation will find nothing)",
                        path.display()
                    ),
                );
            }
        }

        result
    }

    fn validate_url(url_str: &str, field_name: &str, result: &mut ConfigValidation) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Path of the sqlite cache database
    pub fn cache_db_path(&self) -> PathBuf {
        self.cache
            .path
            .clone()
            .unwrap_or_else(|| self.config_dir.join("weather_cache.db"))
    }

    /// Write the configuration as TOML, creating parent directories.
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("skycheck");

        Ok(config_dir.join("config.toml"))
    }
}

fn is_alpha2(code: &str) -> bool {
    code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_default_config() {
        let config = Config::default();
        let result = config.validate();
        assert!(result.is_valid(), "Default config should be valid: {:?}", result.errors);
        assert_eq!(config.weather.api_endpoint, DEFAULT_API_ENDPOINT);
    }

    #[test]
    fn test_missing_api_key_is_warning() {
        let config = Config::default();
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.field == "weather.api_key"));
    }

    #[test]
    fn test_invalid_url() {
        let mut config = Config::default();
        config.weather.api_endpoint = "not-a-url".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "weather.api_endpoint"));
    }

    #[test]
    fn test_invalid_url_scheme() {
        let mut config = Config::default();
        config.weather.api_endpoint = "ftp://api.example.com/weather".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.message.contains("http or https")));
    }

    #[test]
    fn test_bad_default_country_code() {
        let mut config = Config::default();
        config.weather.default_city = Some("London".to_string());
        config.weather.default_country_code = Some("GBR".to_string());
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result
            .errors
            .iter()
            .any(|e| e.field == "weather.default_country_code"));
    }

    #[test]
    fn test_country_code_without_city_is_warning() {
        let mut config = Config::default();
        config.weather.default_country_code = Some("gb".to_string());
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result
            .warnings
            .iter()
            .any(|w| w.field == "weather.default_country_code"));
    }

    #[test]
    fn test_api_key_override() {
        let mut config = Config::default();
        config.weather.api_key = Some("from-file".to_string());

        config.apply_api_key_override(Some("   ".to_string()));
        assert_eq!(config.weather.api_key.as_deref(), Some("from-file"));

        config.apply_api_key_override(Some("from-env".to_string()));
        assert_eq!(config.weather.api_key.as_deref(), Some("from-env"));
        assert!(config.weather.has_api_key());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[weather]
default_city = "London"
default_country_code = "GB"

[cache]
backend = "sqlite"
"#,
        )
        .unwrap();

        let config = Config::read_file(&path).unwrap();
        assert_eq!(config.weather.default_city.as_deref(), Some("London"));
        assert_eq!(config.weather.default_country_code.as_deref(), Some("GB"));
        assert_eq!(config.weather.api_endpoint, DEFAULT_API_ENDPOINT);
        assert_eq!(config.cache.backend, CacheBackendKind::Sqlite);
        assert!(config.cache_db_path().ends_with("weather_cache.db"));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.weather.default_city = Some("Paris".to_string());
        config.save_to(&path).unwrap();

        let reloaded = Config::read_file(&path).unwrap();
        assert_eq!(reloaded.weather.default_city.as_deref(), Some("Paris"));
        assert!(reloaded.weather.api_key.is_none());
    }

    #[test]
    fn test_load_validated_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load_validated(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(ref p) if p.contains("absent.toml")));
    }

    #[test]
    fn test_load_validated_rejects_bad_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[weather]\napi_endpoint = \"ftp://example.com\"\n").unwrap();

        let err = Config::load_validated(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref s) if s.contains("weather.api_endpoint")));
    }

    #[test]
    fn test_load_validated_unparseable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[weather\n").unwrap();

        let err = Config::load_validated(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Unreadable(_)));
    }

    #[test]
    fn test_load_for_edit_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let (mut config, resolved) = Config::load_for_edit(Some(&path)).unwrap();
        assert_eq!(resolved, path);
        assert!(config.weather.default_city.is_none());

        config.weather.default_city = Some("Rome".to_string());
        config.save_to(&resolved).unwrap();

        let (reloaded, _) = Config::load_for_edit(Some(&path)).unwrap();
        assert_eq!(reloaded.weather.default_city.as_deref(), Some("Rome"));
    }

    #[test]
    fn test_error_summary_joins_fields() {
        let mut result = ConfigValidation::default();
        result.add_error("field1", "error1");
        result.add_error("field2", "error2");
        let summary = result.error_summary();
        assert!(summary.contains("field1"));
        assert!(summary.contains("field2"));
    }
}
