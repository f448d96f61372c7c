use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

use crate::cache::CacheBackend;
use crate::clock::{Clock, SystemClock};
use crate::types::{
    is_empty_payload, ClientConfig, WeatherError, WeatherOutcome, WeatherReading, CACHE_TTL_SECS,
    NO_CODE_SENTINEL, REQUEST_TIMEOUT_SECS,
};

/// Cache key for a lookup: `weather:{city}:{code}`, both lower-cased, with
/// `no_code` standing in for a missing or empty country code.
pub fn cache_key(city: &str, country_code: Option<&str>) -> String {
    let code = country_code
        .filter(|c| !c.is_empty())
        .map(str::to_lowercase);
    format!(
        "weather:{}:{}",
        city.to_lowercase(),
        code.as_deref().unwrap_or(NO_CODE_SENTINEL)
    )
}

/// Fetches current weather for a city, answering from the cache while a
/// previous response is less than 90 seconds old.
#[derive(Clone)]
pub struct WeatherFetcher {
    client: Arc<Client>,
    config: ClientConfig,
    cache: Arc<dyn CacheBackend>,
    clock: Arc<dyn Clock>,
}

impl WeatherFetcher {
    pub fn new(config: ClientConfig, cache: Arc<dyn CacheBackend>) -> Result<Self, WeatherError> {
        Self::with_clock(config, cache, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: ClientConfig,
        cache: Arc<dyn CacheBackend>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client: Arc::new(client),
            config,
            cache,
            clock,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Whether an API key is configured.
    pub fn is_enabled(&self) -> bool {
        self.config.api_key().is_some()
    }

    /// Current weather for `city`, optionally qualified by `country_code`.
    ///
    /// Without a city the configured default city is used, together with
    /// `country_code` or else the default country code. Returns
    /// `Disabled` without touching the cache or network when no API key is
    /// configured. Upstream failures are returned as errors and never cached.
    #[instrument(skip(self), level = "info")]
    pub async fn fetch_weather(
        &self,
        city: Option<&str>,
        country_code: Option<&str>,
    ) -> Result<WeatherOutcome, WeatherError> {
        let Some(api_key) = self.config.api_key() else {
            tracing::debug!("No API key configured, weather disabled");
            return Ok(WeatherOutcome::Disabled);
        };

        let Some((city, code)) = self.resolve_location(city, country_code) else {
            tracing::debug!("No city given and no default city configured");
            return Ok(WeatherOutcome::NoLocation);
        };
        let code = code.map(str::to_lowercase);

        let key = cache_key(city, code.as_deref());
        let now = self.clock.now();

        if let Some(reading) = self.read_cache(&key, now) {
            tracing::debug!("Weather cache hit for {}", key);
            return Ok(WeatherOutcome::Reading(reading));
        }

        let reading = self.request(api_key, city, code.as_deref()).await?;
        self.write_cache(&key, &reading, now + Duration::seconds(CACHE_TTL_SECS));

        Ok(WeatherOutcome::Reading(reading))
    }

    fn resolve_location<'a>(
        &'a self,
        city: Option<&'a str>,
        country_code: Option<&'a str>,
    ) -> Option<(&'a str, Option<&'a str>)> {
        let country_code = non_empty(country_code);
        if let Some(city) = non_empty(city) {
            return Some((city, country_code));
        }

        let default_city = non_empty(self.config.default_city.as_deref())?;
        let code = country_code.or_else(|| non_empty(self.config.default_country_code.as_deref()));
        Some((default_city, code))
    }

    /// A live, non-empty cached reading. Expired entries are deleted here.
    fn read_cache(&self, key: &str, now: DateTime<Utc>) -> Option<WeatherReading> {
        let entry = match self.cache.get(key) {
            Ok(entry) => entry?,
            Err(e) => {
                tracing::warn!("Weather cache read failed for {}: {}", key, e);
                return None;
            }
        };

        if entry.is_expired(now) {
            tracing::debug!("Evicting expired weather cache entry {}", key);
            if let Err(e) = self.cache.delete(key) {
                tracing::warn!("Failed to evict {}: {}", key, e);
            }
            return None;
        }

        if is_empty_payload(&entry.data) {
            return None;
        }

        Some(WeatherReading::from_payload(entry.data))
    }

    fn write_cache(&self, key: &str, reading: &WeatherReading, expires_at: DateTime<Utc>) {
        if let Err(e) = self.cache.set(key, reading.payload(), expires_at) {
            tracing::warn!("Failed to cache weather for {}: {}", key, e);
        }
    }

    async fn request(
        &self,
        api_key: &str,
        city: &str,
        country_code: Option<&str>,
    ) -> Result<WeatherReading, WeatherError> {
        let q = match country_code {
            Some(code) => format!("{},{}", city, code),
            None => city.to_string(),
        };

        tracing::info!("Fetching weather for {}", q);

        let response = self
            .client
            .get(&self.config.api_endpoint)
            .query(&[("appid", api_key), ("q", q.as_str()), ("units", "metric")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!("Weather API returned status {} for {}", status, q);
            return Err(WeatherError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        parse_body(&body).map(WeatherReading::from_payload)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Empty body is an empty reading; anything else must be a JSON object.
fn parse_body(body: &str) -> Result<Value, WeatherError> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }

    let value: Value = serde_json::from_str(body)
        .map_err(|e| WeatherError::MalformedResponse(e.to_string()))?;

    if !value.is_object() {
        return Err(WeatherError::MalformedResponse(format!(
            "expected a JSON object, got: {}",
            truncate(body, 80)
        )));
    }

    Ok(value)
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;

    #[test]
    fn test_cache_key_lowercases() {
        assert_eq!(cache_key("London", Some("GB")), "weather:london:gb");
        assert_eq!(cache_key("ROME", None), "weather:rome:no_code");
    }

    #[test]
    fn test_missing_and_empty_code_share_sentinel() {
        assert_eq!(cache_key("Rome", None), cache_key("Rome", Some("")));
    }

    #[test]
    fn test_sentinel_never_collides_with_real_codes() {
        let sentinel = cache_key("Rome", None);
        for code in ["IT", "no", "NO", "co", "de"] {
            assert_ne!(cache_key("Rome", Some(code)), sentinel);
        }
    }

    #[test]
    fn test_same_city_different_countries() {
        assert_ne!(cache_key("Paris", Some("FR")), cache_key("Paris", Some("US")));
    }

    #[test]
    fn test_parse_body_object() {
        let value = parse_body(r#"{"main": {"temp": 1}}"#).unwrap();
        assert_eq!(value["main"]["temp"], 1);
    }

    #[test]
    fn test_parse_body_empty() {
        assert_eq!(parse_body("").unwrap(), Value::Null);
        assert_eq!(parse_body("  \n").unwrap(), Value::Null);
    }

    #[test]
    fn test_parse_body_rejects_non_json_and_non_objects() {
        assert!(matches!(
            parse_body("<html>oops</html>"),
            Err(WeatherError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_body("[1, 2]"),
            Err(WeatherError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_resolve_location_prefers_explicit_city() {
        let config = ClientConfig::new(Some("key".into()), "http://localhost")
            .with_default_location(Some("London".into()), Some("GB".into()));
        let fetcher = WeatherFetcher::new(config, Arc::new(MemoryCache::new())).unwrap();

        assert_eq!(
            fetcher.resolve_location(Some("Rome"), None),
            Some(("Rome", None))
        );
        assert_eq!(
            fetcher.resolve_location(None, None),
            Some(("London", Some("GB")))
        );
        assert_eq!(
            fetcher.resolve_location(Some(""), Some("IE")),
            Some(("London", Some("IE")))
        );
    }

    #[test]
    fn test_resolve_location_without_default_city() {
        let config = ClientConfig::new(Some("key".into()), "http://localhost")
            .with_default_location(None, Some("GB".into()));
        let fetcher = WeatherFetcher::new(config, Arc::new(MemoryCache::new())).unwrap();
        assert_eq!(fetcher.resolve_location(None, None), None);
    }
}
