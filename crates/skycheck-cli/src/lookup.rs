//! Validate-then-fetch: the only path by which the CLI asks for weather.

use std::sync::Arc;

use anyhow::Context;
use skycheck_core::{AppError, CacheBackendKind, Config, GazetteerError, WeatherError};
use skycheck_gazetteer::{
    CountryDirectory, GazetteerValidator, JsonFileSource, ValidationProblem, ValidationResult,
};
use skycheck_weather::{
    CacheBackend, ClientConfig, MemoryCache, SqliteCache, WeatherFetcher, WeatherOutcome,
    WeatherReading,
};

use crate::error_mapping::{from_fetch_error, from_validation_problem};

#[derive(Debug, PartialEq)]
pub enum LookupOutcome {
    /// The city/country pair is not in the gazetteer; weather was not requested.
    Invalid(ValidationProblem),
    /// No API key configured.
    Disabled,
    Weather(WeatherReading),
}

pub struct WeatherLookup {
    validator: GazetteerValidator,
    countries: CountryDirectory,
    fetcher: WeatherFetcher,
}

impl WeatherLookup {
    pub fn new(
        validator: GazetteerValidator,
        countries: CountryDirectory,
        fetcher: WeatherFetcher,
    ) -> Self {
        Self {
            validator,
            countries,
            fetcher,
        }
    }

    /// Build all components from application config.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let validator = match &config.gazetteer.dataset_path {
            Some(path) => GazetteerValidator::new(JsonFileSource::new(path)),
            None => GazetteerValidator::bundled(),
        };

        let cache: Arc<dyn CacheBackend> = match config.cache.backend {
            CacheBackendKind::Memory => Arc::new(MemoryCache::new()),
            CacheBackendKind::Sqlite => {
                let path = config.cache_db_path();
                Arc::new(
                    SqliteCache::new(&path)
                        .with_context(|| format!("Failed to open cache {}", path.display()))?,
                )
            }
        };

        let client_config = ClientConfig::new(
            config.weather.api_key.clone(),
            config.weather.api_endpoint.clone(),
        )
        .with_default_location(
            config.weather.default_city.clone(),
            config.weather.default_country_code.clone(),
        );

        let fetcher =
            WeatherFetcher::new(client_config, cache).context("Failed to create HTTP client")?;

        let lookup = Self::new(validator, CountryDirectory::bundled(), fetcher);
        match lookup.validate_defaults() {
            Ok(result) => {
                if let Some(problem) = result.problem() {
                    tracing::warn!("Configured default location rejected: {}", problem);
                }
            }
            Err(e) => tracing::warn!("Configured default location rejected: {}", e),
        }
        Ok(lookup)
    }

    /// Validate `city` (and the country named by `country_code`).
    pub fn validate(
        &self,
        city: Option<&str>,
        country_code: Option<&str>,
    ) -> Result<ValidationResult, AppError> {
        let country = self.country_name(country_code)?;
        Ok(self.validator.validate(city, country))
    }

    /// Validate the configured default city and country code.
    pub fn validate_defaults(&self) -> Result<ValidationResult, AppError> {
        let (city, code) = self.effective_location(None, None);
        self.validate(city, code)
    }

    /// The city and code a lookup asks for: the caller's city, or else the
    /// configured default city with the caller's code or the default code.
    pub fn effective_location<'a>(
        &'a self,
        city: Option<&'a str>,
        country_code: Option<&'a str>,
    ) -> (Option<&'a str>, Option<&'a str>) {
        let country_code = country_code.filter(|c| !c.is_empty());
        if let Some(city) = city.filter(|c| !c.is_empty()) {
            return (Some(city), country_code);
        }

        let defaults = self.fetcher.config();
        match defaults.default_city.as_deref().filter(|c| !c.is_empty()) {
            Some(city) => (
                Some(city),
                country_code.or(defaults
                    .default_country_code
                    .as_deref()
                    .filter(|c| !c.is_empty())),
            ),
            None => (None, None),
        }
    }

    /// Validate, and fetch weather only when the location is recognized.
    ///
    /// With no city the configured default location is validated and used.
    pub async fn lookup(
        &self,
        city: Option<&str>,
        country_code: Option<&str>,
    ) -> Result<LookupOutcome, AppError> {
        let city = city.filter(|c| !c.is_empty());
        let country_code = country_code.filter(|c| !c.is_empty());
        let (location, location_code) = self.effective_location(city, country_code);

        let validation = self.validate(location, location_code)?;
        if let Some(problem) = validation.problem() {
            tracing::debug!(?validation, "Location not recognized");
            return Ok(LookupOutcome::Invalid(problem));
        }

        let location = location.unwrap_or_default().to_string();

        match self
            .fetcher
            .fetch_weather(city, country_code)
            .await
            .map_err(|e| from_fetch_error(e, &location))?
        {
            WeatherOutcome::Disabled => Ok(LookupOutcome::Disabled),
            WeatherOutcome::NoLocation => Err(AppError::Weather(WeatherError::NoLocation)),
            WeatherOutcome::Reading(reading) => Ok(LookupOutcome::Weather(reading)),
        }
    }

    /// Turn a validation problem into an error carrying the inputs.
    pub fn problem_error(
        &self,
        problem: ValidationProblem,
        city: &str,
        country_code: Option<&str>,
    ) -> AppError {
        let country = country_code.and_then(|code| self.countries.name_for(code));
        from_validation_problem(problem, city, country)
    }

    /// Dataset country name for an ISO code, if known.
    pub fn country_label(&self, country_code: &str) -> Option<&str> {
        self.countries.name_for(country_code)
    }

    fn country_name(&self, country_code: Option<&str>) -> Result<Option<&str>, AppError> {
        match country_code.filter(|c| !c.is_empty()) {
            None => Ok(None),
            Some(code) => self
                .countries
                .name_for(code)
                .map(Some)
                .ok_or_else(|| AppError::Gazetteer(GazetteerError::UnknownCountryCode(code.to_string()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use skycheck_gazetteer::{Presence, StaticSource};
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn lookup_with(api_key: Option<&str>, endpoint: String) -> WeatherLookup {
        lookup_with_defaults(api_key, endpoint, Some("London"), Some("GB"))
    }

    fn lookup_with_defaults(
        api_key: Option<&str>,
        endpoint: String,
        default_city: Option<&str>,
        default_code: Option<&str>,
    ) -> WeatherLookup {
        let validator = GazetteerValidator::new(StaticSource::from_iter([
            ("Paris", "France"),
            ("London", "United Kingdom"),
        ]));
        let countries = CountryDirectory::from_pairs([("FR", "France"), ("GB", "United Kingdom")]);
        let config = ClientConfig::new(api_key.map(str::to_string), endpoint)
            .with_default_location(
                default_city.map(str::to_string),
                default_code.map(str::to_string),
            );
        let fetcher = WeatherFetcher::new(config, Arc::new(MemoryCache::new())).unwrap();
        WeatherLookup::new(validator, countries, fetcher)
    }

    #[tokio::test]
    async fn test_unknown_city_is_not_fetched() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let lookup = lookup_with(Some("key"), server.uri());
        assert_eq!(
            lookup.lookup(Some("Atlantis"), None).await.unwrap(),
            LookupOutcome::Invalid(ValidationProblem::NoSuchCity)
        );
        assert_eq!(
            lookup.lookup(Some("Paris"), Some("GB")).await.unwrap(),
            LookupOutcome::Invalid(ValidationProblem::NoSuchCityInCountry)
        );
    }

    #[tokio::test]
    async fn test_recognized_city_is_fetched() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "Paris,fr"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"main": {"temp": 18.0, "humidity": 60}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let lookup = lookup_with(Some("key"), server.uri());
        match lookup.lookup(Some("paris"), Some("fr")).await.unwrap() {
            LookupOutcome::Weather(reading) => assert_eq!(reading.temperature(), Some(18.0)),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_defaults_used_without_city() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "London,gb"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"main": {"temp": 9.5, "humidity": 88}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let lookup = lookup_with(Some("key"), server.uri());
        let outcome = lookup.lookup(None, None).await.unwrap();
        assert!(matches!(outcome, LookupOutcome::Weather(_)));
    }

    #[tokio::test]
    async fn test_unknown_default_city_is_not_fetched() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let lookup = lookup_with_defaults(Some("key"), server.uri(), Some("Atlantis"), None);
        assert_eq!(
            lookup.validate_defaults().unwrap().problem(),
            Some(ValidationProblem::NoSuchCity)
        );
        assert_eq!(
            lookup.lookup(None, None).await.unwrap(),
            LookupOutcome::Invalid(ValidationProblem::NoSuchCity)
        );

        let lookup = lookup_with_defaults(Some("key"), server.uri(), Some("Paris"), Some("GB"));
        assert_eq!(
            lookup.lookup(None, None).await.unwrap(),
            LookupOutcome::Invalid(ValidationProblem::NoSuchCityInCountry)
        );
    }

    #[test]
    fn test_effective_location() {
        let lookup = lookup_with(Some("key"), "http://127.0.0.1:9".into());
        assert_eq!(lookup.effective_location(Some("Paris"), None), (Some("Paris"), None));
        assert_eq!(lookup.effective_location(None, None), (Some("London"), Some("GB")));
        assert_eq!(lookup.effective_location(Some(""), Some("fr")), (Some("London"), Some("fr")));

        let lookup = lookup_with_defaults(Some("key"), "http://127.0.0.1:9".into(), None, Some("GB"));
        assert_eq!(lookup.effective_location(None, Some("fr")), (None, None));
        assert_eq!(lookup.validate_defaults().unwrap(), ValidationResult::not_given());
    }

    #[tokio::test]
    async fn test_no_default_city_is_no_location() {
        let lookup = lookup_with_defaults(Some("key"), "http://127.0.0.1:9".into(), None, None);
        let err = lookup.lookup(None, None).await.unwrap_err();
        assert!(matches!(err, AppError::Weather(WeatherError::NoLocation)));
    }

    #[tokio::test]
    async fn test_disabled_without_key() {
        let lookup = lookup_with(None, "http://127.0.0.1:9".into());
        assert_eq!(
            lookup.lookup(Some("Paris"), None).await.unwrap(),
            LookupOutcome::Disabled
        );
    }

    #[tokio::test]
    async fn test_upstream_failure_maps_to_app_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"cod": "404"})))
            .mount(&server)
            .await;

        let lookup = lookup_with(Some("key"), server.uri());
        let err = lookup.lookup(Some("London"), None).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Weather(WeatherError::LocationNotFound(ref c)) if c == "London"
        ));
    }

    #[test]
    fn test_unknown_country_code() {
        let lookup = lookup_with(Some("key"), "http://127.0.0.1:9".into());
        let err = lookup.validate(Some("Paris"), Some("ZZ")).unwrap_err();
        assert!(matches!(
            err,
            AppError::Gazetteer(GazetteerError::UnknownCountryCode(_))
        ));
    }

    #[test]
    fn test_validate_resolves_country_names() {
        let lookup = lookup_with(Some("key"), "http://127.0.0.1:9".into());
        let result = lookup.validate(Some("London"), Some("gb")).unwrap();
        assert_eq!(result, ValidationResult::new(Presence::Found, Presence::Found));

        let err = lookup.problem_error(ValidationProblem::NoSuchCityInCountry, "Paris", Some("GB"));
        assert!(err.to_string().contains("United Kingdom"));
        assert_eq!(lookup.country_label("fr"), Some("France"));
        assert_eq!(lookup.country_label("ZZ"), None);
    }

    #[test]
    fn test_from_config_with_sqlite_cache() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.config_dir = dir.path().to_path_buf();
        config.cache.backend = CacheBackendKind::Sqlite;

        let lookup = WeatherLookup::from_config(&config).unwrap();
        assert!(!lookup.fetcher.is_enabled());
        assert!(dir.path().join("weather_cache.db").exists());
    }
}
