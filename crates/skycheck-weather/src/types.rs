use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Cache key suffix used when a lookup has no country code.
pub const NO_CODE_SENTINEL: &str = "no_code";

/// How long a fetched response stays in the cache.
pub const CACHE_TTL_SECS: i64 = 90;

/// Upper bound on a single upstream request.
pub const REQUEST_TIMEOUT_SECS: u64 = 9;

/// Settings the fetcher needs, fixed at construction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    pub api_key: Option<String>,
    pub api_endpoint: String,
    pub default_city: Option<String>,
    pub default_country_code: Option<String>,
}

impl ClientConfig {
    pub fn new(api_key: Option<String>, api_endpoint: impl Into<String>) -> Self {
        Self {
            api_key,
            api_endpoint: api_endpoint.into(),
            default_city: None,
            default_country_code: None,
        }
    }

    pub fn with_default_location(
        mut self,
        city: Option<String>,
        country_code: Option<String>,
    ) -> Self {
        self.default_city = city;
        self.default_country_code = country_code;
        self
    }

    /// The API key, if one is set and non-blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }
}

/// Raw upstream response. Only a few fields are interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeatherReading {
    payload: Value,
}

impl WeatherReading {
    pub fn from_payload(payload: Value) -> Self {
        Self { payload }
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn into_payload(self) -> Value {
        self.payload
    }

    /// True for an empty body (`null`, `""` or `{}`).
    pub fn is_empty(&self) -> bool {
        is_empty_payload(&self.payload)
    }

    /// `main.temp`, in the unit requested (metric: °C).
    pub fn temperature(&self) -> Option<f64> {
        self.payload.pointer("/main/temp").and_then(Value::as_f64)
    }

    /// `main.humidity`, percent.
    pub fn humidity(&self) -> Option<f64> {
        self.payload.pointer("/main/humidity").and_then(Value::as_f64)
    }

    /// `wind.speed`, m/s for metric.
    pub fn wind_speed(&self) -> Option<f64> {
        self.payload.pointer("/wind/speed").and_then(Value::as_f64)
    }

    /// Typed view of the fields above; `None` unless both temperature and
    /// humidity are present.
    pub fn current(&self) -> Option<CurrentConditions> {
        let response: OwmResponse = serde_json::from_value(self.payload.clone()).ok()?;
        Some(CurrentConditions {
            temperature: response.main.temp,
            humidity: response.main.humidity,
            wind_speed: response.wind.and_then(|w| w.speed),
        })
    }
}

pub(crate) fn is_empty_payload(payload: &Value) -> bool {
    match payload {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

#[derive(Debug, Deserialize)]
struct OwmResponse {
    main: OwmMain,
    wind: Option<OwmWind>,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct OwmWind {
    speed: Option<f64>,
}

/// Current conditions read from a `WeatherReading`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temperature: f64,
    pub humidity: f64,
    pub wind_speed: Option<f64>,
}

impl std::fmt::Display for CurrentConditions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Temp: {}\nHumidity: {}", self.temperature, self.humidity)?;
        if let Some(speed) = self.wind_speed {
            write!(f, "\nWind: {}", speed)?;
        }
        Ok(())
    }
}

/// What `WeatherFetcher::fetch_weather` produced when it didn't fail.
#[derive(Debug, Clone, PartialEq)]
pub enum WeatherOutcome {
    /// No API key configured; nothing was attempted.
    Disabled,
    /// No city given and no default city configured.
    NoLocation,
    Reading(WeatherReading),
}

impl WeatherOutcome {
    pub fn reading(&self) -> Option<&WeatherReading> {
        match self {
            Self::Reading(r) => Some(r),
            _ => None,
        }
    }
}

/// Weather fetch failures. None of these are cached.
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Weather API returned {status}: {body}")]
    UpstreamStatus { status: u16, body: String },
    #[error("Malformed weather response: {0}")]
    MalformedResponse(String),
}

impl WeatherError {
    /// Whether the same request might succeed later.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::UpstreamStatus { status, .. } => *status >= 500 || *status == 429,
            Self::MalformedResponse(_) => false,
        }
    }
}
