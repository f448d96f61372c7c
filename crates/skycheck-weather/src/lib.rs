//! Weather service for skycheck
//!
//! Fetches current conditions for a city from an OpenWeatherMap-style API and
//! keeps each response for a short time in a pluggable cache backend.

pub mod cache;
pub mod clock;
pub mod provider;
pub mod sqlite_cache;
pub mod types;

pub use cache::{CacheBackend, CacheEntry, CacheError, MemoryCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use provider::{cache_key, WeatherFetcher};
pub use sqlite_cache::SqliteCache;
pub use types::*;
