//! Where the city dataset comes from.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::GazetteerError;
use crate::types::GazetteerRecord;

const BUNDLED_CITIES: &str = include_str!("../data/world-cities.json");

/// Loader for an ordered list of city records.
///
/// Called at most once per validator.
pub trait DatasetSource: Send + Sync {
    fn load(&self) -> Result<Vec<GazetteerRecord>, GazetteerError>;

    /// Short description for logs.
    fn describe(&self) -> String;
}

/// JSON array of `{ "name": ..., "country": ... }` objects on disk.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl DatasetSource for JsonFileSource {
    fn load(&self) -> Result<Vec<GazetteerRecord>, GazetteerError> {
        let content = std::fs::read_to_string(&self.path).map_err(|source| GazetteerError::Io {
            path: self.path.display().to_string(),
            source,
        })?;
        parse_records(&content)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// The world cities list compiled into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledSource;

impl DatasetSource for BundledSource {
    fn load(&self) -> Result<Vec<GazetteerRecord>, GazetteerError> {
        parse_records(BUNDLED_CITIES)
    }

    fn describe(&self) -> String {
        "bundled world cities".to_string()
    }
}

/// Records held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    records: Vec<GazetteerRecord>,
}

impl StaticSource {
    pub fn new(records: Vec<GazetteerRecord>) -> Self {
        Self { records }
    }
}

impl FromIterator<(&'static str, &'static str)> for StaticSource {
    fn from_iter<I: IntoIterator<Item = (&'static str, &'static str)>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(name, country)| GazetteerRecord::new(name, country))
                .collect(),
        )
    }
}

impl DatasetSource for StaticSource {
    fn load(&self) -> Result<Vec<GazetteerRecord>, GazetteerError> {
        Ok(self.records.clone())
    }

    fn describe(&self) -> String {
        format!("{} in-memory records", self.records.len())
    }
}

fn parse_records(content: &str) -> Result<Vec<GazetteerRecord>, GazetteerError> {
    // An empty file is an empty dataset, not a parse error.
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    let values: Vec<Value> = serde_json::from_str(content)?;
    let records: Vec<_> = values.iter().filter_map(record_from_value).collect();
    if records.len() < values.len() {
        tracing::debug!(
            "Skipped {} malformed city records",
            values.len() - records.len()
        );
    }
    Ok(records)
}

/// `name` and `country` must both be strings; anything else is dropped.
fn record_from_value(value: &Value) -> Option<GazetteerRecord> {
    let name = value.get("name")?.as_str()?;
    let country = value.get("country")?.as_str()?;
    Some(GazetteerRecord::new(name, country))
}
