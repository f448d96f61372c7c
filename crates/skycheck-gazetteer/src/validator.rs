//! City/country membership queries over a lazily loaded dataset.

use std::collections::HashMap;

use once_cell::sync::OnceCell;
use tracing::instrument;

use crate::source::{BundledSource, DatasetSource};
use crate::types::{GazetteerRecord, Presence, ValidationResult};

/// Lower-cased lookup tables built from the dataset.
#[derive(Debug, Default)]
struct CityIndex {
    /// city -> countries it appears in, in dataset order
    cities: HashMap<String, Vec<String>>,
}

impl CityIndex {
    fn build(records: Vec<GazetteerRecord>) -> Self {
        let mut index = Self::default();
        for record in records.into_iter().filter(GazetteerRecord::is_usable) {
            let country = record.country.to_lowercase();
            let countries = index.cities.entry(record.name.to_lowercase()).or_default();
            if !countries.contains(&country) {
                countries.push(country);
            }
        }
        index
    }

    fn has_city(&self, city: &str) -> bool {
        self.cities.contains_key(city)
    }

    fn has_city_in(&self, city: &str, country: &str) -> bool {
        self.cities
            .get(city)
            .is_some_and(|countries| countries.iter().any(|c| c == country))
    }
}

/// Answers whether a city (optionally in a given country) exists.
///
/// The dataset is loaded on the first query and kept for the validator's
/// lifetime. If loading fails the dataset is treated as empty, so every
/// supplied input comes back `NotFound`.
pub struct GazetteerValidator {
    source: Box<dyn DatasetSource>,
    index: OnceCell<CityIndex>,
}

impl GazetteerValidator {
    pub fn new(source: impl DatasetSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            index: OnceCell::new(),
        }
    }

    /// Validator over the bundled world cities list.
    pub fn bundled() -> Self {
        Self::new(BundledSource)
    }

    fn index(&self) -> &CityIndex {
        self.index.get_or_init(|| match self.source.load() {
            Ok(records) => {
                let index = CityIndex::build(records);
                tracing::debug!(
                    "Loaded {} distinct cities from {}",
                    index.cities.len(),
                    self.source.describe()
                );
                index
            }
            Err(e) => {
                tracing::warn!(
                    "City dataset unavailable ({}): {}",
                    self.source.describe(),
                    e
                );
                CityIndex::default()
            }
        })
    }

    /// Look up a city, optionally qualified by country name.
    ///
    /// Comparison is case-insensitive. Empty strings count as not given.
    /// A country on its own is never looked up and always comes back
    /// `NotFound`; only a city can anchor a match.
    #[instrument(skip(self), level = "debug")]
    pub fn validate(&self, city: Option<&str>, country: Option<&str>) -> ValidationResult {
        let city = normalize(city);
        let country = normalize(country);
        let index = self.index();

        match (city, country) {
            (None, None) => ValidationResult::not_given(),
            (Some(city), Some(country)) => {
                let found = Presence::from_match(index.has_city_in(&city, &country));
                ValidationResult::new(found, found)
            }
            (Some(city), None) => {
                ValidationResult::new(Presence::from_match(index.has_city(&city)), Presence::NotGiven)
            }
            (None, Some(_)) => ValidationResult::new(Presence::NotGiven, Presence::NotFound),
        }
    }

    /// Number of distinct city names loaded (triggers the load).
    pub fn city_count(&self) -> usize {
        self.index().cities.len()
    }
}

impl Default for GazetteerValidator {
    fn default() -> Self {
        Self::bundled()
    }
}

fn normalize(input: Option<&str>) -> Option<String> {
    input.filter(|s| !s.is_empty()).map(str::to_lowercase)
}
