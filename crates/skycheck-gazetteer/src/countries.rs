//! ISO 3166-1 alpha-2 codes to the country names used by the city dataset.

use std::collections::HashMap;

const BUNDLED_COUNTRIES: &str = include_str!("../data/countries.json");

#[derive(Debug, Clone, Default)]
pub struct CountryDirectory {
    /// upper-case code -> name
    names: HashMap<String, String>,
}

impl CountryDirectory {
    /// Directory from the bundled code table. An unreadable table yields an
    /// empty directory.
    pub fn bundled() -> Self {
        match serde_json::from_str::<HashMap<String, String>>(BUNDLED_COUNTRIES) {
            Ok(names) => Self::from_pairs(names),
            Err(e) => {
                tracing::warn!("Country table unavailable: {}", e);
                Self::default()
            }
        }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let names = pairs
            .into_iter()
            .map(|(code, name)| (code.as_ref().to_uppercase(), name.into()))
            .collect();
        Self { names }
    }

    /// Country name for `code`, case-insensitive.
    pub fn name_for(&self, code: &str) -> Option<&str> {
        self.names.get(&code.to_uppercase()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
