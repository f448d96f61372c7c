use serde::{Deserialize, Serialize};

/// One city of the reference dataset.
///
/// Dataset files carry more fields (`subcountry`, `geonameid`); only these two
/// are read. Records with an empty name or country are skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GazetteerRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub country: String,
}

impl GazetteerRecord {
    pub fn new(name: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            country: country.into(),
        }
    }

    /// Records without a name or a country never match anything.
    pub fn is_usable(&self) -> bool {
        !self.name.is_empty() && !self.country.is_empty()
    }
}

/// Outcome of looking up one input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    /// The input was supplied and matched.
    Found,
    /// The input was supplied and did not match.
    NotFound,
    /// The input was empty, so nothing was looked up.
    NotGiven,
}

impl Presence {
    pub fn from_match(found: bool) -> Self {
        if found {
            Self::Found
        } else {
            Self::NotFound
        }
    }

    pub fn is_found(self) -> bool {
        self == Self::Found
    }
}

/// Result of `GazetteerValidator::validate`.
///
/// When both a city and a country are given they are matched together: the
/// result is either found/found or not-found/not-found. A city that exists
/// but in another country is reported the same as a city that doesn't exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub city: Presence,
    pub country: Presence,
}

impl ValidationResult {
    pub const fn new(city: Presence, country: Presence) -> Self {
        Self { city, country }
    }

    pub const fn not_given() -> Self {
        Self::new(Presence::NotGiven, Presence::NotGiven)
    }

    /// The problem to report to the user, if any.
    pub fn problem(&self) -> Option<ValidationProblem> {
        match (self.city, self.country) {
            (Presence::NotFound, Presence::NotFound) => Some(ValidationProblem::NoSuchCityInCountry),
            (Presence::NotFound, _) => Some(ValidationProblem::NoSuchCity),
            _ => None,
        }
    }

    /// True unless the city was given and not found.
    pub fn is_recognized(&self) -> bool {
        self.problem().is_none()
    }
}

/// What went wrong with a city/country pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationProblem {
    NoSuchCity,
    NoSuchCityInCountry,
}

impl ValidationProblem {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NoSuchCity => "There is no such city!",
            Self::NoSuchCityInCountry => "There is no such city in this country!",
        }
    }
}

impl std::fmt::Display for ValidationProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.user_message())
    }
}
