//! City/country validation for skycheck.
//!
//! Answers "is this city (optionally, in this country) a real place?"
//! against a reference list of world cities, and maps ISO country codes to
//! the country names that list uses.

pub mod countries;
pub mod error;
pub mod source;
pub mod types;
pub mod validator;

pub use countries::CountryDirectory;
pub use error::GazetteerError;
pub use source::{BundledSource, DatasetSource, JsonFileSource, StaticSource};
pub use types::{GazetteerRecord, Presence, ValidationProblem, ValidationResult};
pub use validator::GazetteerValidator;
