//! Dataset loading errors.

use thiserror::Error;

/// Why a dataset could not be loaded. Validation itself never fails;
/// these only surface from `DatasetSource::load`.
#[derive(Error, Debug)]
pub enum GazetteerError {
    #[error("Failed to read dataset {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed dataset: {0}")]
    Parse(#[from] serde_json::Error),
}
