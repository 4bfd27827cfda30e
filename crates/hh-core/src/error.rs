//! Error types for hh-yields

use thiserror::Error;

/// hh-yields error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// Malformed configuration or a violated registry rule.
    ///
    /// `line` is 1-based and `0` when the problem is not tied to a single line.
    #[error("configuration error (line {line}): {message}")]
    Config {
        /// Source line (1-based), or 0.
        line: usize,
        /// Description of the problem.
        message: String,
    },

    /// A name in the signal list does not resolve to a loaded sample category.
    #[error("undefined signal category '{0}'")]
    UndefinedSignal(String),

    /// A required item (category, unique tag, histogram) could not be found.
    #[error("lookup error: {0}")]
    Lookup(String),

    /// `clone_into` targeted a key that already holds a histogram.
    #[error("histogram already exists: {0}")]
    DuplicateKey(String),

    /// Malformed or incompatible bin edges.
    #[error("binning error: {0}")]
    Binning(String),

    /// Control-region statistics are inconsistent with an estimator's assumptions.
    #[error("estimation failed for histogram '{histogram}' in {category}/{region}: {message}")]
    Estimation {
        /// Histogram name.
        histogram: String,
        /// Kinematic category name.
        category: String,
        /// Control region name.
        region: String,
        /// Numeric breakdown that produced the failure.
        message: String,
    },
}

impl Error {
    /// Configuration error tied to a source line.
    pub fn config(line: usize, message: impl Into<String>) -> Self {
        Error::Config { line, message: message.into() }
    }

    /// Configuration error for a whole-registry rule.
    pub fn config_rule(message: impl Into<String>) -> Self {
        Error::Config { line: 0, message: message.into() }
    }

    /// Whether the error is a fatal estimation-invariant violation.
    pub fn is_estimation(&self) -> bool {
        matches!(self, Error::Estimation { .. })
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
