//! Error types for the term-expect data quality context.
//!
//! All fallible operations return [`Result`], whose error type is the
//! `thiserror`-derived [`TermError`]. Expectation violations are never errors:
//! they are reported through `success = false` on the validation result.

use thiserror::Error;

/// The main error type for term-expect.
#[derive(Error, Debug)]
pub enum TermError {
    /// A named object (datasource, asset, batch definition, suite, stored
    /// result) already exists and a strict `add` was requested.
    #[error("{kind} '{name}' already exists")]
    AlreadyExists {
        /// Kind of object, e.g. "datasource" or "expectation suite"
        kind: &'static str,
        /// Name of the object
        name: String,
    },

    /// A named object was looked up but is not registered.
    #[error("{kind} '{name}' not found")]
    NotFound {
        /// Kind of object, e.g. "datasource" or "expectation suite"
        kind: &'static str,
        /// Name of the object
        name: String,
    },

    /// Error that occurs when an expectation cannot be evaluated.
    #[error("Expectation evaluation failed for '{expectation}': {message}")]
    ExpectationEvaluation {
        /// Type of the expectation that failed to evaluate
        expectation: String,
        /// Detailed error message
        message: String,
    },

    /// Error from DataFusion operations.
    #[error("DataFusion error: {0}")]
    DataFusion(#[from] datafusion::error::DataFusionError),

    /// Error from Arrow operations.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error from data source operations.
    #[error("Data source error: {message}")]
    DataSource {
        /// Type of data source (e.g., "CSV", "Parquet", "DataFrame")
        source_type: String,
        /// Detailed error message
        message: String,
        /// Optional underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Error from I/O operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error related to configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Error from serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Error when a required column is not found in the batch.
    #[error("Column '{column}' not found in dataset")]
    ColumnNotFound { column: String },

    /// Generic internal error for unexpected conditions.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Security-related error.
    #[error("Security error: {0}")]
    SecurityError(String),
}

/// A type alias for `Result<T, TermError>`.
pub type Result<T> = std::result::Result<T, TermError>;

impl TermError {
    /// Creates a new already-exists error.
    pub fn already_exists(kind: &'static str, name: impl Into<String>) -> Self {
        Self::AlreadyExists {
            kind,
            name: name.into(),
        }
    }

    /// Creates a new not-found error.
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Creates a new data source error.
    pub fn data_source(source_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DataSource {
            source_type: source_type.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new data source error with a source error.
    pub fn data_source_with_source(
        source_type: impl Into<String>,
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::DataSource {
            source_type: source_type.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    /// Creates a new expectation evaluation error.
    pub fn expectation_evaluation(
        expectation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ExpectationEvaluation {
            expectation: expectation.into(),
            message: message.into(),
        }
    }

    /// Returns true for the "named object missing" condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, TermError::NotFound { .. })
    }

    /// Returns true for the "named object already exists" condition.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, TermError::AlreadyExists { .. })
    }
}

impl From<serde_json::Error> for TermError {
    fn from(err: serde_json::Error) -> Self {
        TermError::Serialization(err.to_string())
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, msg: &str) -> Result<T>;

    /// Adds context with a lazy message.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<TermError>,
{
    fn context(self, msg: &str) -> Result<T> {
        self.with_context(|| msg.to_string())
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let msg = f();
            match e.into() {
                TermError::Internal(inner) => TermError::Internal(format!("{msg}: {inner}")),
                TermError::Io(io) => {
                    TermError::Io(std::io::Error::new(io.kind(), format!("{msg}: {io}")))
                }
                other => TermError::Internal(format!("{msg}: {other}")),
            }
        })
    }
}
