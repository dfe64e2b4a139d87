//! Error types for dpdk-bench
//!
//! Extraction never surfaces these to the sweep: each tool's parser is
//! contained and degrades to zero/`error` fields. Configuration and process
//! plumbing propagate them.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// dpdk-bench error types
#[derive(Error, Debug)]
pub enum Error {
    /// A required key is absent from the loaded key=value files
    #[error("Missing configuration value: {key} (expected in {file})\nAdd `{key}=...` or set MISSING_VALUE_POLICY=empty")]
    MissingConfig {
        /// Key that was looked up
        key: String,
        /// File the key is expected in
        file: String,
    },

    /// A key is present but its value cannot be interpreted
    #[error("Invalid configuration value for {key}: {value:?}")]
    InvalidConfig {
        /// Offending key
        key: String,
        /// Raw value as written in the file
        value: String,
    },

    /// Caller supplied an impossible parameter (e.g. zero worker cores)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Numeric conversion of a captured log field failed
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A shell command could not be spawned
    #[error("Command failed to start: {command}: {reason}")]
    CommandFailed {
        /// Command line handed to the shell
        command: String,
        /// Underlying spawn failure
        reason: String,
    },

    /// A log-scraping pattern failed to compile
    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error while writing trial records
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Wrap a failed numeric conversion of a captured field.
    pub(crate) fn parse(field: &str, raw: &str, err: impl std::fmt::Display) -> Self {
        Self::ParseError(format!("{field}: cannot convert {raw:?}: {err}"))
    }
}
