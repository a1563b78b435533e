//! Error types for geoload
//!
//! This module defines the error hierarchy for the whole importer.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use thiserror::Error;

/// The main error type for geoload
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Section '{section}' not found in the {path} file")]
    MissingSection { path: String, section: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    // ============================================================================
    // Input Errors
    // ============================================================================
    #[error("Parse error: {message}")]
    Parse { message: String },

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Database Errors
    // ============================================================================
    #[error("DDL statement failed ({statement}): {source}")]
    Ddl {
        statement: String,
        #[source]
        source: duckdb::Error,
    },

    #[error("Bulk insert of {rows} rows into '{table}' failed: {source}")]
    Insert {
        table: String,
        rows: usize,
        #[source]
        source: duckdb::Error,
    },

    #[error("Promotion of staged rows failed: {source}")]
    Promotion {
        #[source]
        source: duckdb::Error,
    },

    #[error("Query failed: {message}")]
    Query { message: String },

    #[error("Query returned no rows: {statement}")]
    EmptyResult { statement: String },

    #[error("Database error: {0}")]
    Database(#[from] duckdb::Error),

    // ============================================================================
    // Output Errors
    // ============================================================================
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Output error: {message}")]
    Output { message: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing section error
    pub fn missing_section(path: impl Into<String>, section: impl Into<String>) -> Self {
        Self::MissingSection {
            path: path.into(),
            section: section.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create a query error
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }

    /// Create an output error
    pub fn output(message: impl Into<String>) -> Self {
        Self::Output {
            message: message.into(),
        }
    }

    /// True for configuration failures, which abort before any database work
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Error::Config { .. }
                | Error::MissingSection { .. }
                | Error::InvalidConfigValue { .. }
                | Error::YamlParse(_)
        )
    }

    /// True for malformed input (structure or record)
    pub fn is_parse(&self) -> bool {
        matches!(self, Error::Parse { .. } | Error::JsonParse(_))
    }
}

/// Whether a DuckDB failure only reports that the object already exists
pub(crate) fn is_already_exists(err: &duckdb::Error) -> bool {
    err.to_string().contains("already exists")
}

/// Result type alias for geoload
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
