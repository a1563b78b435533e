//! Configuration loading
//!
//! Settings live in a YAML file whose top-level keys are sections:
//!
//! ```yaml
//! duckdb:
//!   path: cities.duckdb
//!   threads: 4
//! import:
//!   data_path: data/cities.json
//!   batch_size: 10000
//! report:
//!   country: Poland
//!   state: Masovian Voivodeship
//! ```
//!
//! `load_section` returns one section as a flat string mapping; the typed
//! settings structs are built from those mappings.

use crate::error::{Error, Result};
use serde_yaml::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Default number of rows accumulated per entity before a flush
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// Section holding the database connection settings
pub const DATABASE_SECTION: &str = "duckdb";

/// Section holding the import settings
pub const IMPORT_SECTION: &str = "import";

/// Section holding the report settings
pub const REPORT_SECTION: &str = "report";

// ============================================================================
// Section Loader
// ============================================================================

/// Load one section of a YAML config file as a string mapping
///
/// Scalar values are stringified; nested values are rejected. Fails if the
/// file cannot be read or the section is absent.
pub fn load_section(path: impl AsRef<Path>, section: &str) -> Result<HashMap<String, String>> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::FileNotFound {
                path: path.display().to_string(),
            }
        } else {
            Error::config(format!("Failed to read {}: {e}", path.display()))
        }
    })?;

    section_from_str(&contents, section)
        .map_err(|e| match e {
            Error::MissingSection { section, .. } => {
                Error::missing_section(path.display().to_string(), section)
            }
            other => other,
        })
}

/// Load an optional section; an absent section yields an empty mapping
pub fn load_optional_section(
    path: impl AsRef<Path>,
    section: &str,
) -> Result<HashMap<String, String>> {
    match load_section(path, section) {
        Err(Error::MissingSection { .. }) => Ok(HashMap::new()),
        other => other,
    }
}

/// Parse one section out of YAML text
pub fn section_from_str(yaml: &str, section: &str) -> Result<HashMap<String, String>> {
    let root: Value = serde_yaml::from_str(yaml)?;

    let Some(body) = root.get(section) else {
        return Err(Error::missing_section("<inline>", section));
    };

    let mapping = match body {
        Value::Mapping(m) => m,
        // `section:` with no keys
        Value::Null => return Ok(HashMap::new()),
        _ => {
            return Err(Error::config(format!(
                "Section '{section}' must be a mapping"
            )))
        }
    };

    let mut values = HashMap::with_capacity(mapping.len());
    for (key, value) in mapping {
        let key = scalar_to_string(key)
            .ok_or_else(|| Error::config(format!("Non-scalar key in section '{section}'")))?;
        let value = scalar_to_string(value).ok_or_else(|| {
            Error::invalid_value(key.clone(), "nested values are not supported")
        })?;
        values.insert(key, value);
    }

    Ok(values)
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        _ => None,
    }
}

fn parse_positive(values: &HashMap<String, String>, key: &str) -> Result<Option<usize>> {
    let Some(raw) = values.get(key) else {
        return Ok(None);
    };
    let parsed: usize = raw
        .trim()
        .parse()
        .map_err(|e| Error::invalid_value(key, format!("'{raw}' is not a count: {e}")))?;
    if parsed == 0 {
        return Err(Error::invalid_value(key, "must be greater than zero"));
    }
    Ok(Some(parsed))
}

// ============================================================================
// Database Settings
// ============================================================================

/// Connection settings for the DuckDB gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    /// Database file, or `:memory:`
    pub path: String,
    /// Extra DuckDB configuration options passed through verbatim
    pub options: Vec<(String, String)>,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: ":memory:".to_string(),
            options: Vec::new(),
        }
    }
}

impl DatabaseSettings {
    /// In-memory database with no extra options
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Database stored in the given file
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            options: Vec::new(),
        }
    }

    /// Build from a loaded `duckdb` section
    pub fn from_section(mut values: HashMap<String, String>) -> Self {
        let path = values
            .remove("path")
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| ":memory:".to_string());

        let mut options: Vec<(String, String)> = values.into_iter().collect();
        // HashMap order is random; keep the option order stable for logging
        options.sort();

        Self { path, options }
    }

    /// Load the required `duckdb` section from a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_section(path, DATABASE_SECTION).map(Self::from_section)
    }

    /// Add a DuckDB option
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.push((key.into(), value.into()));
        self
    }

    /// Whether the database lives only in memory
    pub fn is_in_memory(&self) -> bool {
        self.path == ":memory:"
    }
}

// ============================================================================
// Import Settings
// ============================================================================

/// Settings for the streaming import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSettings {
    /// Input JSON array file
    pub data_path: PathBuf,
    /// Flush threshold for the city accumulator
    pub city_batch_size: usize,
    /// Flush threshold for the state accumulator
    pub state_batch_size: usize,
    /// Flush threshold for the country accumulator
    pub country_batch_size: usize,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data").join("cities.json"),
            city_batch_size: DEFAULT_BATCH_SIZE,
            state_batch_size: DEFAULT_BATCH_SIZE,
            country_batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl ImportSettings {
    /// Build from a loaded `import` section
    ///
    /// `batch_size` sets all three thresholds; the per-entity keys override it.
    pub fn from_section(values: &HashMap<String, String>) -> Result<Self> {
        let mut settings = Self::default();

        if let Some(path) = values.get("data_path").filter(|p| !p.is_empty()) {
            settings.data_path = PathBuf::from(path);
        }
        if let Some(size) = parse_positive(values, "batch_size")? {
            settings = settings.with_batch_size(size);
        }
        if let Some(size) = parse_positive(values, "city_batch_size")? {
            settings.city_batch_size = size;
        }
        if let Some(size) = parse_positive(values, "state_batch_size")? {
            settings.state_batch_size = size;
        }
        if let Some(size) = parse_positive(values, "country_batch_size")? {
            settings.country_batch_size = size;
        }

        Ok(settings)
    }

    /// Load the optional `import` section from a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_section(&load_optional_section(path, IMPORT_SECTION)?)
    }

    /// Set the input path
    #[must_use]
    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = path.into();
        self
    }

    /// Set the same flush threshold for every entity
    #[must_use]
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.city_batch_size = size;
        self.state_batch_size = size;
        self.country_batch_size = size;
        self
    }
}

// ============================================================================
// Report Settings
// ============================================================================

/// Settings for the city-count report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSettings {
    /// Country name to filter on
    pub country: String,
    /// State or province name to filter on
    pub state: String,
    /// Directory receiving the CSV file
    pub output_dir: PathBuf,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            country: "Poland".to_string(),
            state: "Masovian Voivodeship".to_string(),
            output_dir: PathBuf::from("."),
        }
    }
}

impl ReportSettings {
    /// Build from a loaded `report` section
    pub fn from_section(values: &HashMap<String, String>) -> Self {
        let mut settings = Self::default();
        if let Some(country) = values.get("country") {
            settings.country.clone_from(country);
        }
        if let Some(state) = values.get("state") {
            settings.state.clone_from(state);
        }
        if let Some(dir) = values.get("output_dir").filter(|d| !d.is_empty()) {
            settings.output_dir = PathBuf::from(dir);
        }
        settings
    }

    /// Load the optional `report` section from a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from_section(&load_optional_section(
            path,
            REPORT_SECTION,
        )?))
    }
}
