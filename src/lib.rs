// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::needless_pass_by_value)]

//! # geoload
//!
//! Streaming importer for the countries/states/cities dataset.
//!
//! A JSON array of flat city records is read one element at a time, split
//! into country, state and city rows, and written to DuckDB in batches.
//! Cities go through a staging table that is promoted once the stream is
//! exhausted. A count query per (country, state) is exported as CSV.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use geoload::config::{DatabaseSettings, ImportSettings, ReportSettings};
//! use geoload::database::DuckDbGateway;
//! use geoload::export::export_city_count;
//! use geoload::import::ImportPipeline;
//! use geoload::reader::RecordSource;
//!
//! fn main() -> geoload::Result<()> {
//!     let settings = ImportSettings::default().with_data_path("data/cities.json");
//!     let source = RecordSource::new(&settings.data_path);
//!
//!     DuckDbGateway::scoped(&DatabaseSettings::file("cities.duckdb"), |db| {
//!         ImportPipeline::new(&mut *db, settings).run(&source)?;
//!         let report = export_city_count(db, &ReportSettings::default())?;
//!         println!("{}", report.count.summary_line());
//!         Ok(())
//!     })
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! cities.json ──► reader ──► import::splitter ──► import::batch ──► database
//!                 (stream)   (country/state/city)  (accumulators)     │
//!                                                                      ▼
//!                   CSV ◄── export ◄── count query ◄── promote cities_tmp
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// YAML configuration sections
pub mod config;

/// Tracing setup and stage timing
pub mod logging;

/// DuckDB gateway and schema
pub mod database;

/// Streaming JSON array reader
pub mod reader;

/// Split, batch and promote
pub mod import;

/// Count query and CSV export
pub mod export;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
