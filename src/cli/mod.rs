//! CLI module
//!
//! Command-line interface for the importer.
//!
//! # Commands
//!
//! - `import` - Create the schema and stream the input file into the database
//! - `count` - Count the cities of one state and export the result as CSV
//! - `run` - `import` followed by `count` with the configured report

mod commands;
mod runner;

pub use commands::{Cli, Commands};
pub use runner::{import_and_export, Runner};
