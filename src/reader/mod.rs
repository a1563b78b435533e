//! Record stream reader
//!
//! Reads the flat city records of a large JSON array file one at a time.
//!
//! # Overview
//!
//! - `RecordSource` - a re-openable input file
//! - `RecordStream` - lazy iterator yielding `Result<CityRecord>`
//! - `CityRecord` - one element, with loosely typed values normalized

mod stream;
mod types;

pub use stream::{RecordSource, RecordStream};
pub use types::{CityRecord, REQUIRED_FIELDS};
