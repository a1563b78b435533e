//! Streaming import
//!
//! # Overview
//!
//! - `split_record` - one input record to country/state/city tuples
//! - `Accumulator` / `BatchFlusher` - per-entity buffers flushed as bulk inserts
//! - `promote_staged_cities` - staging table to final `cities` table
//! - `ImportPipeline` - the phase machine tying the stages together
//!
//! Cities are staged in `cities_tmp`, which has no foreign keys, because
//! states and countries are still being loaded while cities stream in.

mod batch;
mod pipeline;
mod promoter;
mod splitter;

pub use batch::{Accumulator, BatchFlusher, EntityStats, FlushStats};
pub use pipeline::{ImportPhase, ImportPipeline, ImportSummary};
pub use promoter::promote_staged_cities;
pub use splitter::{split_record, CityRow, CountryRow, SplitRecord, StateRow, TableRow};

#[cfg(test)]
mod tests;
