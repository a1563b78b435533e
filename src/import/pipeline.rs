//! Import state machine
//!
//! `Idle -> SchemaEnsured -> Streaming -> Promoted -> Done`. Each step checks
//! the current phase so stages cannot run out of order.

use super::batch::{BatchFlusher, FlushStats};
use super::promoter::promote_staged_cities;
use super::splitter::split_record;
use crate::config::ImportSettings;
use crate::database::{ensure_schema, DatabaseGateway, SchemaReport};
use crate::error::{Error, Result};
use crate::logging::{timed, StageTimer};
use crate::reader::RecordSource;

/// Phase of one import run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportPhase {
    /// Nothing has run yet
    Idle,
    /// Tables exist and the staging table is empty
    SchemaEnsured,
    /// Records are being read and flushed
    Streaming,
    /// Staged cities have been promoted
    Promoted,
    /// Run complete
    Done,
}

impl std::fmt::Display for ImportPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ImportPhase::Idle => "idle",
            ImportPhase::SchemaEnsured => "schema_ensured",
            ImportPhase::Streaming => "streaming",
            ImportPhase::Promoted => "promoted",
            ImportPhase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Totals for one import run
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ImportSummary {
    pub schema: SchemaReport,
    pub stream: FlushStats,
    pub promoted: usize,
    pub elapsed_secs: f64,
}

impl ImportSummary {
    /// Records read from the input
    pub fn records(&self) -> usize {
        self.stream.records
    }

    /// State/country rows dropped at flush time for lack of a key
    pub fn skipped_null_keys(&self) -> usize {
        self.stream.skipped_null_keys()
    }
}

/// Drives one import through its phases
pub struct ImportPipeline<G> {
    gateway: G,
    settings: ImportSettings,
    phase: ImportPhase,
}

impl<G: DatabaseGateway> ImportPipeline<G> {
    /// Create an idle pipeline
    pub fn new(gateway: G, settings: ImportSettings) -> Self {
        Self {
            gateway,
            settings,
            phase: ImportPhase::Idle,
        }
    }

    /// Current phase
    pub fn phase(&self) -> ImportPhase {
        self.phase
    }

    /// Settings in use
    pub fn settings(&self) -> &ImportSettings {
        &self.settings
    }

    /// Gateway, e.g. for running the report afterwards
    pub fn gateway_mut(&mut self) -> &mut G {
        &mut self.gateway
    }

    /// Give the gateway back
    pub fn into_gateway(self) -> G {
        self.gateway
    }

    fn advance(&mut self, expected: ImportPhase, next: ImportPhase) -> Result<()> {
        if self.phase != expected {
            return Err(Error::Other(format!(
                "cannot move import to {next} while {}",
                self.phase
            )));
        }
        tracing::debug!(from = %self.phase, to = %next, "import phase");
        self.phase = next;
        Ok(())
    }

    /// Create the tables if absent and rebuild the staging table
    pub fn ensure_schema(&mut self) -> Result<SchemaReport> {
        if self.phase != ImportPhase::Idle {
            return Err(Error::Other(format!(
                "cannot ensure schema while {}",
                self.phase
            )));
        }
        let report = timed("create_db_structures", || ensure_schema(&mut self.gateway))?;
        self.advance(ImportPhase::Idle, ImportPhase::SchemaEnsured)?;
        Ok(report)
    }

    /// Stream every record of `source` into the staging and reference tables
    pub fn stream(&mut self, source: &RecordSource) -> Result<FlushStats> {
        self.advance(ImportPhase::SchemaEnsured, ImportPhase::Streaming)?;

        let settings = &self.settings;
        let gateway = &mut self.gateway;
        timed("insert_json_to_db", || {
            let mut flusher = BatchFlusher::new(gateway, settings);
            for record in source.records()? {
                flusher.accept(split_record(record?))?;
            }
            let (_, stats) = flusher.finish()?;
            tracing::info!(
                records = stats.records,
                cities = stats.cities.rows_sent,
                states = stats.states.rows_sent,
                countries = stats.countries.rows_sent,
                flushes = stats.total_flushes(),
                "input streamed"
            );
            Ok(stats)
        })
    }

    /// Move staged cities into the final table
    pub fn promote(&mut self) -> Result<usize> {
        if self.phase != ImportPhase::Streaming {
            return Err(Error::Other(format!(
                "cannot promote staged cities while {}",
                self.phase
            )));
        }
        let promoted = timed("move_data_from_tmp_table", || {
            promote_staged_cities(&mut self.gateway)
        })?;
        self.advance(ImportPhase::Streaming, ImportPhase::Promoted)?;
        Ok(promoted)
    }

    /// Mark the run complete
    pub fn finish(&mut self) -> Result<()> {
        self.advance(ImportPhase::Promoted, ImportPhase::Done)
    }

    /// Schema, streaming and promotion in sequence
    pub fn run(&mut self, source: &RecordSource) -> Result<ImportSummary> {
        let mut timer = StageTimer::start("import_data_to_db");

        let schema = self.ensure_schema()?;
        let stream = self.stream(source)?;
        let promoted = self.promote()?;

        timer.succeed();
        Ok(ImportSummary {
            schema,
            stream,
            promoted,
            elapsed_secs: timer.elapsed_secs(),
        })
    }
}
