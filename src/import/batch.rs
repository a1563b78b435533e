//! Accumulators and the batch flusher
//!
//! Cities accumulate in source order; states and countries accumulate as
//! insertion-ordered sets keyed by their natural key, so the first tuple seen
//! for a key wins. Each accumulator has its own threshold and is flushed on
//! its own cadence.

use super::splitter::{CityRow, CountryRow, SplitRecord, StateRow, TableRow};
use crate::config::ImportSettings;
use crate::database::schema::{INSERT_COUNTRIES, INSERT_STATES, STAGE_CITIES};
use crate::database::{BulkInsert, DatabaseGateway, Row};
use crate::error::Result;
use std::collections::HashSet;

/// In-memory buffer of rows for one table
#[derive(Debug)]
pub struct Accumulator<T> {
    rows: Vec<T>,
    /// Keys currently buffered; `None` for append-only accumulators
    seen: Option<HashSet<Option<i64>>>,
    threshold: usize,
}

impl<T: TableRow> Accumulator<T> {
    /// Append-only accumulator
    pub fn ordered(threshold: usize) -> Self {
        Self {
            rows: Vec::new(),
            seen: None,
            threshold: threshold.max(1),
        }
    }

    /// Accumulator that keeps only the first row per natural key
    pub fn deduplicating(threshold: usize) -> Self {
        Self {
            rows: Vec::new(),
            seen: Some(HashSet::new()),
            threshold: threshold.max(1),
        }
    }

    /// Buffer a row; returns false if its key is already buffered
    pub fn push(&mut self, row: T) -> bool {
        if let Some(seen) = &mut self.seen {
            if !seen.insert(row.natural_key()) {
                return false;
            }
        }
        self.rows.push(row);
        true
    }

    /// Buffered row count
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether the threshold has been reached
    pub fn is_full(&self) -> bool {
        self.rows.len() >= self.threshold
    }

    /// Flush threshold
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Buffered rows, in insertion order
    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    /// Remove and return every buffered row
    pub fn take(&mut self) -> Vec<T> {
        if let Some(seen) = &mut self.seen {
            seen.clear();
        }
        std::mem::take(&mut self.rows)
    }
}

/// Counters for one accumulator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityStats {
    /// Rows accepted into the buffer
    pub buffered: usize,
    /// Rows dropped because their key was already buffered
    pub duplicates: usize,
    /// Bulk inserts issued
    pub flushes: usize,
    /// Rows sent to the database
    pub rows_sent: usize,
    /// Rows not sent because their key was null
    pub skipped_null_keys: usize,
}

/// Counters for the whole streaming phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushStats {
    pub records: usize,
    pub cities: EntityStats,
    pub states: EntityStats,
    pub countries: EntityStats,
}

impl FlushStats {
    /// Bulk inserts issued across all accumulators
    pub fn total_flushes(&self) -> usize {
        self.cities.flushes + self.states.flushes + self.countries.flushes
    }

    /// Null-keyed rows skipped across all accumulators
    pub fn skipped_null_keys(&self) -> usize {
        self.cities.skipped_null_keys
            + self.states.skipped_null_keys
            + self.countries.skipped_null_keys
    }
}

/// Routes split records into accumulators and flushes them through a gateway
pub struct BatchFlusher<G> {
    gateway: G,
    cities: Accumulator<CityRow>,
    states: Accumulator<StateRow>,
    countries: Accumulator<CountryRow>,
    stats: FlushStats,
}

impl<G: DatabaseGateway> BatchFlusher<G> {
    /// Create a flusher with the thresholds from `settings`
    pub fn new(gateway: G, settings: &ImportSettings) -> Self {
        Self {
            gateway,
            cities: Accumulator::ordered(settings.city_batch_size),
            states: Accumulator::deduplicating(settings.state_batch_size),
            countries: Accumulator::deduplicating(settings.country_batch_size),
            stats: FlushStats::default(),
        }
    }

    /// Buffer one record, then flush whichever accumulators are full
    pub fn accept(&mut self, split: SplitRecord) -> Result<()> {
        self.stats.records += 1;
        Self::buffer(&mut self.states, &mut self.stats.states, split.state);
        Self::buffer(&mut self.countries, &mut self.stats.countries, split.country);
        Self::buffer(&mut self.cities, &mut self.stats.cities, split.city);

        if self.cities.is_full() {
            Self::flush(
                &mut self.gateway,
                &STAGE_CITIES,
                &mut self.cities,
                &mut self.stats.cities,
            )?;
        }
        if self.states.is_full() {
            Self::flush(
                &mut self.gateway,
                &INSERT_STATES,
                &mut self.states,
                &mut self.stats.states,
            )?;
        }
        if self.countries.is_full() {
            Self::flush(
                &mut self.gateway,
                &INSERT_COUNTRIES,
                &mut self.countries,
                &mut self.stats.countries,
            )?;
        }
        Ok(())
    }

    /// Flush every non-empty accumulator and return the gateway with the totals
    pub fn finish(mut self) -> Result<(G, FlushStats)> {
        if !self.cities.is_empty() {
            Self::flush(
                &mut self.gateway,
                &STAGE_CITIES,
                &mut self.cities,
                &mut self.stats.cities,
            )?;
        }
        if !self.states.is_empty() {
            Self::flush(
                &mut self.gateway,
                &INSERT_STATES,
                &mut self.states,
                &mut self.stats.states,
            )?;
        }
        if !self.countries.is_empty() {
            Self::flush(
                &mut self.gateway,
                &INSERT_COUNTRIES,
                &mut self.countries,
                &mut self.stats.countries,
            )?;
        }
        Ok((self.gateway, self.stats))
    }

    /// Totals so far
    pub fn stats(&self) -> &FlushStats {
        &self.stats
    }

    /// Buffered city count
    pub fn pending_cities(&self) -> usize {
        self.cities.len()
    }

    /// Buffered state count
    pub fn pending_states(&self) -> usize {
        self.states.len()
    }

    /// Buffered country count
    pub fn pending_countries(&self) -> usize {
        self.countries.len()
    }

    fn buffer<T: TableRow>(acc: &mut Accumulator<T>, stats: &mut EntityStats, row: T) {
        if acc.push(row) {
            stats.buffered += 1;
        } else {
            stats.duplicates += 1;
        }
    }

    fn flush<T: TableRow>(
        gateway: &mut G,
        insert: &BulkInsert,
        acc: &mut Accumulator<T>,
        stats: &mut EntityStats,
    ) -> Result<()> {
        let batch = acc.take();
        let buffered = batch.len();

        let rows: Vec<Row> = batch
            .into_iter()
            .filter(|row| row.natural_key().is_some())
            .map(TableRow::into_row)
            .collect();

        let skipped = buffered - rows.len();
        if skipped > 0 {
            tracing::warn!(
                table = insert.table,
                skipped,
                "skipping rows with a null key"
            );
            stats.skipped_null_keys += skipped;
        }

        if rows.is_empty() {
            return Ok(());
        }

        gateway.bulk_insert_ignore(insert, &rows)?;
        stats.flushes += 1;
        stats.rows_sent += rows.len();
        tracing::info!(table = insert.table, rows = rows.len(), "flushed batch");
        Ok(())
    }
}
