//! Tests for import module

use super::*;
use crate::config::ImportSettings;
use crate::database::schema::{INSERT_COUNTRIES, INSERT_STATES, PROMOTE_CITIES, STAGE_CITIES};
use crate::database::{BulkInsert, DatabaseGateway, DdlOutcome, QueryResult, Row, SqlValue};
use crate::error::{Error, Result};
use crate::reader::{CityRecord, RecordSource};
use pretty_assertions::assert_eq;
use std::io::Write;
use test_case::test_case;

// ============================================================================
// Test Gateway
// ============================================================================

/// Gateway that records every call instead of touching a database
#[derive(Debug, Default)]
struct RecordingGateway {
    ddl: Vec<String>,
    inserts: Vec<(&'static str, Vec<Row>)>,
    selects: Vec<String>,
    fail_inserts_into: Option<&'static str>,
}

impl RecordingGateway {
    fn inserts_into(&self, table: &str) -> Vec<&Vec<Row>> {
        self.inserts
            .iter()
            .filter(|(t, _)| *t == table)
            .map(|(_, rows)| rows)
            .collect()
    }
}

impl DatabaseGateway for RecordingGateway {
    fn create_table(&mut self, ddl: &str) -> Result<DdlOutcome> {
        self.ddl.push(ddl.to_string());
        Ok(DdlOutcome::Applied)
    }

    fn bulk_insert_ignore(&mut self, insert: &BulkInsert, rows: &[Row]) -> Result<usize> {
        if self.fail_inserts_into == Some(insert.table) {
            return Err(Error::query(format!("insert into {} refused", insert.table)));
        }
        self.inserts.push((insert.table, rows.to_vec()));
        Ok(rows.len())
    }

    fn insert_from_select(&mut self, statement: &str) -> Result<usize> {
        self.selects.push(statement.to_string());
        Ok(0)
    }

    fn query(&mut self, _statement: &str, _params: &[&str]) -> Result<QueryResult> {
        Ok(QueryResult::default())
    }
}

fn record(id: i64, state_id: Option<i64>, country_id: Option<i64>) -> CityRecord {
    CityRecord {
        id,
        name: Some(format!("City {id}")),
        state_id,
        state_code: state_id.map(|s| format!("S{s}")),
        state_name: state_id.map(|s| format!("State {s}")),
        country_id,
        country_code: country_id.map(|c| format!("C{c}")),
        country_name: country_id.map(|c| format!("Country {c}")),
        latitude: Some("1.5".to_string()),
        longitude: Some("2.5".to_string()),
        wiki_data_id: Some(format!("Q{id}")),
    }
}

fn settings(batch: usize) -> ImportSettings {
    ImportSettings::default().with_batch_size(batch)
}

// ============================================================================
// Splitter Tests
// ============================================================================

#[test]
fn test_split_record_column_order() {
    let split = split_record(record(1, Some(10), Some(100)));

    assert_eq!(
        split.country.clone().into_row(),
        vec![
            SqlValue::Int(100),
            SqlValue::from("C100"),
            SqlValue::from("Country 100")
        ]
    );
    assert_eq!(
        split.state.clone().into_row(),
        vec![
            SqlValue::Int(10),
            SqlValue::from("S10"),
            SqlValue::from("State 10")
        ]
    );
    assert_eq!(
        split.city.into_row(),
        vec![
            SqlValue::Int(1),
            SqlValue::from("City 1"),
            SqlValue::Int(10),
            SqlValue::Int(100),
            SqlValue::from("1.5"),
            SqlValue::from("2.5"),
            SqlValue::from("Q1"),
        ]
    );
}

#[test]
fn test_split_record_keeps_null_references() {
    let split = split_record(record(1, None, None));
    assert_eq!(
        split.state,
        StateRow {
            id: None,
            code: None,
            name: None
        }
    );
    assert_eq!(split.country.natural_key(), None);
    assert_eq!(split.city.state_id, None);
    assert_eq!(split.city.natural_key(), Some(1));
}

// ============================================================================
// Accumulator Tests
// ============================================================================

#[test]
fn test_ordered_accumulator_keeps_everything() {
    let mut acc = Accumulator::ordered(10);
    let city = split_record(record(1, Some(1), Some(1))).city;
    assert!(acc.push(city.clone()));
    assert!(acc.push(city));
    assert_eq!(acc.len(), 2);
}

#[test]
fn test_deduplicating_accumulator_first_seen_wins() {
    let mut acc = Accumulator::deduplicating(10);
    let first = StateRow {
        id: Some(5),
        code: Some("A".to_string()),
        name: Some("First".to_string()),
    };
    let second = StateRow {
        id: Some(5),
        code: Some("B".to_string()),
        name: Some("Second".to_string()),
    };

    assert!(acc.push(first.clone()));
    assert!(!acc.push(second));
    assert_eq!(acc.rows(), &[first]);
}

#[test]
fn test_take_resets_keys() {
    let mut acc = Accumulator::deduplicating(10);
    let row = CountryRow {
        id: Some(1),
        code: None,
        name: None,
    };
    acc.push(row.clone());
    assert_eq!(acc.take().len(), 1);
    assert!(acc.is_empty());
    assert!(acc.push(row));
}

#[test]
fn test_zero_threshold_clamped() {
    let acc: Accumulator<CityRow> = Accumulator::ordered(0);
    assert_eq!(acc.threshold(), 1);
}

// ============================================================================
// Flusher Tests
// ============================================================================

#[test_case(0, 0, 0 ; "no records")]
#[test_case(4, 0, 1 ; "one short of threshold")]
#[test_case(5, 1, 1 ; "exactly threshold")]
#[test_case(6, 1, 2 ; "one over threshold")]
#[test_case(10, 2, 2 ; "two full batches")]
fn test_city_flush_cadence(cities: i64, during_stream: usize, total: usize) {
    let mut gateway = RecordingGateway::default();
    let mut flusher = BatchFlusher::new(&mut gateway, &settings(5));
    for id in 0..cities {
        flusher.accept(split_record(record(id, Some(1), Some(1)))).unwrap();
    }
    assert_eq!(flusher.stats().cities.flushes, during_stream);

    let (_, stats) = flusher.finish().unwrap();
    assert_eq!(stats.cities.flushes, total);
    assert_eq!(stats.cities.rows_sent, cities as usize);

    let batches = gateway.inserts_into(STAGE_CITIES.table);
    assert_eq!(batches.len(), total);
    assert!(batches.iter().all(|b| b.len() <= 5));
}

#[test]
fn test_accumulators_flush_independently() {
    let mut gateway = RecordingGateway::default();
    let mut flusher = BatchFlusher::new(&mut gateway, &settings(3));

    // Three cities, two distinct states, one country
    flusher.accept(split_record(record(1, Some(1), Some(1)))).unwrap();
    flusher.accept(split_record(record(2, Some(1), Some(1)))).unwrap();
    flusher.accept(split_record(record(3, Some(2), Some(1)))).unwrap();

    assert_eq!(flusher.stats().cities.flushes, 1);
    assert_eq!(flusher.stats().states.flushes, 0);
    assert_eq!(flusher.pending_cities(), 0);
    assert_eq!(flusher.pending_states(), 2);
    assert_eq!(flusher.pending_countries(), 1);

    let (_, stats) = flusher.finish().unwrap();
    assert_eq!(stats.records, 3);
    assert_eq!(stats.states.duplicates, 1);
    assert_eq!(stats.countries.duplicates, 2);
    assert_eq!(stats.total_flushes(), 3);

    let order: Vec<&str> = gateway.inserts.iter().map(|(t, _)| *t).collect();
    assert_eq!(
        order,
        vec![STAGE_CITIES.table, INSERT_STATES.table, INSERT_COUNTRIES.table]
    );
}

#[test]
fn test_state_threshold_counts_distinct_keys() {
    let mut gateway = RecordingGateway::default();
    let mut import = ImportSettings::default().with_batch_size(100);
    import.state_batch_size = 2;
    let mut flusher = BatchFlusher::new(&mut gateway, &import);

    for (id, state) in [(1, 7), (2, 7), (3, 7), (4, 8), (5, 9)] {
        flusher
            .accept(split_record(record(id, Some(state), Some(1))))
            .unwrap();
    }
    let (_, stats) = flusher.finish().unwrap();

    let batches = gateway.inserts_into(INSERT_STATES.table);
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].len(), 2);
    assert_eq!(batches[1].len(), 1);
    assert_eq!(stats.states.rows_sent, 3);
}

#[test]
fn test_null_keys_are_buffered_but_not_sent() {
    let mut gateway = RecordingGateway::default();
    let mut flusher = BatchFlusher::new(&mut gateway, &settings(10));
    flusher.accept(split_record(record(1, None, None))).unwrap();
    flusher.accept(split_record(record(2, None, Some(3)))).unwrap();
    assert_eq!(flusher.pending_states(), 1);

    let (_, stats) = flusher.finish().unwrap();
    assert_eq!(stats.states.skipped_null_keys, 1);
    assert_eq!(stats.countries.skipped_null_keys, 1);
    assert_eq!(stats.states.flushes, 0);
    assert_eq!(stats.countries.rows_sent, 1);
    assert_eq!(stats.cities.rows_sent, 2);
    assert!(gateway.inserts_into(INSERT_STATES.table).is_empty());
}

#[test]
fn test_insert_failure_propagates() {
    let mut gateway = RecordingGateway {
        fail_inserts_into: Some("states"),
        ..Default::default()
    };
    let mut flusher = BatchFlusher::new(&mut gateway, &settings(10));
    flusher.accept(split_record(record(1, Some(1), Some(1)))).unwrap();
    assert!(flusher.finish().is_err());
}

// ============================================================================
// Pipeline Tests
// ============================================================================

fn write_input(records: &[CityRecord]) -> tempfile::NamedTempFile {
    let values: Vec<serde_json::Value> = records
        .iter()
        .map(|r| {
            serde_json::json!({
                "id": r.id,
                "name": r.name,
                "state_id": r.state_id,
                "state_code": r.state_code,
                "state_name": r.state_name,
                "country_id": r.country_id,
                "country_code": r.country_code,
                "country_name": r.country_name,
                "latitude": r.latitude,
                "longitude": r.longitude,
                "wikiDataId": r.wiki_data_id,
            })
        })
        .collect();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(serde_json::to_string(&values).unwrap().as_bytes())
        .unwrap();
    file
}

#[test]
fn test_pipeline_runs_phases_in_order() {
    let input = write_input(&[record(1, Some(1), Some(1)), record(2, Some(2), Some(1))]);
    let mut pipeline = ImportPipeline::new(RecordingGateway::default(), settings(10));
    assert_eq!(pipeline.phase(), ImportPhase::Idle);

    let summary = pipeline.run(&RecordSource::new(input.path())).unwrap();
    assert_eq!(pipeline.phase(), ImportPhase::Promoted);
    assert_eq!(summary.records(), 2);
    assert_eq!(summary.schema.applied, 5);

    pipeline.finish().unwrap();
    assert_eq!(pipeline.phase(), ImportPhase::Done);

    let gateway = pipeline.into_gateway();
    assert_eq!(gateway.ddl.len(), 5);
    assert_eq!(gateway.selects, vec![PROMOTE_CITIES.to_string()]);
}

#[test]
fn test_pipeline_rejects_out_of_order_stages() {
    let mut pipeline = ImportPipeline::new(RecordingGateway::default(), settings(10));
    assert!(pipeline.promote().is_err());
    assert!(pipeline.finish().is_err());

    let input = write_input(&[]);
    assert!(pipeline.stream(&RecordSource::new(input.path())).is_err());

    pipeline.ensure_schema().unwrap();
    assert!(pipeline.ensure_schema().is_err());
    assert!(pipeline.gateway_mut().selects.is_empty());
}

#[test]
fn test_pipeline_stops_on_parse_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(br#"{"not": "an array"}"#).unwrap();

    let mut pipeline = ImportPipeline::new(RecordingGateway::default(), settings(10));
    let err = pipeline.run(&RecordSource::new(file.path())).unwrap_err();
    assert!(err.is_parse());
    assert_eq!(pipeline.phase(), ImportPhase::Streaming);
    assert!(pipeline.into_gateway().selects.is_empty());
}
