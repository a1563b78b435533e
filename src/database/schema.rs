//! Target schema and fixed statements

use super::types::{BulkInsert, DatabaseGateway, DdlOutcome};
use crate::error::Result;

/// Final states table
pub const CREATE_STATES: &str = "CREATE TABLE states (
    id BIGINT NOT NULL,
    code VARCHAR,
    name VARCHAR,
    PRIMARY KEY (id)
)";

/// Final countries table
pub const CREATE_COUNTRIES: &str = "CREATE TABLE countries (
    id BIGINT NOT NULL,
    code VARCHAR,
    name VARCHAR,
    PRIMARY KEY (id)
)";

/// Final cities table, constrained to existing states and countries
pub const CREATE_CITIES: &str = "CREATE TABLE cities (
    id BIGINT NOT NULL,
    name VARCHAR,
    state_id BIGINT,
    country_id BIGINT,
    latitude VARCHAR,
    longitude VARCHAR,
    wikiDataId VARCHAR,
    PRIMARY KEY (id),
    FOREIGN KEY (state_id) REFERENCES states (id),
    FOREIGN KEY (country_id) REFERENCES countries (id)
)";

/// Staging table is rebuilt on every run
pub const DROP_CITIES_STAGING: &str = "DROP TABLE IF EXISTS cities_tmp";

/// Staging mirror of `cities` without foreign keys
pub const CREATE_CITIES_STAGING: &str = "CREATE TABLE cities_tmp (
    id BIGINT NOT NULL,
    name VARCHAR,
    state_id BIGINT,
    country_id BIGINT,
    latitude VARCHAR,
    longitude VARCHAR,
    wikiDataId VARCHAR,
    PRIMARY KEY (id)
)";

/// Schema statements in execution order
pub const SCHEMA_STATEMENTS: [&str; 5] = [
    CREATE_STATES,
    CREATE_COUNTRIES,
    CREATE_CITIES,
    DROP_CITIES_STAGING,
    CREATE_CITIES_STAGING,
];

/// City rows go to the staging table while streaming
pub const STAGE_CITIES: BulkInsert = BulkInsert {
    table: "cities_tmp",
    columns: &[
        "id",
        "name",
        "state_id",
        "country_id",
        "latitude",
        "longitude",
        "wikiDataId",
    ],
    conflict_key: "id",
};

/// State rows
pub const INSERT_STATES: BulkInsert = BulkInsert {
    table: "states",
    columns: &["id", "code", "name"],
    conflict_key: "id",
};

/// Country rows
pub const INSERT_COUNTRIES: BulkInsert = BulkInsert {
    table: "countries",
    columns: &["id", "code", "name"],
    conflict_key: "id",
};

/// Move staged cities into the final table
pub const PROMOTE_CITIES: &str =
    "INSERT INTO cities SELECT * FROM cities_tmp ON CONFLICT (id) DO NOTHING";

/// Outcome of [`ensure_schema`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchemaReport {
    /// Statements applied
    pub applied: usize,
    /// Statements skipped because the table existed
    pub existing: usize,
}

/// Create the tables if absent and rebuild the staging table
pub fn ensure_schema<G: DatabaseGateway + ?Sized>(gateway: &mut G) -> Result<SchemaReport> {
    let mut report = SchemaReport::default();
    for ddl in SCHEMA_STATEMENTS {
        match gateway.create_table(ddl)? {
            DdlOutcome::Applied => report.applied += 1,
            DdlOutcome::AlreadyExists => report.existing += 1,
        }
    }
    tracing::debug!(
        applied = report.applied,
        existing = report.existing,
        "schema ensured"
    );
    Ok(report)
}
