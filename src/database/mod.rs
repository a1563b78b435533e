//! Database gateway
//!
//! The importer talks to the database only through [`DatabaseGateway`]:
//! idempotent DDL, conflict-ignoring bulk inserts, `INSERT ... SELECT`, and
//! parameterized queries. [`DuckDbGateway`] implements it on DuckDB.

mod engine;
pub mod schema;
mod types;

pub use engine::{DuckDbGateway, INSERT_PAGE_SIZE};
pub use schema::{ensure_schema, SchemaReport};
pub use types::{BulkInsert, DatabaseGateway, DdlOutcome, QueryResult, Row, SqlValue};
