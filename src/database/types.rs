//! Gateway types and trait
//!
//! Defines the interface the import pipeline needs from a database.

use crate::error::{Error, Result};
use duckdb::types::{ToSql, ToSqlOutput, Value as DuckValue};
use serde_json::Value;

/// A single bound parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SqlValue {
    /// SQL NULL
    Null,
    /// Integer column value
    Int(i64),
    /// Text column value
    Text(String),
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> duckdb::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Owned(match self {
            SqlValue::Null => DuckValue::Null,
            SqlValue::Int(i) => DuckValue::BigInt(*i),
            SqlValue::Text(s) => DuckValue::Text(s.clone()),
        }))
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

impl From<Option<i64>> for SqlValue {
    fn from(value: Option<i64>) -> Self {
        value.map_or(SqlValue::Null, SqlValue::Int)
    }
}

impl From<Option<String>> for SqlValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(SqlValue::Null, SqlValue::Text)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

/// One row of bound parameters, in target column order
pub type Row = Vec<SqlValue>;

/// Conflict-ignoring multi-row insert into one table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkInsert {
    /// Target table
    pub table: &'static str,
    /// Target columns, in row order
    pub columns: &'static [&'static str],
    /// Primary key column used for `ON CONFLICT`
    pub conflict_key: &'static str,
}

impl BulkInsert {
    /// Render the statement for `rows` rows of placeholders
    pub fn statement(&self, rows: usize) -> String {
        let placeholders = vec!["?"; self.columns.len()].join(", ");
        let tuple = format!("({placeholders})");
        let values = vec![tuple.as_str(); rows].join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES {} ON CONFLICT ({}) DO NOTHING",
            self.table,
            self.columns.join(", "),
            values,
            self.conflict_key
        )
    }

    /// Number of columns per row
    pub fn width(&self) -> usize {
        self.columns.len()
    }
}

/// Result of a DDL statement that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DdlOutcome {
    /// The statement was applied and committed
    Applied,
    /// The object already existed; nothing changed
    AlreadyExists,
}

/// Column names plus rows of a query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    /// Column names, in select order
    pub columns: Vec<String>,
    /// Row values, converted to JSON
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    /// Whether the query produced no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First column of the first row
    pub fn scalar(&self, statement: &str) -> Result<&Value> {
        self.rows
            .first()
            .and_then(|row| row.first())
            .ok_or_else(|| Error::EmptyResult {
                statement: statement.trim().to_string(),
            })
    }
}

/// Operations the importer needs from a database
///
/// Every mutating call runs in its own transaction: committed on success,
/// rolled back on failure, with the failure returned to the caller.
pub trait DatabaseGateway {
    /// Execute DDL; an "already exists" failure is reported as
    /// [`DdlOutcome::AlreadyExists`] rather than an error
    fn create_table(&mut self, ddl: &str) -> Result<DdlOutcome>;

    /// Insert rows, skipping those whose key already exists
    fn bulk_insert_ignore(&mut self, insert: &BulkInsert, rows: &[Row]) -> Result<usize>;

    /// Execute an `INSERT ... SELECT` statement
    fn insert_from_select(&mut self, statement: &str) -> Result<usize>;

    /// Run a parameterized query
    fn query(&mut self, statement: &str, params: &[&str]) -> Result<QueryResult>;
}

impl<G: DatabaseGateway + ?Sized> DatabaseGateway for &mut G {
    fn create_table(&mut self, ddl: &str) -> Result<DdlOutcome> {
        (**self).create_table(ddl)
    }

    fn bulk_insert_ignore(&mut self, insert: &BulkInsert, rows: &[Row]) -> Result<usize> {
        (**self).bulk_insert_ignore(insert, rows)
    }

    fn insert_from_select(&mut self, statement: &str) -> Result<usize> {
        (**self).insert_from_select(statement)
    }

    fn query(&mut self, statement: &str, params: &[&str]) -> Result<QueryResult> {
        (**self).query(statement, params)
    }
}
