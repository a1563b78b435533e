//! DuckDB-backed database gateway
//!
//! Opens a DuckDB database (file or in-memory) and implements
//! [`DatabaseGateway`] with one transaction per call.

use super::types::{BulkInsert, DatabaseGateway, DdlOutcome, QueryResult, Row};
use crate::config::DatabaseSettings;
use crate::error::{is_already_exists, Error, Result};
use duckdb::{params_from_iter, Config, Connection};
use serde_json::Value;

/// Maximum rows rendered into one `INSERT ... VALUES` statement
pub const INSERT_PAGE_SIZE: usize = 100;

/// Database gateway using DuckDB
pub struct DuckDbGateway {
    /// DuckDB connection
    conn: Connection,
    /// Database location (for logging)
    path: String,
}

impl DuckDbGateway {
    /// Open the database described by `settings`
    pub fn open(settings: &DatabaseSettings) -> Result<Self> {
        let mut config = Config::default();
        for (key, value) in &settings.options {
            config = config.with(key, value).map_err(|e| {
                Error::invalid_value(key.clone(), format!("rejected by DuckDB: {e}"))
            })?;
        }

        let conn = if settings.is_in_memory() {
            Connection::open_in_memory_with_flags(config)
        } else {
            Connection::open_with_flags(&settings.path, config)
        }
        .map_err(|e| Error::config(format!("Failed to open DuckDB at {}: {e}", settings.path)))?;

        tracing::debug!(path = %settings.path, "opened database");

        Ok(Self {
            conn,
            path: settings.path.clone(),
        })
    }

    /// Open an in-memory database
    pub fn in_memory() -> Result<Self> {
        Self::open(&DatabaseSettings::in_memory())
    }

    /// Open the database, run `work`, then close it on every path
    ///
    /// Each gateway call has already committed or rolled back by the time
    /// `work` returns, so closing only has to release the connection.
    pub fn scoped<T>(
        settings: &DatabaseSettings,
        work: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let mut gateway = Self::open(settings)?;
        let result = work(&mut gateway);
        let closed = gateway.close();
        match (result, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), close_result) => {
                if let Err(close_err) = close_result {
                    tracing::warn!(error = %close_err, "failed to close database after error");
                }
                Err(e)
            }
        }
    }

    /// Close the connection
    pub fn close(self) -> Result<()> {
        let path = self.path;
        self.conn
            .close()
            .map_err(|(_, e)| Error::Database(e))?;
        tracing::debug!(path = %path, "closed database");
        Ok(())
    }

    /// Database location
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Number of rows in a table
    pub fn count_rows(&mut self, table: &str) -> Result<i64> {
        let count = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        Ok(count)
    }
}

impl DatabaseGateway for DuckDbGateway {
    fn create_table(&mut self, ddl: &str) -> Result<DdlOutcome> {
        let tx = self.conn.transaction()?;
        match tx.execute_batch(ddl) {
            Ok(()) => {
                tx.commit().map_err(|source| Error::Ddl {
                    statement: first_line(ddl),
                    source,
                })?;
                Ok(DdlOutcome::Applied)
            }
            Err(e) if is_already_exists(&e) => {
                tx.rollback()?;
                tracing::debug!(statement = %first_line(ddl), "object already exists");
                Ok(DdlOutcome::AlreadyExists)
            }
            Err(source) => {
                if let Err(rollback_err) = tx.rollback() {
                    tracing::warn!(error = %rollback_err, "rollback after DDL failure failed");
                }
                Err(Error::Ddl {
                    statement: first_line(ddl),
                    source,
                })
            }
        }
    }

    fn bulk_insert_ignore(&mut self, insert: &BulkInsert, rows: &[Row]) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        if let Some(bad) = rows.iter().find(|row| row.len() != insert.width()) {
            return Err(Error::query(format!(
                "row for '{}' has {} values, expected {}",
                insert.table,
                bad.len(),
                insert.width()
            )));
        }

        let insert_error = |source| Error::Insert {
            table: insert.table.to_string(),
            rows: rows.len(),
            source,
        };

        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        for page in rows.chunks(INSERT_PAGE_SIZE) {
            let sql = insert.statement(page.len());
            match tx.execute(&sql, params_from_iter(page.iter().flatten())) {
                Ok(n) => inserted += n,
                Err(source) => {
                    if let Err(rollback_err) = tx.rollback() {
                        tracing::warn!(error = %rollback_err, "rollback after insert failure failed");
                    }
                    return Err(insert_error(source));
                }
            }
        }
        tx.commit().map_err(insert_error)?;

        tracing::debug!(
            table = insert.table,
            sent = rows.len(),
            inserted,
            "bulk insert committed"
        );
        Ok(inserted)
    }

    fn insert_from_select(&mut self, statement: &str) -> Result<usize> {
        let tx = self.conn.transaction()?;
        match tx.execute(statement, []) {
            Ok(n) => {
                tx.commit().map_err(|source| Error::Promotion { source })?;
                Ok(n)
            }
            Err(source) => {
                if let Err(rollback_err) = tx.rollback() {
                    tracing::warn!(error = %rollback_err, "rollback after promotion failure failed");
                }
                Err(Error::Promotion { source })
            }
        }
    }

    fn query(&mut self, statement: &str, params: &[&str]) -> Result<QueryResult> {
        tracing::debug!("Executing query: {}", statement.trim());

        let mut stmt = self
            .conn
            .prepare(statement)
            .map_err(|e| Error::query(format!("Failed to prepare query: {e}")))?;

        let mut rows = stmt
            .query(params_from_iter(params.iter()))
            .map_err(|e| Error::query(format!("Failed to run query: {e}")))?;

        let columns = rows
            .as_ref()
            .map(duckdb::Statement::column_names)
            .unwrap_or_default();

        let mut result = QueryResult {
            columns,
            rows: Vec::new(),
        };

        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(result.columns.len());
            for idx in 0..result.columns.len() {
                let value: duckdb::types::Value = row.get(idx)?;
                values.push(duckdb_value_to_json(value));
            }
            result.rows.push(values);
        }

        Ok(result)
    }
}

fn first_line(sql: &str) -> String {
    sql.trim().lines().next().unwrap_or_default().trim().to_string()
}

/// Convert DuckDB Value to JSON Value
fn duckdb_value_to_json(value: duckdb::types::Value) -> Value {
    match value {
        duckdb::types::Value::Null => Value::Null,
        duckdb::types::Value::Boolean(b) => Value::Bool(b),
        duckdb::types::Value::TinyInt(i) => Value::Number(i.into()),
        duckdb::types::Value::SmallInt(i) => Value::Number(i.into()),
        duckdb::types::Value::Int(i) => Value::Number(i.into()),
        duckdb::types::Value::BigInt(i) => Value::Number(i.into()),
        duckdb::types::Value::HugeInt(i) => Value::String(i.to_string()),
        duckdb::types::Value::UTinyInt(i) => Value::Number(i.into()),
        duckdb::types::Value::USmallInt(i) => Value::Number(i.into()),
        duckdb::types::Value::UInt(i) => Value::Number(i.into()),
        duckdb::types::Value::UBigInt(i) => Value::Number(i.into()),
        duckdb::types::Value::Float(f) => {
            serde_json::Number::from_f64(f64::from(f)).map_or(Value::Null, Value::Number)
        }
        duckdb::types::Value::Double(f) => {
            serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number)
        }
        duckdb::types::Value::Text(s) => Value::String(s),
        _ => Value::String(format!("{value:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::schema::{ensure_schema, INSERT_STATES, PROMOTE_CITIES, STAGE_CITIES};
    use crate::database::SqlValue;

    fn state_row(id: i64, name: &str) -> Row {
        vec![SqlValue::Int(id), SqlValue::from("XX"), SqlValue::from(name)]
    }

    #[test]
    fn test_duckdb_value_to_json() {
        assert_eq!(
            duckdb_value_to_json(duckdb::types::Value::Null),
            Value::Null
        );
        assert_eq!(
            duckdb_value_to_json(duckdb::types::Value::Boolean(true)),
            Value::Bool(true)
        );
        assert_eq!(
            duckdb_value_to_json(duckdb::types::Value::BigInt(42)),
            Value::Number(42.into())
        );
        assert_eq!(
            duckdb_value_to_json(duckdb::types::Value::Text("hello".to_string())),
            Value::String("hello".to_string())
        );
    }

    #[test]
    fn test_create_table_reports_existing() {
        let mut gw = DuckDbGateway::in_memory().unwrap();
        let ddl = "CREATE TABLE t (id BIGINT PRIMARY KEY)";
        assert_eq!(gw.create_table(ddl).unwrap(), DdlOutcome::Applied);
        assert_eq!(gw.create_table(ddl).unwrap(), DdlOutcome::AlreadyExists);
    }

    #[test]
    fn test_create_table_surfaces_real_failures() {
        let mut gw = DuckDbGateway::in_memory().unwrap();
        let err = gw
            .create_table("CREATE TABLE broken (id NOT_A_TYPE)")
            .unwrap_err();
        assert!(matches!(err, Error::Ddl { .. }));
    }

    #[test]
    fn test_bulk_insert_ignores_conflicts() {
        let mut gw = DuckDbGateway::in_memory().unwrap();
        ensure_schema(&mut gw).unwrap();

        gw.bulk_insert_ignore(&INSERT_STATES, &[state_row(1, "One"), state_row(2, "Two")])
            .unwrap();
        gw.bulk_insert_ignore(&INSERT_STATES, &[state_row(2, "Other"), state_row(3, "Three")])
            .unwrap();

        assert_eq!(gw.count_rows("states").unwrap(), 3);
        let result = gw
            .query("SELECT name FROM states WHERE id = CAST(? AS BIGINT)", &["2"])
            .unwrap();
        assert_eq!(result.rows, vec![vec![Value::String("Two".to_string())]]);
    }

    #[test]
    fn test_bulk_insert_pages_large_batches() {
        let mut gw = DuckDbGateway::in_memory().unwrap();
        ensure_schema(&mut gw).unwrap();

        let rows: Vec<Row> = (0..(INSERT_PAGE_SIZE as i64 * 2 + 7))
            .map(|i| state_row(i, "S"))
            .collect();
        gw.bulk_insert_ignore(&INSERT_STATES, &rows).unwrap();
        assert_eq!(gw.count_rows("states").unwrap(), rows.len() as i64);
    }

    #[test]
    fn test_insert_statement_page_width() {
        assert_eq!(INSERT_PAGE_SIZE, 100);
        let sql = INSERT_STATES.statement(INSERT_PAGE_SIZE);
        assert_eq!(sql.matches("(?, ?, ?)").count(), 100);
    }

    #[test]
    fn test_bulk_insert_failure_rolls_back() {
        let mut gw = DuckDbGateway::in_memory().unwrap();
        ensure_schema(&mut gw).unwrap();

        // NULL primary key violates NOT NULL
        let rows = vec![
            state_row(1, "One"),
            vec![SqlValue::Null, SqlValue::Null, SqlValue::from("Nowhere")],
        ];
        let err = gw.bulk_insert_ignore(&INSERT_STATES, &rows).unwrap_err();
        assert!(matches!(err, Error::Insert { ref table, rows: 2, .. } if table == "states"));
        assert_eq!(gw.count_rows("states").unwrap(), 0);
    }

    #[test]
    fn test_bulk_insert_rejects_wrong_width() {
        let mut gw = DuckDbGateway::in_memory().unwrap();
        ensure_schema(&mut gw).unwrap();
        let err = gw
            .bulk_insert_ignore(&STAGE_CITIES, &[state_row(1, "One")])
            .unwrap_err();
        assert!(matches!(err, Error::Query { .. }));
    }

    #[test]
    fn test_promotion_failure_is_typed() {
        let mut gw = DuckDbGateway::in_memory().unwrap();
        // No tables yet
        let err = gw.insert_from_select(PROMOTE_CITIES).unwrap_err();
        assert!(matches!(err, Error::Promotion { .. }));
    }

    #[test]
    fn test_query_returns_column_names() {
        let mut gw = DuckDbGateway::in_memory().unwrap();
        let result = gw
            .query("SELECT 7 AS seven, ? AS echoed", &["hi"])
            .unwrap();
        assert_eq!(result.columns, vec!["seven".to_string(), "echoed".to_string()]);
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0][1], Value::String("hi".to_string()));
    }

    #[test]
    fn test_scoped_persists_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scoped.duckdb");
        let settings = DatabaseSettings::file(path.to_string_lossy().to_string());

        DuckDbGateway::scoped(&settings, |gw| {
            ensure_schema(gw)?;
            gw.bulk_insert_ignore(&INSERT_STATES, &[state_row(9, "Nine")])
        })
        .unwrap();

        let count = DuckDbGateway::scoped(&settings, |gw| gw.count_rows("states")).unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_open_rejects_unknown_option() {
        let settings = DatabaseSettings::in_memory().with_option("no_such_setting", "1");
        assert!(DuckDbGateway::open(&settings).is_err());
    }
}
