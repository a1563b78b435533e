//! Delimited file writer

use crate::error::{Error, Result, ResultExt};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// File name for a city-count report
///
/// Path separators in the names are replaced so the file always lands in the
/// output directory.
pub fn report_file_name(state: &str, country: &str) -> String {
    let name = format!("Number of cities for {state} in {country}.csv");
    name.replace(['/', '\\'], "-")
}

/// Path of the report inside `dir`
pub fn report_path(dir: impl AsRef<Path>, state: &str, country: &str) -> PathBuf {
    dir.as_ref().join(report_file_name(state, country))
}

/// Write a header row and data rows as CSV
pub fn write_csv(path: impl AsRef<Path>, columns: &[String], rows: &[Vec<Value>]) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create report {}", path.display()))?;

    writer.write_record(columns)?;
    for row in rows {
        if row.len() != columns.len() {
            return Err(Error::output(format!(
                "row has {} values but there are {} columns",
                row.len(),
                columns.len()
            )));
        }
        writer.write_record(row.iter().map(cell_to_string))?;
    }
    writer.flush()?;

    tracing::debug!(path = %path.display(), rows = rows.len(), "wrote csv");
    Ok(())
}

fn cell_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
