//! Query and export
//!
//! Counts the cities of one (country, state) pair and writes the result to
//! `Number of cities for {state} in {country}.csv`.

mod query;
mod writer;

pub use query::{count_cities, CityCount, COUNT_CITIES_QUERY, COUNT_COLUMN};
pub use writer::{report_file_name, report_path, write_csv};

use crate::config::ReportSettings;
use crate::database::DatabaseGateway;
use crate::error::Result;
use crate::logging::timed;
use std::path::PathBuf;

/// A written city-count report
#[derive(Debug, Clone, PartialEq)]
pub struct ExportReport {
    pub count: CityCount,
    pub path: PathBuf,
}

/// Run the count query and write its CSV file
pub fn export_city_count<G: DatabaseGateway + ?Sized>(
    gateway: &mut G,
    settings: &ReportSettings,
) -> Result<ExportReport> {
    let count = timed("select_number_of_cities", || {
        count_cities(gateway, &settings.country, &settings.state)
    })?;

    let path = report_path(&settings.output_dir, &settings.state, &settings.country);
    timed("import_to_csv", || write_csv(&path, &count.columns, &count.rows))?;

    tracing::info!(
        country = %settings.country,
        state = %settings.state,
        count = count.count,
        path = %path.display(),
        "exported city count"
    );
    Ok(ExportReport { count, path })
}
