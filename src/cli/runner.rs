//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands};
use crate::config::{DatabaseSettings, ImportSettings, ReportSettings};
use crate::database::{DatabaseGateway, DuckDbGateway};
use crate::error::{Error, Result};
use crate::export::{export_city_count, ExportReport};
use crate::import::{ImportPipeline, ImportSummary};
use crate::logging::{self, LogConfig};
use crate::reader::RecordSource;
use std::path::PathBuf;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    ///
    /// Logging is installed for the duration of the call and detached before
    /// returning, on success and on failure.
    pub fn run(&self) -> Result<()> {
        let log = logging::init(&self.log_config())?;

        let result = self.dispatch();
        if let Err(e) = &result {
            tracing::error!(error = %e, "run failed");
        }

        log.close();
        result
    }

    fn log_config(&self) -> LogConfig {
        let level = if self.cli.verbose { "debug" } else { "info" };
        let config = LogConfig::default().with_level(level);
        match &self.cli.log_file {
            Some(path) => config.with_file(path),
            None => config,
        }
    }

    fn dispatch(&self) -> Result<()> {
        // Config problems abort before any database work
        let database = DatabaseSettings::load(&self.cli.config)?;

        match &self.cli.command {
            Commands::Import { data, batch_size } => {
                let settings = self.import_settings(data.as_ref(), *batch_size)?;
                let source = RecordSource::new(&settings.data_path);
                let summary = DuckDbGateway::scoped(&database, |gateway| {
                    let mut pipeline = ImportPipeline::new(gateway, settings);
                    let summary = pipeline.run(&source)?;
                    pipeline.finish()?;
                    Ok(summary)
                })?;
                println!("{}", summary_line(&summary));
            }
            Commands::Count {
                country,
                state,
                output_dir,
            } => {
                let mut report = ReportSettings::load(&self.cli.config)?;
                if let Some(country) = country {
                    report.country.clone_from(country);
                }
                if let Some(state) = state {
                    report.state.clone_from(state);
                }
                if let Some(dir) = output_dir {
                    report.output_dir.clone_from(dir);
                }

                let exported = DuckDbGateway::scoped(&database, |gateway| {
                    export_city_count(gateway, &report)
                })?;
                print_export(&exported);
            }
            Commands::Run { data } => {
                let settings = self.import_settings(data.as_ref(), None)?;
                let report = ReportSettings::load(&self.cli.config)?;

                let (summary, exported) = DuckDbGateway::scoped(&database, |gateway| {
                    import_and_export(gateway, settings, &report)
                })?;
                println!("{}", summary_line(&summary));
                print_export(&exported);
            }
        }

        Ok(())
    }

    fn import_settings(
        &self,
        data: Option<&PathBuf>,
        batch_size: Option<usize>,
    ) -> Result<ImportSettings> {
        let mut settings = ImportSettings::load(&self.cli.config)?;
        if let Some(path) = data {
            settings.data_path.clone_from(path);
        }
        match batch_size {
            Some(0) => Err(Error::invalid_value("batch_size", "must be greater than zero")),
            Some(size) => Ok(settings.with_batch_size(size)),
            None => Ok(settings),
        }
    }
}

/// Full run: import the file, then export the configured count
pub fn import_and_export<G: DatabaseGateway>(
    gateway: G,
    settings: ImportSettings,
    report: &ReportSettings,
) -> Result<(ImportSummary, ExportReport)> {
    let source = RecordSource::new(&settings.data_path);
    let mut pipeline = ImportPipeline::new(gateway, settings);
    let summary = pipeline.run(&source)?;
    let exported = export_city_count(pipeline.gateway_mut(), report)?;
    pipeline.finish()?;
    Ok((summary, exported))
}

fn summary_line(summary: &ImportSummary) -> String {
    let stream = &summary.stream;
    format!(
        "Imported {} records: {} cities staged, {} states, {} countries, {} cities promoted in {:.2}s",
        stream.records,
        stream.cities.rows_sent,
        stream.states.rows_sent,
        stream.countries.rows_sent,
        summary.promoted,
        summary.elapsed_secs
    )
}

fn print_export(exported: &ExportReport) {
    println!("{}", exported.count.summary_line());
    println!("Report written to {}", exported.path.display());
}
