//! Logging setup and stage timing
//!
//! `init` builds a `tracing` subscriber and installs it as the default for the
//! calling thread. The returned [`LogGuard`] owns that installation; dropping
//! it (or calling [`LogGuard::close`]) detaches the subscriber again, so no
//! logger state outlives the guard.
//!
//! [`timed`] wraps a pipeline stage with entry/exit log lines and elapsed time.
//! The exit line comes from a `Drop` impl, so it is written on every exit path.

use crate::error::{Error, Result, ResultExt};
use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Instant;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::EnvFilter;

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log file (truncated on open); stderr when unset
    pub file: Option<PathBuf>,
    /// Default level directive, e.g. `info` or `debug`
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: None,
            level: "info".to_string(),
        }
    }
}

impl LogConfig {
    /// Log to the given file
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Set the default level
    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }
}

/// Active logging installation
#[must_use = "logging is detached as soon as the guard is dropped"]
pub struct LogGuard {
    _default: DefaultGuard,
    file: Option<PathBuf>,
}

impl LogGuard {
    /// Log file in use, if any
    pub fn file(&self) -> Option<&PathBuf> {
        self.file.as_ref()
    }

    /// Detach the subscriber
    pub fn close(self) {
        tracing::debug!("logging closed");
    }
}

/// Install a subscriber for the current thread
///
/// `RUST_LOG` directives take precedence over `config.level`.
pub fn init(config: &LogConfig) -> Result<LogGuard> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| Error::invalid_value("log_level", e.to_string()))?;

    let default = match &config.file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            let subscriber = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .finish();
            tracing::subscriber::set_default(subscriber)
        }
        None => {
            let subscriber = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_default(subscriber)
        }
    };

    Ok(LogGuard {
        _default: default,
        file: config.file.clone(),
    })
}

// ============================================================================
// Stage Timing
// ============================================================================

/// Logs stage entry on creation and exit with elapsed time on drop
pub struct StageTimer {
    stage: &'static str,
    started: Instant,
    succeeded: bool,
}

impl StageTimer {
    /// Start timing a stage
    pub fn start(stage: &'static str) -> Self {
        tracing::info!(stage, "entered stage");
        Self {
            stage,
            started: Instant::now(),
            succeeded: false,
        }
    }

    /// Mark the stage as successful
    pub fn succeed(&mut self) {
        self.succeeded = true;
    }

    /// Seconds since the stage started
    pub fn elapsed_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }
}

impl Drop for StageTimer {
    fn drop(&mut self) {
        let elapsed = format!("{:.4}", self.elapsed_secs());
        if self.succeeded {
            tracing::info!(stage = self.stage, elapsed_secs = %elapsed, "exited stage");
        } else {
            tracing::warn!(stage = self.stage, elapsed_secs = %elapsed, "exited stage with failure");
        }
    }
}

/// Run `work` as a named stage
pub fn timed<T>(stage: &'static str, work: impl FnOnce() -> Result<T>) -> Result<T> {
    let span = tracing::info_span!("stage", name = stage);
    let _entered = span.enter();

    let mut timer = StageTimer::start(stage);
    let result = work();
    if result.is_ok() {
        timer.succeed();
    }
    result
}
