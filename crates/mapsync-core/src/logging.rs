//! Logging setup
//!
//! Headless stdout carries NDJSON output only, so nothing is ever logged
//! there. Full logs go to a daily rolling file; warnings and errors are also
//! mirrored to stderr so a driving process sees failures without tailing
//! the file.

use std::path::PathBuf;

use tracing::level_filters::LevelFilter;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::Result;

/// Environment variable controlling the file log filter
pub const LOG_ENV_VAR: &str = "MAPSYNC_LOG";

/// File name prefix; the appender adds a date suffix
const LOG_FILE_NAME: &str = "mapsync.log";

/// Filter used when `MAPSYNC_LOG` is unset or invalid
const DEFAULT_FILTER: &str = "mapsync=info,mapsync_app=info,mapsync_core=info,warn";

/// Where logs go
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogOptions {
    /// Directory for the rolling log file
    pub dir: PathBuf,
    /// Most verbose level mirrored to stderr. `LevelFilter::OFF` disables it.
    pub stderr_level: LevelFilter,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            stderr_level: LevelFilter::WARN,
        }
    }
}

impl LogOptions {
    /// Base path of the rolling log file
    pub fn log_file(&self) -> PathBuf {
        self.dir.join(LOG_FILE_NAME)
    }
}

/// Initialize logging with [`LogOptions::default`]
///
/// ```bash
/// MAPSYNC_LOG=debug mapsync --fragment '#at=10,4,7'
/// MAPSYNC_LOG=mapsync_app::writer=trace mapsync
/// ```
pub fn init() -> Result<LogOptions> {
    let options = LogOptions::default();
    init_with(&options)?;
    Ok(options)
}

/// Install the global subscriber: file layer filtered by `MAPSYNC_LOG`,
/// stderr layer capped at `options.stderr_level`.
pub fn init_with(options: &LogOptions) -> Result<()> {
    std::fs::create_dir_all(&options.dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &options.dir, LOG_FILE_NAME);
    let file_filter =
        EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_timer(fmt::time::ChronoLocal::new(
            "%Y-%m-%d %H:%M:%S%.3f".to_string(),
        ))
        .with_filter(file_filter);

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .compact()
        .with_filter(options.stderr_level);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .init();

    tracing::info!("mapsync logging to {}", options.log_file().display());
    Ok(())
}

fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mapsync")
        .join("logs")
}
