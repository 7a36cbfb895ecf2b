//! # Logging Utilities
//!
//! Logging infrastructure for kmon using `tracing`.
//!
//! The monitor owns stdout: prompts, command output and backtraces go there.
//! Diagnostics therefore go to stderr (or a file) so the two never interleave.
//!
//! This module provides:
//! - Pretty (human) or JSON output
//! - Level filtering through `RUST_LOG` or an explicit level
//! - Optional file output next to, or instead of, the console
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kmon_utils::init_logging;
//!
//! // Keep the guard alive for as long as logs should be flushed to files.
//! let _guard = init_logging().expect("Failed to initialize logging");
//! tracing::warn!("monitor entered without a trap frame");
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Level filter (e.g. `RUST_LOG=debug`, `RUST_LOG=kmon_core::unwind=trace`)
//! - `KMON_LOG_FORMAT`: Output format (`json` or `pretty`, default: `pretty`)
//! - `KMON_LOG_FILE`: Optional log file, written in addition to stderr and
//!   rotated daily
//!
//! Without `RUST_LOG` or an explicit level, only warnings and errors are shown.

use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Local;
use tracing::Level;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::{self};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Environment variable selecting the output format.
pub const FORMAT_ENV: &str = "KMON_LOG_FORMAT";
/// Environment variable naming an extra log file.
pub const FILE_ENV: &str = "KMON_LOG_FILE";

/// Level used when neither `RUST_LOG` nor an explicit level is given.
pub const DEFAULT_LEVEL: Level = Level::WARN;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat
{
    /// Human-readable lines (default)
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

impl LogFormat
{
    /// Format named by `KMON_LOG_FORMAT`, or [`LogFormat::Pretty`] if unset or
    /// unrecognised.
    pub fn from_env() -> Self
    {
        std::env::var(FORMAT_ENV)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }
}

impl FromStr for LogFormat
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "pretty" | "text" | "human" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(LoggingError::InvalidFormat(format!("{s}. Use 'pretty' or 'json'"))),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel
{
    /// Error level
    Error,
    /// Warning level (default)
    Warn,
    /// Info level
    Info,
    /// Debug level
    Debug,
    /// Trace level (most verbose)
    Trace,
}

impl From<LogLevel> for Level
{
    fn from(level: LogLevel) -> Self
    {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

impl FromStr for LogLevel
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "error" | "err" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" | "dbg" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(LoggingError::InvalidLevel(format!(
                "{s}. Use 'error', 'warn', 'info', 'debug', or 'trace'"
            ))),
        }
    }
}

/// Keeps background log writers alive.
///
/// File output is written by a worker thread; dropping the guard flushes it
/// and stops the worker. Hold it until the program exits.
#[derive(Debug, Default)]
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard
{
    _workers: Vec<WorkerGuard>,
}

/// Initialize logging from the environment
///
/// Reads `RUST_LOG`, `KMON_LOG_FORMAT` and `KMON_LOG_FILE`.
///
/// ## Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging() -> Result<LoggingGuard, LoggingError>
{
    init(None, LogFormat::from_env(), log_file_from_env())
}

/// Initialize logging with an explicit level, overriding `RUST_LOG`
///
/// ## Example
///
/// ```rust,no_run
/// use kmon_utils::{LogFormat, LogLevel, init_logging_with_level};
///
/// let _guard = init_logging_with_level(LogLevel::Debug, LogFormat::Pretty)
///     .expect("Failed to initialize logging");
/// ```
///
/// ## Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging_with_level(level: LogLevel, format: LogFormat) -> Result<LoggingGuard, LoggingError>
{
    init(Some(level.into()), format, log_file_from_env())
}

/// Initialize file-only logging into a dated file under `dir`
///
/// The file is named `YYYY-MM-DD-kmon.log` after the local date. Nothing is
/// written to the console, which keeps an interactive session clean even at
/// `trace` level.
///
/// ## Errors
///
/// Returns an error if `dir` cannot be created or a global subscriber is
/// already installed.
pub fn init_logging_to_file(
    dir: &Path,
    level: Option<LogLevel>,
    format: LogFormat,
) -> Result<(PathBuf, LoggingGuard), LoggingError>
{
    std::fs::create_dir_all(dir)?;
    let file_name = format!("{}-kmon.log", Local::now().format("%Y-%m-%d"));
    let path = dir.join(&file_name);

    // The date is already in the name, so the appender never rotates.
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, &file_name));
    let layers = vec![file_layer(format, writer, env_filter(level.map(Into::into)))];
    install(layers)?;

    Ok((path, LoggingGuard { _workers: vec![guard] }))
}

fn log_file_from_env() -> Option<PathBuf>
{
    std::env::var_os(FILE_ENV).map(PathBuf::from)
}

/// Filter for one layer.
///
/// Priority: explicit level, then `RUST_LOG`, then [`DEFAULT_LEVEL`]. Each
/// layer gets its own filter instance.
fn env_filter(explicit: Option<Level>) -> EnvFilter
{
    if let Some(level) = explicit {
        return EnvFilter::new(level.to_string());
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL.to_string()))
}

fn init(level: Option<Level>, format: LogFormat, log_file: Option<PathBuf>) -> Result<LoggingGuard, LoggingError>
{
    let mut layers = vec![console_layer(format, env_filter(level))];
    let mut workers = Vec::new();

    if let Some(file_path) = log_file {
        let dir = file_path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let file_name = file_path
            .file_name()
            .ok_or_else(|| LoggingError::InvalidFile(file_path.display().to_string()))?;
        let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, file_name));
        layers.push(file_layer(format, writer, env_filter(level)));
        workers.push(guard);
    }

    install(layers)?;
    Ok(LoggingGuard { _workers: workers })
}

fn install(layers: Vec<BoxedLayer>) -> Result<(), LoggingError>
{
    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|err| LoggingError::InitializationFailed(err.to_string()))
}

fn console_layer(format: LogFormat, filter: EnvFilter) -> BoxedLayer
{
    match format {
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(io::stderr().is_terminal())
            .with_writer(io::stderr)
            .with_filter(filter)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(io::stderr)
            .with_filter(filter)
            .boxed(),
    }
}

fn file_layer(format: LogFormat, writer: NonBlocking, filter: EnvFilter) -> BoxedLayer
{
    match format {
        LogFormat::Pretty => fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(false) // No ANSI in files
            .with_filter(filter)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(writer)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_current_span(true)
            .with_span_list(true)
            .with_filter(filter)
            .boxed(),
    }
}

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    /// Invalid log format
    #[error("Invalid log format: {0}")]
    InvalidFormat(String),

    /// Invalid log level
    #[error("Invalid log level: {0}")]
    InvalidLevel(String),

    /// Log file path has no file name
    #[error("Invalid log file: {0}")]
    InvalidFile(String),

    /// Failed to initialize logging
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),

    /// File logging error
    #[error("File logging error: {0}")]
    FileError(#[from] io::Error),
}
