//! # Logging Utilities
//!
//! Logging infrastructure for kscope using `tracing`.
//!
//! The core crate only emits events; a host or test decides where they go by
//! calling one of the initializers below once per process.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kscope_utils::init_logging;
//!
//! // Keep the guard alive so file output is flushed on exit
//! let _guard = init_logging().expect("Failed to initialize logging");
//!
//! tracing::info!("Introspection session started");
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level filter (e.g., `RUST_LOG=debug`, `RUST_LOG=kscope_core=trace`)
//! - `KSCOPE_LOG_FORMAT`: Set output format (`json` or `pretty`, default: `pretty`)
//! - `KSCOPE_LOG_FILE`: Optional log file. If it names a directory, a dated
//!   `YYYY-MM-DD-kscope.log` is created inside it.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, io};

use chrono::Utc;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::{self};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat
{
    /// Pretty-printed, human-readable format (default)
    Pretty,
    /// JSON format
    Json,
}

impl FromStr for LogFormat
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "pretty" | "dev" | "development" => Ok(LogFormat::Pretty),
            "json" | "prod" | "production" => Ok(LogFormat::Json),
            _ => Err(LoggingError::InvalidFormat(s.to_string())),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel
{
    Error,
    Warn,
    /// Default
    Info,
    Debug,
    /// Most verbose; includes every radix tree level visited
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
            _ => Err(LoggingError::InvalidLevel(s.to_string())),
        }
    }
}

/// Initialize logging from the environment
///
/// Reads `RUST_LOG`, `KSCOPE_LOG_FORMAT` and `KSCOPE_LOG_FILE`. An
/// unparsable `KSCOPE_LOG_FORMAT` is an error rather than silently falling
/// back to `pretty`.
///
/// Returns the file writer's guard when file logging is enabled; dropping it
/// flushes and stops the background writer.
///
/// ## Errors
///
/// Returns an error if:
/// - Logging is already initialized
/// - `KSCOPE_LOG_FORMAT` is not a known format
/// - The log file directory cannot be created
pub fn init_logging() -> Result<Option<WorkerGuard>, LoggingError>
{
    let format = match env::var("KSCOPE_LOG_FORMAT") {
        Ok(raw) => raw.parse()?,
        Err(_) => LogFormat::Pretty,
    };

    // RUST_LOG may hold a full filter directive; only a bare level is used
    // as the default here, the directive itself is applied by EnvFilter.
    let default_level = env::var("RUST_LOG")
        .ok()
        .and_then(|raw| raw.parse::<LogLevel>().ok())
        .map_or(Level::INFO, Into::into);

    init_logging_internal(format, default_level)
}

/// Initialize logging with an explicit level and format
///
/// `RUST_LOG` still overrides `level` when set.
///
/// ## Example
///
/// ```rust,no_run
/// use kscope_utils::{init_logging_with_level, LogFormat, LogLevel};
///
/// let _guard = init_logging_with_level(LogLevel::Debug, LogFormat::Pretty)
///     .expect("Failed to initialize logging");
/// ```
///
/// ## Errors
///
/// Returns an error if logging is already initialized or file logging fails.
pub fn init_logging_with_level(level: LogLevel, format: LogFormat) -> Result<Option<WorkerGuard>, LoggingError>
{
    init_logging_internal(format, level.into())
}

/// Route log output through the test harness.
///
/// Safe to call from every test: only the first call installs a subscriber.
/// Defaults to `warn` unless `RUST_LOG` says otherwise.
pub fn init_test_logging()
{
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(Level::WARN.to_string()));
    // A second call finds the global subscriber already set; that is fine.
    let _ = fmt::fmt().with_env_filter(filter).with_test_writer().try_init();
}

/// Resolve `KSCOPE_LOG_FILE` to a concrete file path.
fn log_file_path(raw: &Path) -> PathBuf
{
    if raw.is_dir() {
        let today = Utc::now().format("%Y-%m-%d");
        raw.join(format!("{today}-kscope.log"))
    } else {
        raw.to_path_buf()
    }
}

fn file_writer(log_file: &Path) -> Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard), LoggingError>
{
    let directory = log_file.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    std::fs::create_dir_all(directory)?;
    let file_name = log_file
        .file_name()
        .ok_or_else(|| LoggingError::InitializationFailed(format!("'{}' is not a file path", log_file.display())))?;
    // The file name is fixed, so never roll over.
    let appender = tracing_appender::rolling::never(directory, file_name);
    Ok(tracing_appender::non_blocking(appender))
}

fn init_logging_internal(format: LogFormat, default_level: Level) -> Result<Option<WorkerGuard>, LoggingError>
{
    // RUST_LOG can override the default level with more specific filters
    let env_filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level.to_string()));

    let log_file = env::var_os("KSCOPE_LOG_FILE").map(|raw| log_file_path(Path::new(&raw)));

    let console_layer: Box<dyn Layer<Registry> + Send + Sync> = match format {
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(true)
            .with_writer(io::stderr)
            .with_filter(env_filter())
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(io::stderr)
            .with_filter(env_filter())
            .boxed(),
    };

    let Some(log_file) = log_file else {
        Registry::default()
            .with(console_layer)
            .try_init()
            .map_err(|err| LoggingError::InitializationFailed(err.to_string()))?;
        return Ok(None);
    };

    let (writer, guard) = file_writer(&log_file)?;
    let file_layer = match format {
        LogFormat::Pretty => fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(false) // No ANSI in files
            .with_filter(env_filter())
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
            .with_filter(env_filter())
            .boxed(),
    };

    Registry::default()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|err| LoggingError::InitializationFailed(err.to_string()))?;
    Ok(Some(guard))
}

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    /// Invalid log format
    #[error("Invalid log format: {0}. Use 'pretty' or 'json'")]
    InvalidFormat(String),

    /// Invalid log level
    #[error("Invalid log level: {0}. Use 'error', 'warn', 'info', 'debug', or 'trace'")]
    InvalidLevel(String),

    /// Failed to initialize logging
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),

    /// File logging error
    #[error("File logging error: {0}")]
    FileError(#[from] io::Error),
}
