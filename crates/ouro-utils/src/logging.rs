//! # Controller Logging
//!
//! `tracing` setup for a debugger that runs inside the process it debugs.
//!
//! Two constraints shape this module. The host application owns stdout, and
//! the remote-protocol transport may well ride on it, so diagnostics must
//! never land there: console output goes to **stderr**, and can be
//! redirected to a file outright when even stderr is spoken for. And the
//! controller runs several threads of its own (the constructing thread,
//! "ouro-exception-server", "ouro-utility"), so every style keeps thread
//! names on; an event that cannot be attributed to one of those threads is
//! useless when untangling a wait/signal bug.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ouro_utils::init_logging;
//!
//! // Configure from the environment (RUST_LOG etc.)
//! init_logging().expect("Failed to initialize logging");
//!
//! tracing::info!("controller started");
//! ```
//!
//! Or configure explicitly:
//!
//! ```rust,no_run
//! use ouro_utils::logging::{LogConfig, LogStyle};
//!
//! LogConfig::new()
//!     .style(LogStyle::Full)
//!     .filter("ouro_core=debug")
//!     .file("/tmp/controller.log")
//!     .init()
//!     .expect("Failed to initialize logging");
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: filter directives (e.g. `debug`, `ouro_core=trace`)
//! - `OURO_LOG_STYLE`: output style (`full`, `compact`, or `json`; default `compact`)
//! - `OURO_LOG_FILE`: write to this file instead of stderr

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, io};

use tracing_subscriber::fmt;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// How log events are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogStyle
{
    /// Everything: target, thread id and name, source location. For
    /// chasing ordering bugs between the controller's threads.
    Full,
    /// One terse line per event with the thread name (default).
    #[default]
    Compact,
    /// JSON lines, for feeding a collector.
    Json,
}

impl FromStr for LogStyle
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "full" | "verbose" => Ok(LogStyle::Full),
            "compact" | "terse" => Ok(LogStyle::Compact),
            "json" => Ok(LogStyle::Json),
            _ => Err(format!("Unknown log style: {s}. Use 'full', 'compact', or 'json'")),
        }
    }
}

/// Logging configuration, built up and then installed once.
///
/// The zero-value configuration renders compact lines to stderr filtered
/// at `info` (or whatever `RUST_LOG` says); everything else is opt-in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogConfig
{
    style: LogStyle,
    filter: Option<String>,
    file: Option<PathBuf>,
}

impl LogConfig
{
    /// Start from the defaults: compact style, stderr, `RUST_LOG` filter.
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Read the configuration from the environment.
    ///
    /// `OURO_LOG_STYLE` selects the style (unknown values fall back to
    /// compact), `OURO_LOG_FILE` redirects output to a file. The filter is
    /// left to `RUST_LOG` at install time.
    #[must_use]
    pub fn from_env() -> Self
    {
        Self {
            style: parse_style(env::var("OURO_LOG_STYLE").ok().as_deref()),
            filter: None,
            file: env::var("OURO_LOG_FILE").ok().map(PathBuf::from),
        }
    }

    /// Select the output style.
    #[must_use]
    pub fn style(mut self, style: LogStyle) -> Self
    {
        self.style = style;
        self
    }

    /// Use these filter directives instead of `RUST_LOG`.
    #[must_use]
    pub fn filter(mut self, directives: impl Into<String>) -> Self
    {
        self.filter = Some(directives.into());
        self
    }

    /// Write to this file instead of stderr.
    #[must_use]
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self
    {
        self.file = Some(path.into());
        self
    }

    /// Install the global subscriber described by this configuration.
    ///
    /// ## Errors
    ///
    /// - `InvalidFilter`: the explicit filter directives do not parse
    /// - `InvalidPath`: the log file path has no file name component
    /// - `AlreadyInstalled`: some subscriber was installed earlier
    pub fn init(self) -> Result<(), LoggingError>
    {
        let filter = match &self.filter {
            Some(directives) => {
                EnvFilter::try_new(directives).map_err(|err| LoggingError::InvalidFilter(err.to_string()))?
            }
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        };

        let layer = match &self.file {
            Some(path) => {
                let file_name = path
                    .file_name()
                    .ok_or_else(|| LoggingError::InvalidPath(path.display().to_string()))?;
                let directory = match path.parent() {
                    Some(parent) if !parent.as_os_str().is_empty() => parent,
                    _ => Path::new("."),
                };
                let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(directory, file_name));
                // The guard flushes the writer thread on drop; the
                // subscriber is global, so keep it for the process lifetime.
                std::mem::forget(guard);
                styled_layer(self.style, false, writer)
            }
            None => styled_layer(self.style, true, io::stderr),
        };

        Registry::default()
            .with(layer.with_filter(filter))
            .try_init()
            .map_err(|err| LoggingError::AlreadyInstalled(err.to_string()))
    }
}

/// Initialize logging from the environment.
///
/// Shorthand for `LogConfig::from_env().init()`.
///
/// ## Errors
///
/// Returns an error if a global subscriber is already installed or the
/// configured log file path is unusable.
pub fn init_logging() -> Result<(), LoggingError>
{
    LogConfig::from_env().init()
}

/// Build the format layer for one style over one writer.
fn styled_layer<W>(style: LogStyle, ansi: bool, writer: W) -> Box<dyn Layer<Registry> + Send + Sync>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    match style {
        LogStyle::Full => fmt::layer()
            .with_writer(writer)
            .with_ansi(ansi)
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogStyle::Compact => fmt::layer()
            .compact()
            .with_writer(writer)
            .with_ansi(ansi)
            .with_target(false)
            .with_thread_names(true)
            .boxed(),
        LogStyle::Json => fmt::layer()
            .json()
            .with_writer(writer)
            .with_ansi(false)
            .with_thread_names(true)
            .with_current_span(true)
            .with_span_list(true)
            .boxed(),
    }
}

/// Style named by the environment, or the default for anything else.
fn parse_style(raw: Option<&str>) -> LogStyle
{
    raw.and_then(|value| value.parse().ok()).unwrap_or_default()
}

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    /// Explicit filter directives that do not parse
    #[error("Invalid filter directives: {0}")]
    InvalidFilter(String),

    /// A log file path with no file name component
    #[error("Log file path has no file name: {0}")]
    InvalidPath(String),

    /// A global subscriber was installed before this one
    #[error("A tracing subscriber is already installed: {0}")]
    AlreadyInstalled(String),
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_log_style_parses_every_alias()
    {
        assert_eq!("full".parse::<LogStyle>().unwrap(), LogStyle::Full);
        assert_eq!("verbose".parse::<LogStyle>().unwrap(), LogStyle::Full);
        assert_eq!("compact".parse::<LogStyle>().unwrap(), LogStyle::Compact);
        assert_eq!("terse".parse::<LogStyle>().unwrap(), LogStyle::Compact);
        assert_eq!("JSON".parse::<LogStyle>().unwrap(), LogStyle::Json);
    }

    #[test]
    fn test_log_style_rejects_unknown_names()
    {
        assert!("fancy".parse::<LogStyle>().is_err());
        assert!("".parse::<LogStyle>().is_err());
    }

    #[test]
    fn test_parse_style_falls_back_to_compact()
    {
        assert_eq!(parse_style(None), LogStyle::Compact);
        assert_eq!(parse_style(Some("nonsense")), LogStyle::Compact);
        assert_eq!(parse_style(Some("json")), LogStyle::Json);
    }

    #[test]
    fn test_config_defaults_to_compact_stderr()
    {
        let config = LogConfig::new();
        assert_eq!(
            config,
            LogConfig {
                style: LogStyle::Compact,
                filter: None,
                file: None,
            }
        );
    }

    #[test]
    fn test_builder_overrides_accumulate()
    {
        let config = LogConfig::new()
            .style(LogStyle::Json)
            .filter("ouro_core=debug")
            .file("/tmp/controller.log");
        assert_eq!(config.style, LogStyle::Json);
        assert_eq!(config.filter.as_deref(), Some("ouro_core=debug"));
        assert_eq!(config.file.as_deref(), Some(Path::new("/tmp/controller.log")));
    }

    #[test]
    fn test_init_rejects_bad_filter_directives()
    {
        // Parsed before anything is installed, so a bad filter leaves the
        // global dispatcher untouched.
        let err = LogConfig::new().filter("foo=bar=baz").init().unwrap_err();
        assert!(matches!(err, LoggingError::InvalidFilter(_)));
    }
}
