//! Logging setup shared by Tootcast binaries
//!
//! Diagnostics always go to stderr so that stdout stays reserved for the
//! published status URL (or JSON output).
//!
//! ```no_run
//! use libtootcast::logging::{LogFormat, LoggingConfig};
//!
//! LoggingConfig::new(LogFormat::Json, "info".to_string(), false).init();
//!
//! // Or pick everything up from the environment
//! libtootcast::logging::init_default();
//! ```

use std::str::FromStr;

use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable text output (no colors, for piping)
    Text,
    /// One JSON object per line
    Json,
    /// Pretty-printed with colors (for development)
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            _ => Err(format!(
                "Invalid log format: '{}'. Valid options: text, json, pretty",
                s
            )),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
            LogFormat::Pretty => write!(f, "pretty"),
        }
    }
}

/// Configuration for logging initialization
pub struct LoggingConfig {
    pub format: LogFormat,
    pub level: String,
    pub verbose: bool,
}

impl LoggingConfig {
    /// * `level` - Minimum log level (error, warn, info, debug, trace)
    /// * `verbose` - Raise the library's own targets to debug
    pub fn new(format: LogFormat, level: String, verbose: bool) -> Self {
        Self {
            format,
            level,
            verbose,
        }
    }

    /// Filter directive derived from level and verbosity
    ///
    /// `RUST_LOG` still wins when it is set.
    pub fn directive(&self) -> String {
        if self.verbose {
            format!("{},libtootcast=debug,toot_post=debug", self.level)
        } else {
            self.level.clone()
        }
    }

    /// Install the global subscriber
    ///
    /// A second call is a no-op: the already installed subscriber is kept.
    pub fn init(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.directive()));

        let installed = match self.format {
            LogFormat::Json => tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_current_span(true)
                .flatten_event(true)
                .with_target(true)
                .try_init(),
            LogFormat::Pretty => tracing_subscriber::fmt()
                .pretty()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_line_number(true)
                .try_init(),
            LogFormat::Text => tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .try_init(),
        };

        if installed.is_err() {
            tracing::debug!("Logging already initialized, keeping existing subscriber");
        }
    }
}

/// Initialize logging from `TOOTCAST_LOG_FORMAT` and `TOOTCAST_LOG_LEVEL`
///
/// Falls back to text output at `warn`, which keeps the CLI quiet apart
/// from its notifications.
pub fn init_default() {
    from_env(false).init();
}

/// Build a configuration from the environment
pub fn from_env(verbose: bool) -> LoggingConfig {
    let format = std::env::var("TOOTCAST_LOG_FORMAT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(LogFormat::Text);

    let level = std::env::var("TOOTCAST_LOG_LEVEL").unwrap_or_else(|_| "warn".to_string());

    LoggingConfig::new(format, level, verbose)
}
