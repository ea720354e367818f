//! Log output for the `bqclassify` binary.
//!
//! Logs go to stderr so classification reports on stdout stay parseable.
//! Directives are scoped to this crate's targets; `RUST_LOG`, when set,
//! replaces them entirely.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, EnvFilter};

/// Targets that emit classification logs.
const TARGETS: [&str; 2] = ["bqstorage_errors", "bqclassify"];

/// How much the binary logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    /// Every attachment and pattern decision.
    Trace,
    /// One line per classification.
    Debug,
    /// Malformed details and configuration problems only.
    #[default]
    Warn,
    Off,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Off => LevelFilter::OFF,
        }
    }
}

impl From<u8> for LogLevel {
    /// `-v` count: 0 = warn, 1 = debug, 2+ = trace.
    fn from(verbosity: u8) -> Self {
        match verbosity {
            0 => LogLevel::Warn,
            1 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }
}

/// Subscriber settings chosen from the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    /// Prefix lines with the source location of the event.
    pub with_location: bool,
}

impl LoggingConfig {
    pub fn from_verbosity(verbosity: u8) -> Self {
        let level = LogLevel::from(verbosity);
        Self {
            level,
            with_location: level == LogLevel::Trace,
        }
    }

    /// Configuration for `--quiet`: logging disabled.
    pub fn quiet() -> Self {
        Self {
            level: LogLevel::Off,
            with_location: false,
        }
    }

    /// The filter directives for this configuration, e.g.
    /// `bqstorage_errors=debug,bqclassify=debug`.
    pub fn directives(&self) -> String {
        let level = LevelFilter::from(self.level);
        TARGETS
            .iter()
            .map(|target| format!("{}={}", target, level))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Install the global subscriber. Call once, before classifying anything.
///
/// ```no_run
/// use bqstorage_errors::logging::{init_logging, LoggingConfig};
///
/// init_logging(LoggingConfig::from_verbosity(1));
/// ```
pub fn init_logging(config: LoggingConfig) {
    let env_filter = match std::env::var("RUST_LOG") {
        Ok(_) => EnvFilter::from_default_env(),
        Err(_) => EnvFilter::new(config.directives()),
    };

    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .with_file(config.with_location)
        .with_line_number(config.with_location)
        .init();
}
