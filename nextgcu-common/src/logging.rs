//! Logging infrastructure for nextgcu
//!
//! This module provides configurable logging using the `tracing` crate and
//! protocol message logging helpers for the F1AP and E1AP interfaces.

use std::fmt;
use tracing::Level;
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

/// Log level configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Trace level - most verbose
    Trace,
    /// Debug level
    Debug,
    /// Info level (default)
    #[default]
    Info,
    /// Warn level
    Warn,
    /// Error level - least verbose
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("unknown log level: {s}")),
        }
    }
}

/// Initialize the tracing subscriber with the specified log level.
///
/// This should be called once at application startup. The log level can be
/// overridden by the `RUST_LOG` environment variable.
///
/// # Example
///
/// ```no_run
/// use nextgcu_common::logging::{init_logging, LogLevel};
///
/// init_logging(LogLevel::Debug);
/// ```
pub fn init_logging(level: LogLevel) {
    init_logging_with_filter(&level.to_string());
}

/// Initialize logging with a custom filter string.
///
/// # Example
///
/// ```no_run
/// use nextgcu_common::logging::init_logging_with_filter;
///
/// // Default to info, but enable debug for the DU processor
/// init_logging_with_filter("info,nextgcu_cucp::du_processor=debug");
/// ```
pub fn init_logging_with_filter(filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_span_events(FmtSpan::NONE)
        .init();
}

/// Protocol direction for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Incoming/received message
    Rx,
    /// Outgoing/transmitted message
    Tx,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Rx => write!(f, "RX"),
            Direction::Tx => write!(f, "TX"),
        }
    }
}

/// Log a protocol message at debug level.
///
/// # Arguments
///
/// * `protocol` - Protocol name (e.g., "F1AP", "E1AP")
/// * `direction` - Message direction (RX or TX)
/// * `msg_type` - Message type description
/// * `ue` - Optional UE index the message belongs to
pub fn log_protocol_message(protocol: &str, direction: Direction, msg_type: &str, ue: Option<u16>) {
    match ue {
        Some(ue_index) => tracing::debug!(
            protocol = protocol,
            direction = %direction,
            msg_type = msg_type,
            ue_index = ue_index,
            "{} {} {}",
            direction,
            protocol,
            msg_type
        ),
        None => tracing::debug!(
            protocol = protocol,
            direction = %direction,
            msg_type = msg_type,
            "{} {} {}",
            direction,
            protocol,
            msg_type
        ),
    }
}

/// Log an F1AP message
pub fn log_f1ap_message(direction: Direction, msg_type: &str, ue: Option<u16>) {
    log_protocol_message("F1AP", direction, msg_type, ue);
}

/// Log an E1AP message
pub fn log_e1ap_message(direction: Direction, msg_type: &str, ue: Option<u16>) {
    log_protocol_message("E1AP", direction, msg_type, ue);
}

/// Wrapper for hex dump formatting
pub struct HexDump<'a>(pub &'a [u8]);

impl fmt::Display for HexDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "(empty)");
        }
        write!(f, "{}", hex::encode(self.0))
    }
}
