//! Common types and utilities for nextgcu
//!
//! This crate provides the identifier types, configuration structures,
//! logging setup and tick clock shared by the nextgcu crates.

pub mod config;
pub mod error;
pub mod logging;
pub mod tick;
pub mod types;

pub use config::{CuCpConfig, RntiRange};
pub use error::Error;
pub use logging::{
    init_logging, init_logging_with_filter, log_e1ap_message, log_f1ap_message,
    log_protocol_message, Direction, HexDump, LogLevel,
};
pub use tick::{Tick, TickClock};
pub use types::*;
