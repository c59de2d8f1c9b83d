//! Configuration Loading for the CU-CP
//!
//! Wraps `CuCpConfig` from `nextgcu-common` with validation and error
//! handling for the CU-CP application.
//!
//! # Example
//!
//! ```rust,ignore
//! use nextgcu_cucp::app::{load_cucp_config, validate_cucp_config};
//!
//! let config = load_cucp_config("config/cucp.yaml")?;
//! validate_cucp_config(&config)?;
//! ```

use std::path::Path;

use nextgcu_common::{CuCpConfig, Rnti};
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Configuration validation error
    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ConfigValidationError),
}

impl From<nextgcu_common::Error> for ConfigError {
    fn from(err: nextgcu_common::Error) -> Self {
        match err {
            nextgcu_common::Error::Io(e) => ConfigError::IoError(e),
            other => ConfigError::ParseError(other.to_string()),
        }
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    /// Invalid UE capacity
    #[error("Invalid max_ues: {0}")]
    InvalidMaxUes(String),

    /// Invalid cell limit
    #[error("Invalid max_cells_per_setup: {0}")]
    InvalidMaxCells(String),

    /// Invalid procedure timeout
    #[error("Invalid procedure timeout: {0}")]
    InvalidTimeout(String),

    /// Invalid RNTI range
    #[error("Invalid RNTI range: {0}")]
    InvalidRntiRange(String),

    /// Invalid tick period
    #[error("Invalid tick_duration_ms: {0}")]
    InvalidTickDuration(String),

    /// Invalid procedure history size
    #[error("Invalid procedure_history: {0}")]
    InvalidProcedureHistory(String),
}

/// Loads a CU-CP configuration from a YAML file.
///
/// Only parses the file; call `validate_cucp_config` for range checks.
pub fn load_cucp_config<P: AsRef<Path>>(path: P) -> Result<CuCpConfig, ConfigError> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    load_cucp_config_from_str(&contents)
}

/// Loads a CU-CP configuration from a YAML string.
pub fn load_cucp_config_from_str(yaml: &str) -> Result<CuCpConfig, ConfigError> {
    Ok(CuCpConfig::from_yaml(yaml)?)
}

/// Validates a CU-CP configuration.
///
/// # Validation Rules
///
/// - `max_ues` must be between 1 and 65534 (65535 is the invalid UE index)
/// - `max_cells_per_setup` must be at least 1
/// - the default timeout and every override must be at least 1 tick
/// - the RNTI range must be non-empty and inside the C-RNTI range
/// - `tick_duration_ms` and `procedure_history` must be at least 1
pub fn validate_cucp_config(config: &CuCpConfig) -> Result<(), ConfigValidationError> {
    if config.max_ues == 0 || config.max_ues == u16::MAX {
        return Err(ConfigValidationError::InvalidMaxUes(format!(
            "{} must be between 1 and {}",
            config.max_ues,
            u16::MAX - 1
        )));
    }

    if config.max_cells_per_setup == 0 {
        return Err(ConfigValidationError::InvalidMaxCells(
            "at least one cell must be accepted".to_string(),
        ));
    }

    if config.procedure_timeout_ticks == 0 {
        return Err(ConfigValidationError::InvalidTimeout(
            "procedure_timeout_ticks must be at least 1".to_string(),
        ));
    }
    if let Some((kind, _)) = config
        .procedure_timeout_overrides
        .iter()
        .find(|(_, ticks)| **ticks == 0)
    {
        return Err(ConfigValidationError::InvalidTimeout(format!(
            "override for {kind} must be at least 1"
        )));
    }

    let range = config.rnti_range;
    if range.min > range.max {
        return Err(ConfigValidationError::InvalidRntiRange(format!(
            "min {:#06x} is above max {:#06x}",
            range.min, range.max
        )));
    }
    if !Rnti(range.min).is_crnti() || !Rnti(range.max).is_crnti() {
        return Err(ConfigValidationError::InvalidRntiRange(format!(
            "{:#06x}..={:#06x} is outside {}..={}",
            range.min,
            range.max,
            Rnti::MIN_CRNTI,
            Rnti::MAX_CRNTI
        )));
    }

    if config.tick_duration_ms == 0 {
        return Err(ConfigValidationError::InvalidTickDuration(
            "tick period must be at least 1 ms".to_string(),
        ));
    }

    if config.procedure_history == 0 {
        return Err(ConfigValidationError::InvalidProcedureHistory(
            "at least one finished procedure must be retained".to_string(),
        ));
    }

    Ok(())
}

/// Loads and validates a CU-CP configuration in one step.
pub fn load_and_validate_cucp_config<P: AsRef<Path>>(path: P) -> Result<CuCpConfig, ConfigError> {
    let config = load_cucp_config(path)?;
    validate_cucp_config(&config)?;
    Ok(config)
}
