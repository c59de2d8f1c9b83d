//! CU-CP Application Module
//!
//! Configuration loading and validation for the `nr-cucp` binary.

mod config_loader;

pub use config_loader::{
    load_and_validate_cucp_config, load_cucp_config, load_cucp_config_from_str,
    validate_cucp_config, ConfigError, ConfigValidationError,
};
