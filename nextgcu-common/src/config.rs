//! Configuration structures for the CU-CP
//!
//! `CuCpConfig` carries the capacity limits, RNTI range and procedure timers
//! used by every DU processor instance. All fields have serde defaults so a
//! minimal YAML file only needs to override what differs.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::types::{ProcedureKind, Rnti};

/// Default maximum number of UEs per DU
pub const DEFAULT_MAX_UES: u16 = 1024;
/// Default maximum number of served cells per F1 Setup Request
pub const DEFAULT_MAX_CELLS_PER_SETUP: usize = 16;
/// Default procedure timeout in ticks
pub const DEFAULT_PROCEDURE_TIMEOUT_TICKS: u64 = 1000;
/// Default tick period in milliseconds
pub const DEFAULT_TICK_DURATION_MS: u64 = 1;
/// Default number of finished procedure handles retained
pub const DEFAULT_PROCEDURE_HISTORY: usize = 256;

/// Inclusive range of RNTIs the CU-CP accepts for new UEs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RntiRange {
    /// Lowest accepted RNTI
    pub min: u16,
    /// Highest accepted RNTI
    pub max: u16,
}

impl RntiRange {
    /// Creates a new RNTI range
    pub const fn new(min: u16, max: u16) -> Self {
        Self { min, max }
    }

    /// Returns true if the RNTI is inside the range
    pub fn contains(&self, rnti: Rnti) -> bool {
        rnti.value() >= self.min && rnti.value() <= self.max
    }
}

impl Default for RntiRange {
    fn default() -> Self {
        Self {
            min: Rnti::MIN_CRNTI.value(),
            max: Rnti::MAX_CRNTI.value(),
        }
    }
}

/// CU-CP configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CuCpConfig {
    /// gNB-CU name reported in F1 Setup Response
    #[serde(default = "default_gnb_cu_name")]
    pub gnb_cu_name: String,
    /// Capacity of the UE index pool of each DU processor
    #[serde(default = "default_max_ues")]
    pub max_ues: u16,
    /// Maximum number of served cells accepted in one F1 Setup Request
    #[serde(default = "default_max_cells_per_setup")]
    pub max_cells_per_setup: usize,
    /// Default procedure timeout in ticks
    #[serde(default = "default_procedure_timeout_ticks")]
    pub procedure_timeout_ticks: u64,
    /// Per-procedure timeout overrides in ticks
    #[serde(default)]
    pub procedure_timeout_overrides: HashMap<ProcedureKind, u64>,
    /// Accepted RNTI range for UE creation
    #[serde(default)]
    pub rnti_range: RntiRange,
    /// Tick period in milliseconds
    #[serde(default = "default_tick_duration_ms")]
    pub tick_duration_ms: u64,
    /// Number of finished procedure handles kept for duplicate detection
    #[serde(default = "default_procedure_history")]
    pub procedure_history: usize,
}

fn default_gnb_cu_name() -> String {
    "nextgcu".to_string()
}

fn default_max_ues() -> u16 {
    DEFAULT_MAX_UES
}

fn default_max_cells_per_setup() -> usize {
    DEFAULT_MAX_CELLS_PER_SETUP
}

fn default_procedure_timeout_ticks() -> u64 {
    DEFAULT_PROCEDURE_TIMEOUT_TICKS
}

fn default_tick_duration_ms() -> u64 {
    DEFAULT_TICK_DURATION_MS
}

fn default_procedure_history() -> usize {
    DEFAULT_PROCEDURE_HISTORY
}

impl Default for CuCpConfig {
    fn default() -> Self {
        Self {
            gnb_cu_name: default_gnb_cu_name(),
            max_ues: DEFAULT_MAX_UES,
            max_cells_per_setup: DEFAULT_MAX_CELLS_PER_SETUP,
            procedure_timeout_ticks: DEFAULT_PROCEDURE_TIMEOUT_TICKS,
            procedure_timeout_overrides: HashMap::new(),
            rnti_range: RntiRange::default(),
            tick_duration_ms: DEFAULT_TICK_DURATION_MS,
            procedure_history: DEFAULT_PROCEDURE_HISTORY,
        }
    }
}

impl CuCpConfig {
    /// Parses a configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, Error> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Returns the timeout in ticks for the given procedure kind.
    ///
    /// An override takes precedence over `procedure_timeout_ticks`.
    pub fn timeout_for(&self, kind: ProcedureKind) -> u64 {
        self.procedure_timeout_overrides
            .get(&kind)
            .copied()
            .unwrap_or(self.procedure_timeout_ticks)
    }
}
