//! Per-instance DU processor statistics
//!
//! Counters are owned by each `DuProcessor` and serialized for status output.

use serde::{Deserialize, Serialize};

/// DU processor counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DuProcessorStats {
    /// DU index of the owning processor
    pub du_index: u16,
    /// Accepted F1 Setup Requests
    pub f1_setups_accepted: u64,
    /// Rejected F1 Setup Requests
    pub f1_setups_rejected: u64,
    /// UE contexts created
    pub ues_created: u64,
    /// UE creation requests rejected
    pub ue_creations_rejected: u64,
    /// UE contexts released
    pub ues_released: u64,
    /// Live UE contexts
    pub active_ues: usize,
    /// Procedures prepared
    pub procedures_started: u64,
    /// Procedures completed by a response
    pub procedures_completed: u64,
    /// Procedures canceled by their deadline
    pub procedures_timed_out: u64,
    /// Procedures canceled by their owner or a UE release
    pub procedures_canceled: u64,
    /// Duplicate or late responses dropped
    pub responses_discarded: u64,
    /// Responses without any correlated procedure
    pub responses_unmatched: u64,
}

impl DuProcessorStats {
    /// Creates zeroed counters for a DU
    pub fn new(du_index: u16) -> Self {
        Self {
            du_index,
            ..Default::default()
        }
    }

    /// Returns the counters as a YAML string.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}
