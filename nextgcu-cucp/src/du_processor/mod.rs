//! DU Processor
//!
//! Per-DU control-plane state of the CU-CP:
//! - **UE index pool**: bounded identifiers, lowest free slot first
//! - **Validator**: side-effect free checks for F1 setup and UE creation
//! - **UE context store**: per-UE state keyed by UE index
//! - **Processor**: handlers tying the above to the procedure orchestrator
//! - **Task**: serializes inbound events onto one processor

mod cell;
mod processor;
mod stats;
mod task;
mod ue_context;
mod ue_index;
mod validator;

pub use cell::{CellRecord, CellTable};
pub use processor::{DuInfo, DuProcessor};
pub use stats::DuProcessorStats;
pub use task::DuProcessorTask;
pub use ue_context::{SrbContext, UeContext, UeContextStore, MAX_NOF_SRBS};
pub use ue_index::{UeIndex, UeIndexPool};
pub use validator::{validate_creation, validate_setup, CreationCheck};
