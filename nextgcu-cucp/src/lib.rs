//! nextgcu-cucp - 5G CU-CP DU Processor Library
#![allow(missing_docs)]
//!
//! This crate provides the per-DU control-plane core of a gNB Central Unit:
//!
//! - F1 Setup validation and served cell bookkeeping
//! - UE admission, UE index allocation and UE context storage
//! - Bearer context procedures toward the CU-UP (E1AP), with correlation,
//!   timeouts and cancellation
//!
//! # Architecture
//!
//! Each DU is owned by a `DuProcessor`, driven by a single `DuProcessorTask`
//! that serializes every inbound event. Outbound messages leave through the
//! `DuNotifier` and `CuUpNotifier` sinks.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                        CU-CP                          │
//! │  ┌──────────┐      ┌─────────────────────────────┐   │
//! │  │  Ticker  │─────▶│      DU Processor Task      │   │
//! │  └──────────┘      │  ┌───────────┐ ┌─────────┐  │   │
//! │                    │  │ UE index  │ │Procedure│  │   │
//! │                    │  │ + context │ │Orchestr.│  │   │
//! │                    │  └───────────┘ └─────────┘  │   │
//! │                    └──────┬───────────────┬──────┘   │
//! │                           │               │          │
//! └───────────────────────────┼───────────────┼──────────┘
//!                      F1AP   ▼        E1AP   ▼
//!                            DU             CU-UP
//! ```
//!
//! # Task Lifecycle
//!
//! Tasks are managed by `TaskManager` which handles:
//! - Task state tracking
//! - Graceful shutdown coordination
//!
//! # Configuration Loading
//!
//! ```rust,ignore
//! use nextgcu_cucp::app::load_and_validate_cucp_config;
//!
//! let config = load_and_validate_cucp_config("config/cucp.yaml")?;
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use nextgcu_common::DuIndex;
//! use nextgcu_cucp::{DuProcessor, DuProcessorTask, Task, TaskManager, DEFAULT_CHANNEL_CAPACITY};
//!
//! let (manager, du_processor_rx, du_rx, cu_up_rx) = TaskManager::new(DEFAULT_CHANNEL_CAPACITY);
//! let base = manager.task_base();
//! let processor = DuProcessor::new(
//!     DuIndex(0),
//!     config,
//!     Box::new(base.du_tx.clone()),
//!     Box::new(base.cu_up_tx.clone()),
//! );
//! let mut task = DuProcessorTask::new(processor);
//! tokio::spawn(async move { task.run(du_processor_rx).await });
//! ```

pub mod app;
pub mod du_processor;
pub mod error;
pub mod messages;
pub mod notifier;
pub mod procedure;
pub mod tasks;

// Re-export configuration loading
pub use app::{
    load_and_validate_cucp_config, load_cucp_config, load_cucp_config_from_str,
    validate_cucp_config, ConfigError, ConfigValidationError,
};

// Re-export DU processor types
pub use du_processor::{
    DuInfo, DuProcessor, DuProcessorStats, DuProcessorTask, UeContext, UeIndex, UeIndexPool,
};

// Re-export error types
pub use error::{CuCpError, ErrorKind, ProcedureError, SetupFailureCause, UeCreationError};

// Re-export notifier interfaces
pub use notifier::{CuUpNotifier, DuNotifier};

// Re-export procedure types
pub use procedure::{
    Continuation, LaunchRequest, ProcedureId, ProcedureResult, ProcedureState, ProcedureWaiter,
    ResponseDelivery,
};

// Re-export task types
pub use tasks::{
    CuCpTaskBase, DuProcessorMessage, PeerHandle, PeerReceiver, Task, TaskError, TaskHandle,
    TaskId, TaskManager, TaskMessage, TaskState, DEFAULT_CHANNEL_CAPACITY,
    DEFAULT_SHUTDOWN_TIMEOUT_MS,
};
