//! CU-CP Task Framework
//!
//! Actor-based task model with message passing. Each task runs as an
//! independent async task and communicates via typed message channels.
//!
//! # Architecture
//!
//! The CU-CP uses the following tasks:
//! - **DU Processor Task**: owns one `DuProcessor` and serializes its events
//! - **Ticker**: drives the procedure clock of the DU processor
//! - **DU peer**: drains F1AP messages addressed to the DU
//! - **CU-UP peer**: drains E1AP messages addressed to the CU-UP
//!
//! # Task Lifecycle
//!
//! Tasks follow a lifecycle managed by `TaskManager`:
//! 1. **Created**: Task is instantiated but not yet running
//! 2. **Running**: Task is actively processing messages
//! 3. **Stopping**: Task received shutdown signal, cleaning up
//! 4. **Stopped**: Task has terminated
//! 5. **Failed**: Task terminated due to an error

use std::collections::HashMap;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::du_processor::{DuProcessorStats, UeIndex};
use crate::error::CuCpError;
use crate::messages::{
    E1apCause, E1apMessage, E1apResponse, F1SetupRequest, F1apMessage, UeContextReleaseCommand,
    UeCreationRequest, UeCreationResult,
};
use crate::procedure::{
    BearerContextModificationOutcome, BearerContextModificationRequest, BearerContextReleased,
    BearerContextSetupOutcome, BearerContextSetupRequest, Continuation, ProcedureId,
    ProcedureState,
};

// ============================================================================
// Task Message Envelope
// ============================================================================

/// Task message envelope wrapping typed messages with control signals.
#[derive(Debug)]
pub enum TaskMessage<T> {
    /// Regular message payload
    Message(T),
    /// Shutdown signal - task should terminate gracefully
    Shutdown,
}

impl<T> TaskMessage<T> {
    /// Creates a new message envelope containing the given payload.
    pub fn message(msg: T) -> Self {
        TaskMessage::Message(msg)
    }

    /// Creates a shutdown signal.
    pub fn shutdown() -> Self {
        TaskMessage::Shutdown
    }

    /// Returns true if this is a shutdown signal.
    pub fn is_shutdown(&self) -> bool {
        matches!(self, TaskMessage::Shutdown)
    }

    /// Returns the message payload if present, or None for shutdown.
    pub fn into_message(self) -> Option<T> {
        match self {
            TaskMessage::Message(msg) => Some(msg),
            TaskMessage::Shutdown => None,
        }
    }
}

// ============================================================================
// Task Lifecycle State
// ============================================================================

/// Task lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskState {
    /// Task is created but not yet started
    #[default]
    Created,
    /// Task is running and processing messages
    Running,
    /// Task is in the process of stopping
    Stopping,
    /// Task has stopped gracefully
    Stopped,
    /// Task terminated due to an error
    Failed,
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskState::Created => write!(f, "Created"),
            TaskState::Running => write!(f, "Running"),
            TaskState::Stopping => write!(f, "Stopping"),
            TaskState::Stopped => write!(f, "Stopped"),
            TaskState::Failed => write!(f, "Failed"),
        }
    }
}

/// Task identifier for the CU-CP tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskId {
    /// DU processor task
    DuProcessor,
    /// Procedure clock ticker
    Ticker,
    /// DU-facing peer
    DuPeer,
    /// CU-UP-facing peer
    CuUpPeer,
}

impl TaskId {
    /// All CU-CP tasks
    pub const ALL: [TaskId; 4] = [
        TaskId::DuProcessor,
        TaskId::Ticker,
        TaskId::DuPeer,
        TaskId::CuUpPeer,
    ];
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskId::DuProcessor => write!(f, "DU-Processor"),
            TaskId::Ticker => write!(f, "Ticker"),
            TaskId::DuPeer => write!(f, "F1AP"),
            TaskId::CuUpPeer => write!(f, "E1AP"),
        }
    }
}

/// Information about a running task.
#[derive(Debug)]
pub struct TaskInfo {
    /// Task identifier
    pub id: TaskId,
    /// Current state
    pub state: TaskState,
    /// Time when the task was started
    pub started_at: Option<Instant>,
    /// Time when the task was stopped
    pub stopped_at: Option<Instant>,
    /// Error message if task failed
    pub error: Option<String>,
}

// ============================================================================
// Task Trait
// ============================================================================

/// Base trait for all CU-CP tasks.
///
/// Tasks are async actors that process messages from their receive channel.
#[async_trait::async_trait]
pub trait Task: Send + 'static {
    /// The message type this task processes.
    type Message: Send;

    /// Runs the task's main loop, processing messages until shutdown.
    async fn run(&mut self, rx: mpsc::Receiver<TaskMessage<Self::Message>>);
}

// ============================================================================
// DU Processor Messages
// ============================================================================

/// Reply channel for a prepared procedure
pub type ProcedureReply = Option<oneshot::Sender<Result<ProcedureId, CuCpError>>>;

/// Reply channel for procedure state queries
pub type ProcedureStateReply = Option<oneshot::Sender<Result<ProcedureState, CuCpError>>>;

/// Messages handled by the DU processor task
#[derive(Debug)]
pub enum DuProcessorMessage {
    /// F1 Setup Request from the DU
    F1SetupRequest(F1SetupRequest),
    /// UE creation request from the DU
    UeCreationRequest {
        /// Request
        request: UeCreationRequest,
        /// Reply channel
        response_tx: Option<oneshot::Sender<UeCreationResult>>,
    },
    /// UE Context Release Command
    UeContextReleaseCommand {
        /// Command
        command: UeContextReleaseCommand,
        /// Reply channel
        response_tx: Option<oneshot::Sender<Result<(), CuCpError>>>,
    },
    /// Prepare a Bearer Context Setup
    BearerContextSetup {
        /// Owning UE
        ue_index: UeIndex,
        /// Parameters
        request: BearerContextSetupRequest,
        /// Where the outcome goes
        continuation: Continuation<BearerContextSetupOutcome>,
        /// Reply with the procedure id
        response_tx: ProcedureReply,
    },
    /// Prepare a Bearer Context Modification
    BearerContextModification {
        /// Owning UE
        ue_index: UeIndex,
        /// Parameters
        request: BearerContextModificationRequest,
        /// Where the outcome goes
        continuation: Continuation<BearerContextModificationOutcome>,
        /// Reply with the procedure id
        response_tx: ProcedureReply,
    },
    /// Prepare a Bearer Context Release
    BearerContextRelease {
        /// Owning UE
        ue_index: UeIndex,
        /// Release cause
        cause: E1apCause,
        /// Where the outcome goes
        continuation: Continuation<BearerContextReleased>,
        /// Reply with the procedure id
        response_tx: ProcedureReply,
    },
    /// Launch an idle procedure, or report the state of a running one
    PollProcedure {
        /// Procedure
        id: ProcedureId,
        /// Reply channel
        response_tx: ProcedureStateReply,
    },
    /// Cancel a procedure
    CancelProcedure {
        /// Procedure
        id: ProcedureId,
        /// Reply channel
        response_tx: ProcedureStateReply,
    },
    /// Inbound E1AP message from the CU-UP
    E1apResponse(E1apResponse),
    /// Procedure clock tick
    Tick,
    /// Statistics query
    Stats {
        /// Reply channel
        response_tx: oneshot::Sender<DuProcessorStats>,
    },
}

// ============================================================================
// Task Handle
// ============================================================================

/// Handle for sending messages to a task.
///
/// Wraps `mpsc::Sender` with helpers for messages and shutdown signals.
#[derive(Debug)]
pub struct TaskHandle<T> {
    tx: mpsc::Sender<TaskMessage<T>>,
}

impl<T> Clone for TaskHandle<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> TaskHandle<T> {
    /// Creates a new task handle from a sender.
    pub fn new(tx: mpsc::Sender<TaskMessage<T>>) -> Self {
        Self { tx }
    }

    /// Sends a message to the task.
    ///
    /// Returns an error if the task has been dropped.
    pub async fn send(&self, msg: T) -> Result<(), mpsc::error::SendError<TaskMessage<T>>> {
        self.tx.send(TaskMessage::Message(msg)).await
    }

    /// Sends a message to the task without waiting.
    ///
    /// Returns an error if the channel is full or the task has been dropped.
    pub fn try_send(&self, msg: T) -> Result<(), mpsc::error::TrySendError<TaskMessage<T>>> {
        self.tx.try_send(TaskMessage::Message(msg))
    }

    /// Sends a shutdown signal to the task.
    pub async fn shutdown(&self) -> Result<(), mpsc::error::SendError<TaskMessage<T>>> {
        self.tx.send(TaskMessage::Shutdown).await
    }

    /// Returns true if the task channel is closed.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

// ============================================================================
// Peer Handle
// ============================================================================

/// Receiving end of an outbound peer channel
pub type PeerReceiver<T> = mpsc::UnboundedReceiver<TaskMessage<T>>;

/// Handle for the outbound channel toward a peer (DU or CU-UP).
///
/// The channel is unbounded, so a send never waits and never drops a message
/// while the peer task is alive.
#[derive(Debug)]
pub struct PeerHandle<T> {
    tx: mpsc::UnboundedSender<TaskMessage<T>>,
}

impl<T> Clone for PeerHandle<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> PeerHandle<T> {
    /// Creates a connected handle and receiver pair.
    pub fn channel() -> (Self, PeerReceiver<T>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queues a message for the peer.
    ///
    /// Returns an error only if the peer task has been dropped.
    pub fn send(&self, msg: T) -> Result<(), mpsc::error::SendError<TaskMessage<T>>> {
        self.tx.send(TaskMessage::Message(msg))
    }

    /// Sends a shutdown signal to the peer task.
    pub fn shutdown(&self) -> Result<(), mpsc::error::SendError<TaskMessage<T>>> {
        self.tx.send(TaskMessage::Shutdown)
    }

    /// Returns true if the peer channel is closed.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

// ============================================================================
// CU-CP Task Base
// ============================================================================

/// Message channels shared between the CU-CP tasks.
#[derive(Clone)]
pub struct CuCpTaskBase {
    /// DU processor task
    pub du_processor_tx: TaskHandle<DuProcessorMessage>,
    /// Outbound F1AP toward the DU
    pub du_tx: PeerHandle<F1apMessage>,
    /// Outbound E1AP toward the CU-UP
    pub cu_up_tx: PeerHandle<E1apMessage>,
}

impl CuCpTaskBase {
    /// Creates the channels and returns the base with the receiving ends.
    ///
    /// `channel_capacity` bounds the DU processor's inbound queue; the peer
    /// channels are unbounded.
    pub fn new(
        channel_capacity: usize,
    ) -> (
        Self,
        mpsc::Receiver<TaskMessage<DuProcessorMessage>>,
        PeerReceiver<F1apMessage>,
        PeerReceiver<E1apMessage>,
    ) {
        let (du_processor_tx, du_processor_rx) = mpsc::channel(channel_capacity);
        let (du_tx, du_rx) = PeerHandle::channel();
        let (cu_up_tx, cu_up_rx) = PeerHandle::channel();

        let base = Self {
            du_processor_tx: TaskHandle::new(du_processor_tx),
            du_tx,
            cu_up_tx,
        };
        (base, du_processor_rx, du_rx, cu_up_rx)
    }

    /// Sends shutdown signals to all tasks.
    pub async fn shutdown_all(&self) {
        let _ = self.du_processor_tx.shutdown().await;
        let _ = self.du_tx.shutdown();
        let _ = self.cu_up_tx.shutdown();
    }
}

// ============================================================================
// Constants
// ============================================================================

/// Default channel capacity for task message queues
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Default shutdown timeout in milliseconds
pub const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 5000;

// ============================================================================
// Task Manager
// ============================================================================

/// Manages the lifecycle of all CU-CP tasks.
///
/// The `TaskManager` is responsible for:
/// - Tracking task handles and state
/// - Coordinating graceful shutdown across all tasks
pub struct TaskManager {
    /// Task base with all message channels
    task_base: CuCpTaskBase,
    /// Task state information
    task_states: HashMap<TaskId, TaskInfo>,
    /// Shutdown signal sender
    shutdown_tx: watch::Sender<bool>,
    /// Shutdown signal receiver (cloneable)
    shutdown_rx: watch::Receiver<bool>,
    /// Join handles for spawned tasks
    join_handles: HashMap<TaskId, JoinHandle<Result<(), TaskError>>>,
}

/// Error type for task operations.
#[derive(Debug, Clone)]
pub struct TaskError {
    /// Task that failed
    pub task_id: TaskId,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for TaskError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Task {} error: {}", self.task_id, self.message)
    }
}

impl std::error::Error for TaskError {}

impl TaskManager {
    /// Creates a new `TaskManager`.
    ///
    /// Returns the manager along with the receivers for each channel.
    #[allow(clippy::type_complexity)]
    pub fn new(
        channel_capacity: usize,
    ) -> (
        Self,
        mpsc::Receiver<TaskMessage<DuProcessorMessage>>,
        PeerReceiver<F1apMessage>,
        PeerReceiver<E1apMessage>,
    ) {
        let (task_base, du_processor_rx, du_rx, cu_up_rx) = CuCpTaskBase::new(channel_capacity);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task_states = TaskId::ALL
            .iter()
            .map(|&task_id| {
                (
                    task_id,
                    TaskInfo {
                        id: task_id,
                        state: TaskState::Created,
                        started_at: None,
                        stopped_at: None,
                        error: None,
                    },
                )
            })
            .collect();

        let manager = Self {
            task_base,
            task_states,
            shutdown_tx,
            shutdown_rx,
            join_handles: HashMap::new(),
        };

        (manager, du_processor_rx, du_rx, cu_up_rx)
    }

    /// Returns a clone of the task base for inter-task communication.
    pub fn task_base(&self) -> CuCpTaskBase {
        self.task_base.clone()
    }

    /// Returns a receiver for the shutdown signal.
    pub fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    /// Gets the current state of a task.
    pub fn get_task_state(&self, task_id: TaskId) -> Option<TaskState> {
        self.task_states.get(&task_id).map(|info| info.state)
    }

    /// Gets information about a task.
    pub fn get_task_info(&self, task_id: TaskId) -> Option<&TaskInfo> {
        self.task_states.get(&task_id)
    }

    /// Returns true if all tasks are in the Running state.
    pub fn all_tasks_running(&self) -> bool {
        self.task_states
            .values()
            .all(|info| info.state == TaskState::Running)
    }

    /// Returns true if any task has failed.
    pub fn any_task_failed(&self) -> bool {
        self.task_states
            .values()
            .any(|info| info.state == TaskState::Failed)
    }

    /// Marks a task as started.
    pub fn mark_task_started(&mut self, task_id: TaskId) {
        if let Some(info) = self.task_states.get_mut(&task_id) {
            info.state = TaskState::Running;
            info.started_at = Some(Instant::now());
        }
    }

    /// Marks a task as stopped.
    pub fn mark_task_stopped(&mut self, task_id: TaskId) {
        if let Some(info) = self.task_states.get_mut(&task_id) {
            info.state = TaskState::Stopped;
            info.stopped_at = Some(Instant::now());
        }
    }

    /// Marks a task as failed with an error message.
    pub fn mark_task_failed(&mut self, task_id: TaskId, error: String) {
        if let Some(info) = self.task_states.get_mut(&task_id) {
            info.state = TaskState::Failed;
            info.stopped_at = Some(Instant::now());
            info.error = Some(error);
        }
    }

    /// Registers a join handle for a spawned task and marks it running.
    pub fn register_task_handle(
        &mut self,
        task_id: TaskId,
        handle: JoinHandle<Result<(), TaskError>>,
    ) {
        self.join_handles.insert(task_id, handle);
        self.mark_task_started(task_id);
    }

    /// Initiates graceful shutdown of all tasks.
    ///
    /// Sends shutdown signals to all tasks and waits for them to complete.
    pub async fn shutdown(&mut self) -> Result<(), TaskError> {
        let _ = self.shutdown_tx.send(true);

        for info in self.task_states.values_mut() {
            if info.state == TaskState::Running {
                info.state = TaskState::Stopping;
            }
        }

        self.task_base.shutdown_all().await;

        let timeout = tokio::time::Duration::from_millis(DEFAULT_SHUTDOWN_TIMEOUT_MS);
        let deadline = tokio::time::Instant::now() + timeout;

        let handles: Vec<_> = self.join_handles.drain().collect();
        let mut results: Vec<(TaskId, Result<(), String>)> = Vec::new();

        for (task_id, handle) in handles {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            let result = match tokio::time::timeout(remaining, handle).await {
                Ok(Ok(Ok(()))) => Ok(()),
                Ok(Ok(Err(e))) => Err(e.message),
                Ok(Err(_join_error)) => Err("Task panicked".to_string()),
                Err(_timeout) => Err("Shutdown timeout".to_string()),
            };
            results.push((task_id, result));
        }

        for (task_id, result) in results {
            match result {
                Ok(()) => self.mark_task_stopped(task_id),
                Err(msg) => self.mark_task_failed(task_id, msg),
            }
        }

        if self.any_task_failed() {
            let failed: Vec<_> = self
                .task_states
                .values()
                .filter(|info| info.state == TaskState::Failed)
                .map(|info| {
                    format!(
                        "{}: {}",
                        info.id,
                        info.error.as_deref().unwrap_or("unknown error")
                    )
                })
                .collect();
            return Err(TaskError {
                task_id: TaskId::DuProcessor,
                message: format!("Tasks failed during shutdown: {}", failed.join(", ")),
            });
        }

        Ok(())
    }

    /// Returns a summary of all task states.
    pub fn status_summary(&self) -> Vec<(TaskId, TaskState)> {
        self.task_states
            .iter()
            .map(|(id, info)| (*id, info.state))
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
