//! Peer handshake procedures
//!
//! A procedure sends one request toward the CU-UP and waits for the correlated
//! response. Each handle moves through an explicit state machine:
//!
//! ```text
//! Idle --launch--> AwaitingResponse --response--> Completed
//!   |                     |
//!   +------cancel---------+--cancel / deadline--> Canceled
//! ```
//!
//! `Completed` and `Canceled` are terminal. The orchestrator owns every handle;
//! callers only hold a `ProcedureId` and, optionally, a `ProcedureWaiter`.
//!
//! A handle launches when its owner polls it, or when the caller asks a
//! `ProcedureWaiter` for the result. The waiter signals the latter through a
//! `LaunchRequest` that the DU processor task watches.

pub mod bearer_context;
pub mod orchestrator;

use std::fmt;

use nextgcu_common::{CuCpUeE1apId, CuUpUeE1apId, ProcedureKind};
use tokio::sync::oneshot;
use tracing::trace;

use crate::error::ProcedureError;
use crate::messages::{E1apMessage, E1apResponse, E1apResponsePayload};

pub use bearer_context::{
    BearerContextModificationOutcome, BearerContextModificationProcedure,
    BearerContextModificationRequest, BearerContextReleaseProcedure, BearerContextReleased,
    BearerContextSetupOutcome, BearerContextSetupProcedure, BearerContextSetupRequest,
};
pub use orchestrator::{DiscardReason, ProcedureOrchestrator, ResponseDelivery};

/// Result delivered to a procedure's continuation
pub type ProcedureResult<O> = Result<O, ProcedureError>;

/// Opaque procedure handle id
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcedureId(u64);

impl ProcedureId {
    /// Creates a procedure id from a raw value
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw value
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ProcedureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Procedure handle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcedureState {
    /// Prepared, request not sent
    Idle,
    /// Request sent, waiting for the correlated response
    AwaitingResponse,
    /// Response received and delivered to the continuation
    Completed,
    /// Canceled by the owner or by the deadline
    Canceled,
}

impl ProcedureState {
    /// Returns true for `Completed` and `Canceled`
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcedureState::Completed | ProcedureState::Canceled)
    }
}

impl fmt::Display for ProcedureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcedureState::Idle => write!(f, "Idle"),
            ProcedureState::AwaitingResponse => write!(f, "AwaitingResponse"),
            ProcedureState::Completed => write!(f, "Completed"),
            ProcedureState::Canceled => write!(f, "Canceled"),
        }
    }
}

/// UE id pair a response must carry to reach a handle.
///
/// The local id is always known. The peer id is either seeded at preparation
/// (when the UE already has one) or learned from the first response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrelationKey {
    /// Local UE id
    pub cu_cp_ue_e1ap_id: CuCpUeE1apId,
    /// Peer UE id, once known
    pub cu_up_ue_e1ap_id: Option<CuUpUeE1apId>,
}

impl CorrelationKey {
    /// Key with only the local id known
    pub fn local(cu_cp_ue_e1ap_id: CuCpUeE1apId) -> Self {
        Self {
            cu_cp_ue_e1ap_id,
            cu_up_ue_e1ap_id: None,
        }
    }

    /// Key with both ids known
    pub fn with_peer(cu_cp_ue_e1ap_id: CuCpUeE1apId, cu_up_ue_e1ap_id: CuUpUeE1apId) -> Self {
        Self {
            cu_cp_ue_e1ap_id,
            cu_up_ue_e1ap_id: Some(cu_up_ue_e1ap_id),
        }
    }

    /// Returns true if the response is addressed to this key
    pub fn matches(&self, response: &E1apResponse) -> bool {
        if self.cu_cp_ue_e1ap_id != response.cu_cp_ue_e1ap_id {
            return false;
        }
        match (self.cu_up_ue_e1ap_id, response.cu_up_ue_e1ap_id) {
            (None, _) => true,
            (Some(expected), Some(received)) => expected == received,
            (Some(_), None) => false,
        }
    }

    /// Adopts the peer id of a matched response if none is known yet
    pub fn learn_peer(&mut self, response: &E1apResponse) {
        if self.cu_up_ue_e1ap_id.is_none() {
            self.cu_up_ue_e1ap_id = response.cu_up_ue_e1ap_id;
        }
    }
}

/// A named peer handshake.
///
/// Implementations describe how to build the request, which responses they
/// accept, and how a response becomes the typed outcome. The orchestrator
/// handles launching, correlation and deadlines.
pub trait Procedure: Send + 'static {
    /// Typed outcome handed to the continuation
    type Outcome: Send + 'static;

    /// Procedure type, selects the timeout
    fn kind(&self) -> ProcedureKind;

    /// Builds the outbound request for the given key
    fn build_request(&mut self, key: &CorrelationKey) -> E1apMessage;

    /// Returns true if the payload answers this procedure
    fn accepts(&self, payload: &E1apResponsePayload) -> bool;

    /// Turns the correlated response into the outcome
    fn interpret(self, response: E1apResponse) -> Self::Outcome;
}

/// What to do with a procedure's result once the handle reaches a terminal state.
pub enum Continuation<O> {
    /// Invoke a callback on the DU processor's context
    Callback(Box<dyn FnOnce(ProcedureResult<O>) + Send>),
    /// Send the result through a oneshot channel
    Channel {
        /// Result sender
        tx: oneshot::Sender<ProcedureResult<O>>,
        /// Fires when the waiter asks for the result; taken by the owner
        launch: Option<LaunchRequest>,
    },
    /// Nobody is interested in the result
    Detached,
}

impl<O> Continuation<O> {
    /// Wraps a callback
    pub fn callback<F>(f: F) -> Self
    where
        F: FnOnce(ProcedureResult<O>) + Send + 'static,
    {
        Continuation::Callback(Box::new(f))
    }

    /// Creates a channel continuation and the waiter receiving its result
    pub fn channel(kind: ProcedureKind) -> (Self, ProcedureWaiter<O>) {
        let (tx, rx) = oneshot::channel();
        let (launch_tx, launch_rx) = oneshot::channel();
        (
            Continuation::Channel {
                tx,
                launch: Some(LaunchRequest(launch_rx)),
            },
            ProcedureWaiter {
                kind,
                rx,
                launch: Some(launch_tx),
            },
        )
    }

    /// Takes the launch request of a channel continuation.
    ///
    /// Whoever prepares the procedure watches it and launches the handle once
    /// the waiter asks for the result.
    pub fn take_launch_request(&mut self) -> Option<LaunchRequest> {
        match self {
            Continuation::Channel { launch, .. } => launch.take(),
            _ => None,
        }
    }

    /// Delivers the result. Consumes the continuation so it runs at most once.
    pub(crate) fn resume(self, result: ProcedureResult<O>) {
        match self {
            Continuation::Callback(f) => f(result),
            Continuation::Channel { tx, .. } => {
                if tx.send(result).is_err() {
                    trace!("Procedure waiter dropped before the result arrived");
                }
            }
            Continuation::Detached => {}
        }
    }
}

impl<O> fmt::Debug for Continuation<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Continuation::Callback(_) => write!(f, "Continuation::Callback"),
            Continuation::Channel { .. } => write!(f, "Continuation::Channel"),
            Continuation::Detached => write!(f, "Continuation::Detached"),
        }
    }
}

/// Signal from a `ProcedureWaiter` that its result is wanted
#[derive(Debug)]
pub struct LaunchRequest(oneshot::Receiver<()>);

impl LaunchRequest {
    /// Resolves to true once the result is asked for, or to false if the
    /// waiter was dropped without asking.
    pub async fn requested(self) -> bool {
        self.0.await.is_ok()
    }
}

/// Receiving side of a channel continuation
#[derive(Debug)]
pub struct ProcedureWaiter<O> {
    kind: ProcedureKind,
    rx: oneshot::Receiver<ProcedureResult<O>>,
    launch: Option<oneshot::Sender<()>>,
}

impl<O> ProcedureWaiter<O> {
    /// Waits for the procedure result, launching the procedure if it is still
    /// idle.
    ///
    /// If the owning processor goes away first the procedure counts as canceled.
    pub async fn wait(mut self) -> ProcedureResult<O> {
        self.request_launch();
        let kind = self.kind;
        self.rx
            .await
            .unwrap_or(Err(ProcedureError::Canceled { kind }))
    }

    /// Returns the result if it has already been delivered. Asking also
    /// launches an idle procedure.
    pub fn try_result(&mut self) -> Option<ProcedureResult<O>> {
        self.request_launch();
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => {
                Some(Err(ProcedureError::Canceled { kind: self.kind }))
            }
        }
    }

    fn request_launch(&mut self) {
        if let Some(launch) = self.launch.take() {
            if launch.send(()).is_err() {
                trace!("Launch request dropped, procedure already gone");
            }
        }
    }
}
