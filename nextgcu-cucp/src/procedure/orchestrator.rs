//! Procedure Orchestrator
//!
//! Owns every procedure handle of one DU processor. Handles are prepared idle,
//! launched on demand, completed by a correlated response, and canceled by
//! their owner or by the shared tick clock.
//!
//! Finished handles are kept in a bounded history so a second response for a
//! completed handle (duplicate) or a response after cancellation (late) can be
//! told apart from a response nobody asked for.

use std::collections::{BTreeMap, HashMap, VecDeque};

use nextgcu_common::{CuCpConfig, CuUpUeE1apId, ProcedureKind, Tick, TickClock};
use tracing::{debug, info, info_span, warn, Span};

use super::{
    Continuation, CorrelationKey, Procedure, ProcedureId, ProcedureState,
};
use crate::du_processor::UeIndex;
use crate::error::ProcedureError;
use crate::messages::{E1apMessage, E1apResponse, E1apResponsePayload};
use crate::notifier::CuUpNotifier;

/// Why a correlated response was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// The handle already completed
    Duplicate,
    /// The handle was canceled before the response arrived
    Late,
}

/// Result of delivering an inbound response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseDelivery {
    /// A waiting handle completed
    Completed {
        /// Completed handle
        id: ProcedureId,
        /// Owning UE
        ue_index: UeIndex,
        /// Procedure type
        kind: ProcedureKind,
        /// Peer id carried by the response
        cu_up_ue_e1ap_id: Option<CuUpUeE1apId>,
    },
    /// The response belongs to a finished handle and was dropped
    Discarded {
        /// Finished handle
        id: ProcedureId,
        /// Drop reason
        reason: DiscardReason,
    },
    /// No handle correlates with the response
    Unmatched,
}

/// Type-erased view of a prepared procedure and its continuation
trait PendingProcedure: Send {
    fn build_request(&mut self, key: &CorrelationKey) -> E1apMessage;
    fn accepts(&self, payload: &E1apResponsePayload) -> bool;
    fn complete(self: Box<Self>, response: E1apResponse);
    fn abort(self: Box<Self>, error: ProcedureError);
}

struct Pending<P: Procedure> {
    procedure: P,
    continuation: Continuation<P::Outcome>,
}

impl<P: Procedure> PendingProcedure for Pending<P> {
    fn build_request(&mut self, key: &CorrelationKey) -> E1apMessage {
        self.procedure.build_request(key)
    }

    fn accepts(&self, payload: &E1apResponsePayload) -> bool {
        self.procedure.accepts(payload)
    }

    fn complete(self: Box<Self>, response: E1apResponse) {
        let Pending {
            procedure,
            continuation,
        } = *self;
        continuation.resume(Ok(procedure.interpret(response)));
    }

    fn abort(self: Box<Self>, error: ProcedureError) {
        let Pending { continuation, .. } = *self;
        continuation.resume(Err(error));
    }
}

/// Live handle
struct Handle {
    ue_index: UeIndex,
    kind: ProcedureKind,
    key: CorrelationKey,
    state: ProcedureState,
    deadline: Option<Tick>,
    pending: Box<dyn PendingProcedure>,
}

/// Terminal handle kept for duplicate detection
#[derive(Debug, Clone, Copy)]
struct FinishedProcedure {
    id: ProcedureId,
    ue_index: UeIndex,
    kind: ProcedureKind,
    key: CorrelationKey,
    state: ProcedureState,
}

/// Procedure orchestrator of one DU processor
pub struct ProcedureOrchestrator {
    handles: BTreeMap<ProcedureId, Handle>,
    finished: VecDeque<FinishedProcedure>,
    history_limit: usize,
    next_id: u64,
    clock: TickClock,
    default_timeout: u64,
    timeout_overrides: HashMap<ProcedureKind, u64>,
    span: Span,
}

impl ProcedureOrchestrator {
    /// Creates an orchestrator with the timers of the given configuration
    pub fn new(config: &CuCpConfig, parent: &Span) -> Self {
        Self {
            handles: BTreeMap::new(),
            finished: VecDeque::new(),
            history_limit: config.procedure_history.max(1),
            next_id: 0,
            clock: TickClock::new(),
            default_timeout: config.procedure_timeout_ticks,
            timeout_overrides: config.procedure_timeout_overrides.clone(),
            span: info_span!(parent: parent, "orchestrator"),
        }
    }

    /// Timeout in ticks applied to the given procedure type
    pub fn timeout_for(&self, kind: ProcedureKind) -> u64 {
        self.timeout_overrides
            .get(&kind)
            .copied()
            .unwrap_or(self.default_timeout)
    }

    /// Current tick
    pub fn now(&self) -> Tick {
        self.clock.now()
    }

    /// Registers a procedure in the `Idle` state. Nothing is sent.
    pub fn prepare<P: Procedure>(
        &mut self,
        ue_index: UeIndex,
        key: CorrelationKey,
        procedure: P,
        continuation: Continuation<P::Outcome>,
    ) -> ProcedureId {
        let _span = self.span.clone().entered();

        let id = ProcedureId::new(self.next_id);
        self.next_id += 1;

        let kind = procedure.kind();
        debug!("Prepared {} {} for ue_index={}", kind, id, ue_index);

        self.handles.insert(
            id,
            Handle {
                ue_index,
                kind,
                key,
                state: ProcedureState::Idle,
                deadline: None,
                pending: Box::new(Pending {
                    procedure,
                    continuation,
                }),
            },
        );
        id
    }

    /// Launches an idle procedure and returns its state.
    ///
    /// Building and sending the request happens here, once. For a handle that
    /// is already running or finished this only reports the state.
    pub fn launch(
        &mut self,
        id: ProcedureId,
        notifier: &mut dyn CuUpNotifier,
    ) -> Result<ProcedureState, ProcedureError> {
        let _span = self.span.clone().entered();

        let deadline = self.clock.deadline_in(self.timeout_for_id(id));
        let Some(handle) = self.handles.get_mut(&id) else {
            return self
                .finished_state(id)
                .ok_or(ProcedureError::UnknownProcedure(id));
        };

        if handle.state == ProcedureState::Idle {
            let request = handle.pending.build_request(&handle.key);
            debug!(
                "Launching {} {} for ue_index={}, deadline {}",
                handle.kind, id, handle.ue_index, deadline
            );
            notifier.send_cu_up_message(request);
            handle.state = ProcedureState::AwaitingResponse;
            handle.deadline = Some(deadline);
        }

        Ok(handle.state)
    }

    /// State of a live or recently finished handle
    pub fn state(&self, id: ProcedureId) -> Option<ProcedureState> {
        self.handles
            .get(&id)
            .map(|handle| handle.state)
            .or_else(|| self.finished_state(id))
    }

    /// Cancels a handle.
    ///
    /// The continuation of a live handle sees `Canceled`. Canceling a finished
    /// handle changes nothing and reports its terminal state.
    pub fn cancel(&mut self, id: ProcedureId) -> Result<ProcedureState, ProcedureError> {
        let _span = self.span.clone().entered();

        match self.handles.remove(&id) {
            Some(handle) => {
                debug!("Canceling {} {} in state {}", handle.kind, id, handle.state);
                let kind = handle.kind;
                self.finish(id, handle, ProcedureState::Canceled)
                    .abort(ProcedureError::Canceled { kind });
                Ok(ProcedureState::Canceled)
            }
            None => self
                .finished_state(id)
                .ok_or(ProcedureError::UnknownProcedure(id)),
        }
    }

    /// Cancels every live handle of a UE and forgets its finished ones.
    ///
    /// Returns the ids that were canceled.
    pub fn cancel_ue(&mut self, ue_index: UeIndex) -> Vec<ProcedureId> {
        let _span = self.span.clone().entered();

        let ids: Vec<ProcedureId> = self
            .handles
            .iter()
            .filter(|(_, handle)| handle.ue_index == ue_index)
            .map(|(id, _)| *id)
            .collect();

        for id in &ids {
            if let Some(handle) = self.handles.remove(id) {
                debug!(
                    "Canceling {} {} of released ue_index={}",
                    handle.kind, id, ue_index
                );
                handle
                    .pending
                    .abort(ProcedureError::Canceled { kind: handle.kind });
            }
        }

        self.finished.retain(|entry| entry.ue_index != ue_index);
        ids
    }

    /// Delivers an inbound response.
    ///
    /// The oldest waiting handle whose key and procedure accept the response
    /// completes; its continuation runs before this returns.
    pub fn handle_response(&mut self, response: E1apResponse) -> ResponseDelivery {
        let _span = self.span.clone().entered();

        let matched = self
            .handles
            .iter()
            .find(|(_, handle)| {
                handle.state == ProcedureState::AwaitingResponse
                    && handle.key.matches(&response)
                    && handle.pending.accepts(&response.payload)
            })
            .map(|(id, _)| *id);

        if let Some((id, mut handle)) =
            matched.and_then(|id| self.handles.remove(&id).map(|handle| (id, handle)))
        {
            handle.key.learn_peer(&response);
            let ue_index = handle.ue_index;
            let kind = handle.kind;
            let cu_up_ue_e1ap_id = response.cu_up_ue_e1ap_id;

            info!("{} {} completed for ue_index={}", kind, id, ue_index);
            self.finish(id, handle, ProcedureState::Completed)
                .complete(response);

            return ResponseDelivery::Completed {
                id,
                ue_index,
                kind,
                cu_up_ue_e1ap_id,
            };
        }

        let kind = response.payload.procedure_kind();
        let finished = self
            .finished
            .iter()
            .rev()
            .find(|entry| entry.kind == kind && entry.key.matches(&response));

        match finished {
            Some(entry) => {
                let reason = if entry.state == ProcedureState::Completed {
                    DiscardReason::Duplicate
                } else {
                    DiscardReason::Late
                };
                warn!(
                    "Discarding {} for finished {} {} ({:?})",
                    response.payload.name(),
                    entry.kind,
                    entry.id,
                    reason
                );
                ResponseDelivery::Discarded {
                    id: entry.id,
                    reason,
                }
            }
            None => {
                warn!(
                    "No procedure waiting for {} (gNB-CU-CP UE E1AP ID {})",
                    response.payload.name(),
                    response.cu_cp_ue_e1ap_id
                );
                ResponseDelivery::Unmatched
            }
        }
    }

    /// Advances the clock by one tick and cancels every expired handle.
    ///
    /// Returns the ids that timed out.
    pub fn tick(&mut self) -> Vec<ProcedureId> {
        let _span = self.span.clone().entered();

        self.clock.advance();
        let expired: Vec<ProcedureId> = self
            .handles
            .iter()
            .filter(|(_, handle)| {
                handle.state == ProcedureState::AwaitingResponse
                    && handle
                        .deadline
                        .is_some_and(|deadline| self.clock.has_reached(deadline))
            })
            .map(|(id, _)| *id)
            .collect();

        for id in &expired {
            if let Some(handle) = self.handles.remove(id) {
                let kind = handle.kind;
                let ticks = self.timeout_for(kind);
                warn!(
                    "{} {} for ue_index={} timed out after {} ticks",
                    kind, id, handle.ue_index, ticks
                );
                self.finish(*id, handle, ProcedureState::Canceled)
                    .abort(ProcedureError::TimedOut { kind, ticks });
            }
        }

        expired
    }

    /// Number of live (idle or waiting) handles
    pub fn active_count(&self) -> usize {
        self.handles.len()
    }

    /// Number of live handles owned by a UE
    pub fn active_for_ue(&self, ue_index: UeIndex) -> usize {
        self.handles
            .values()
            .filter(|handle| handle.ue_index == ue_index)
            .count()
    }

    fn timeout_for_id(&self, id: ProcedureId) -> u64 {
        self.handles
            .get(&id)
            .map_or(self.default_timeout, |handle| self.timeout_for(handle.kind))
    }

    fn finished_state(&self, id: ProcedureId) -> Option<ProcedureState> {
        self.finished
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.state)
    }

    /// Moves a removed handle into the history and hands back its procedure
    fn finish(
        &mut self,
        id: ProcedureId,
        handle: Handle,
        state: ProcedureState,
    ) -> Box<dyn PendingProcedure> {
        self.finished.push_back(FinishedProcedure {
            id,
            ue_index: handle.ue_index,
            kind: handle.kind,
            key: handle.key,
            state,
        });
        while self.finished.len() > self.history_limit {
            self.finished.pop_front();
        }
        handle.pending
    }
}

impl std::fmt::Debug for ProcedureOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcedureOrchestrator")
            .field("active", &self.handles.len())
            .field("finished", &self.finished.len())
            .field("now", &self.clock.now())
            .finish()
    }
}
