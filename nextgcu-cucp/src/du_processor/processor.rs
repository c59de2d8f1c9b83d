//! DU Processor
//!
//! One `DuProcessor` exists per attached DU. It validates F1 setup and UE
//! creation requests, owns the UE index pool and the UE contexts, and drives
//! the bearer context procedures toward the CU-UP.
//!
//! Every handler runs to completion before the next one starts; the owning
//! `DuProcessorTask` serializes all inbound events onto this object.

use nextgcu_common::{
    log_e1ap_message, log_f1ap_message, CuCpConfig, CuUpUeE1apId, Direction, DuIndex, HexDump,
    Tick,
};
use tracing::{debug, info, info_span, warn, Span};

use super::cell::CellTable;
use super::stats::DuProcessorStats;
use super::ue_context::{UeContext, UeContextStore};
use super::ue_index::{UeIndex, UeIndexPool};
use super::validator::{validate_creation, validate_setup, CreationCheck};
use crate::error::{CuCpError, Identifier, UeCreationError, UeIndexError};
use crate::messages::{
    E1apCause, E1apResponse, F1SetupFailure, F1SetupRequest, F1SetupResponse, F1apMessage,
    UeContextReleaseCommand, UeCreationRequest, UeCreationResult,
};
use crate::notifier::{CuUpNotifier, DuNotifier};
use crate::procedure::{
    BearerContextModificationOutcome, BearerContextModificationProcedure,
    BearerContextModificationRequest, BearerContextReleaseProcedure, BearerContextReleased,
    BearerContextSetupOutcome, BearerContextSetupProcedure, BearerContextSetupRequest,
    Continuation, CorrelationKey, DiscardReason, ProcedureId, ProcedureOrchestrator,
    ProcedureState, ResponseDelivery,
};

/// Identity of the DU, recorded by an accepted F1 Setup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuInfo {
    /// gNB-DU id
    pub gnb_du_id: u64,
    /// gNB-DU name
    pub gnb_du_name: Option<String>,
}

/// Control-plane state of one DU
pub struct DuProcessor {
    du_index: DuIndex,
    config: CuCpConfig,
    du_info: Option<DuInfo>,
    cells: CellTable,
    ue_indexes: UeIndexPool,
    ues: UeContextStore,
    orchestrator: ProcedureOrchestrator,
    du_notifier: Box<dyn DuNotifier>,
    cu_up_notifier: Box<dyn CuUpNotifier>,
    stats: DuProcessorStats,
    span: Span,
}

impl DuProcessor {
    /// Creates a DU processor with empty cell and UE state
    pub fn new(
        du_index: DuIndex,
        config: CuCpConfig,
        du_notifier: Box<dyn DuNotifier>,
        cu_up_notifier: Box<dyn CuUpNotifier>,
    ) -> Self {
        let span = info_span!("du_processor", du_index = du_index.0);
        let orchestrator = ProcedureOrchestrator::new(&config, &span);

        Self {
            du_index,
            ue_indexes: UeIndexPool::new(config.max_ues),
            config,
            du_info: None,
            cells: CellTable::new(),
            ues: UeContextStore::new(),
            orchestrator,
            du_notifier,
            cu_up_notifier,
            stats: DuProcessorStats::new(du_index.0),
            span,
        }
    }

    /// Handles an F1 Setup Request.
    ///
    /// The DU always gets an answer. On rejection the installed cells and the
    /// recorded DU identity stay as they were.
    pub fn handle_f1_setup_request(&mut self, request: F1SetupRequest) -> Result<(), CuCpError> {
        let _span = self.span.clone().entered();
        log_f1ap_message(Direction::Rx, "F1SetupRequest", None);

        if let Err(cause) = validate_setup(&request, self.config.max_cells_per_setup) {
            warn!(
                "Rejecting F1 Setup from gNB-DU {}: {}",
                request.gnb_du_id, cause
            );
            self.stats.f1_setups_rejected += 1;
            self.send_du_message(F1apMessage::F1SetupFailure(F1SetupFailure {
                transaction_id: request.transaction_id,
                cause,
            }));
            return Err(CuCpError::MalformedRequest(cause));
        }

        self.cells.install(&request.served_cells);
        for cell in &request.served_cells {
            if let Some(sys_info) = &cell.sys_info {
                debug!("Cell {} SIB1 {}", cell.nr_cell_id, HexDump(&sys_info.sib1));
            }
        }
        self.du_info = Some(DuInfo {
            gnb_du_id: request.gnb_du_id,
            gnb_du_name: request.gnb_du_name,
        });
        self.stats.f1_setups_accepted += 1;

        info!(
            "F1 Setup accepted for gNB-DU {} with {} cell(s)",
            request.gnb_du_id,
            self.cells.len()
        );

        self.send_du_message(F1apMessage::F1SetupResponse(F1SetupResponse {
            transaction_id: request.transaction_id,
            gnb_cu_name: self.config.gnb_cu_name.clone(),
            cells_to_activate: self.cells.ids(),
        }));
        Ok(())
    }

    /// Handles a UE creation request: validate, reserve an index, create the context.
    pub fn handle_ue_creation_request(&mut self, request: UeCreationRequest) -> UeCreationResult {
        let _span = self.span.clone().entered();

        let check = CreationCheck {
            rnti_range: self.config.rnti_range,
            cells: &self.cells,
            ues: &self.ues,
            max_ues: self.config.max_ues,
        };
        let result = validate_creation(request.rnti, request.nr_cell_id, &check)
            .and_then(|()| {
                self.ue_indexes.allocate().map_err(|_| UeCreationError::CapacityExceeded {
                    max: self.config.max_ues,
                })
            });

        match result {
            Ok(ue_index) => {
                self.ues.create(
                    ue_index,
                    request.rnti,
                    request.nr_cell_id,
                    request.du_ue_f1ap_id,
                );
                self.stats.ues_created += 1;
                self.stats.active_ues = self.ues.count();
                info!(
                    "Created UE context ue_index={} rnti={} cell={}",
                    ue_index, request.rnti, request.nr_cell_id
                );
                UeCreationResult::Created(ue_index)
            }
            Err(e) => {
                self.stats.ue_creations_rejected += 1;
                warn!("UE creation for rnti={} rejected: {}", request.rnti, e);
                UeCreationResult::Rejected(e)
            }
        }
    }

    /// Handles a UE Context Release Command.
    ///
    /// Cancels the procedures the UE owns, then removes its context and frees
    /// its index. An unknown index is the only failure.
    pub fn handle_ue_context_release_command(
        &mut self,
        command: UeContextReleaseCommand,
    ) -> Result<(), CuCpError> {
        let _span = self.span.clone().entered();
        let ue_index = command.ue_index;

        if self.ues.lookup(ue_index).is_none() {
            warn!("Release for unknown ue_index={}", ue_index);
            return Err(UeIndexError::InvalidIndex(ue_index).into());
        }

        let canceled = self.orchestrator.cancel_ue(ue_index);
        self.stats.procedures_canceled += canceled.len() as u64;

        self.ues.remove(ue_index)?;
        self.ue_indexes.release(ue_index)?;
        self.stats.ues_released += 1;
        self.stats.active_ues = self.ues.count();

        info!(
            "Released UE context ue_index={} ({} procedure(s) canceled)",
            ue_index,
            canceled.len()
        );
        Ok(())
    }

    /// Prepares a Bearer Context Setup for a UE. Nothing is sent until the
    /// procedure is polled or its result is awaited.
    pub fn start_bearer_context_setup(
        &mut self,
        ue_index: UeIndex,
        request: BearerContextSetupRequest,
        continuation: Continuation<BearerContextSetupOutcome>,
    ) -> Result<ProcedureId, CuCpError> {
        let key = self.correlation_key(ue_index)?;
        let id = self.orchestrator.prepare(
            ue_index,
            key,
            BearerContextSetupProcedure::new(request),
            continuation,
        );
        self.stats.procedures_started += 1;
        Ok(id)
    }

    /// Prepares a Bearer Context Modification. The UE must already have a
    /// CU-UP UE E1AP id.
    pub fn start_bearer_context_modification(
        &mut self,
        ue_index: UeIndex,
        request: BearerContextModificationRequest,
        continuation: Continuation<BearerContextModificationOutcome>,
    ) -> Result<ProcedureId, CuCpError> {
        let (key, cu_up_ue_e1ap_id) = self.peer_correlation_key(ue_index)?;
        let id = self.orchestrator.prepare(
            ue_index,
            key,
            BearerContextModificationProcedure::new(cu_up_ue_e1ap_id, request),
            continuation,
        );
        self.stats.procedures_started += 1;
        Ok(id)
    }

    /// Prepares a Bearer Context Release. The UE must already have a CU-UP UE
    /// E1AP id.
    pub fn start_bearer_context_release(
        &mut self,
        ue_index: UeIndex,
        cause: E1apCause,
        continuation: Continuation<BearerContextReleased>,
    ) -> Result<ProcedureId, CuCpError> {
        let (key, cu_up_ue_e1ap_id) = self.peer_correlation_key(ue_index)?;
        let id = self.orchestrator.prepare(
            ue_index,
            key,
            BearerContextReleaseProcedure::new(cu_up_ue_e1ap_id, cause),
            continuation,
        );
        self.stats.procedures_started += 1;
        Ok(id)
    }

    /// Asks for a procedure's readiness, launching it if still idle
    pub fn poll_procedure(&mut self, id: ProcedureId) -> Result<ProcedureState, CuCpError> {
        let _span = self.span.clone().entered();
        Ok(self.orchestrator.launch(id, self.cu_up_notifier.as_mut())?)
    }

    /// State of a procedure, `None` once it is unknown or forgotten
    pub fn procedure_state(&self, id: ProcedureId) -> Option<ProcedureState> {
        self.orchestrator.state(id)
    }

    /// Cancels a procedure. Idempotent; a finished procedure is left as is.
    pub fn cancel_procedure(&mut self, id: ProcedureId) -> Result<ProcedureState, CuCpError> {
        let _span = self.span.clone().entered();
        let was_live = self
            .orchestrator
            .state(id)
            .is_some_and(|state| !state.is_terminal());

        let state = self.orchestrator.cancel(id)?;
        if was_live {
            self.stats.procedures_canceled += 1;
        }
        Ok(state)
    }

    /// Delivers an inbound E1AP response to the orchestrator.
    ///
    /// Duplicates and late or unmatched responses are logged and dropped.
    pub fn handle_e1ap_message(&mut self, response: E1apResponse) -> ResponseDelivery {
        let _span = self.span.clone().entered();
        log_e1ap_message(
            Direction::Rx,
            response.payload.name(),
            self.ues
                .find_by_cu_cp_ue_e1ap_id(response.cu_cp_ue_e1ap_id)
                .map(|ctx| ctx.ue_index.value()),
        );

        let delivery = self.orchestrator.handle_response(response);
        match delivery {
            ResponseDelivery::Completed {
                ue_index,
                cu_up_ue_e1ap_id: Some(cu_up_ue_e1ap_id),
                ..
            } => {
                self.stats.procedures_completed += 1;
                if let Some(ctx) = self.ues.lookup_mut(ue_index) {
                    if ctx.cu_up_ue_e1ap_id.is_none() {
                        debug!(
                            "ue_index={} bound to gNB-CU-UP UE E1AP ID {}",
                            ue_index, cu_up_ue_e1ap_id
                        );
                        ctx.cu_up_ue_e1ap_id = Some(cu_up_ue_e1ap_id);
                    }
                }
            }
            ResponseDelivery::Completed { .. } => {
                self.stats.procedures_completed += 1;
            }
            ResponseDelivery::Discarded { id, reason } => {
                self.stats.responses_discarded += 1;
                if reason == DiscardReason::Duplicate {
                    warn!("{}", CuCpError::UnexpectedDuplicateResponse(id));
                }
            }
            ResponseDelivery::Unmatched => {
                self.stats.responses_unmatched += 1;
            }
        }
        delivery
    }

    /// Advances the procedure clock by one tick. Returns the procedures that
    /// timed out.
    pub fn tick(&mut self) -> Vec<ProcedureId> {
        let _span = self.span.clone().entered();
        let expired = self.orchestrator.tick();
        if !expired.is_empty() {
            debug!("{} procedure(s) timed out at {}", expired.len(), self.now());
        }
        self.stats.procedures_timed_out += expired.len() as u64;
        expired
    }

    /// Returns and advances the next PDCP sequence number of an SRB
    pub fn next_srb_sequence(&mut self, ue_index: UeIndex, srb_id: u8) -> Result<u32, CuCpError> {
        let ctx = self
            .ues
            .lookup_mut(ue_index)
            .ok_or(CuCpError::InvalidIdentifier(Identifier::UeIndex(ue_index)))?;
        let srb = ctx
            .srbs
            .get_mut(usize::from(srb_id))
            .ok_or(CuCpError::InvalidIdentifier(Identifier::Srb(srb_id)))?;
        Ok(srb.next_sequence())
    }

    /// Number of live UE contexts
    pub fn nof_ues(&self) -> usize {
        self.ues.count()
    }

    /// Looks up a UE context
    pub fn find_ue(&self, ue_index: UeIndex) -> Option<&UeContext> {
        self.ues.lookup(ue_index)
    }

    /// Cells installed by the last accepted F1 Setup
    pub fn cells(&self) -> &CellTable {
        &self.cells
    }

    /// DU identity, once a setup was accepted
    pub fn du_info(&self) -> Option<&DuInfo> {
        self.du_info.as_ref()
    }

    /// DU index of this processor
    pub fn du_index(&self) -> DuIndex {
        self.du_index
    }

    /// Current procedure tick
    pub fn now(&self) -> Tick {
        self.orchestrator.now()
    }

    /// Number of live procedures
    pub fn active_procedures(&self) -> usize {
        self.orchestrator.active_count()
    }

    /// Counters of this processor
    pub fn stats(&self) -> &DuProcessorStats {
        &self.stats
    }

    fn send_du_message(&mut self, msg: F1apMessage) {
        log_f1ap_message(Direction::Tx, msg.name(), None);
        self.du_notifier.send_du_message(msg);
    }

    fn correlation_key(&self, ue_index: UeIndex) -> Result<CorrelationKey, CuCpError> {
        let ctx = self
            .ues
            .lookup(ue_index)
            .ok_or(CuCpError::InvalidIdentifier(Identifier::UeIndex(ue_index)))?;
        Ok(CorrelationKey {
            cu_cp_ue_e1ap_id: ctx.cu_cp_ue_e1ap_id,
            cu_up_ue_e1ap_id: ctx.cu_up_ue_e1ap_id,
        })
    }

    fn peer_correlation_key(
        &self,
        ue_index: UeIndex,
    ) -> Result<(CorrelationKey, CuUpUeE1apId), CuCpError> {
        let key = self.correlation_key(ue_index)?;
        let cu_up_ue_e1ap_id = key
            .cu_up_ue_e1ap_id
            .ok_or(CuCpError::InvalidIdentifier(Identifier::CuUpUeE1apId(ue_index)))?;
        Ok((key, cu_up_ue_e1ap_id))
    }
}

impl std::fmt::Debug for DuProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuProcessor")
            .field("du_index", &self.du_index)
            .field("cells", &self.cells.len())
            .field("ues", &self.ues.count())
            .field("orchestrator", &self.orchestrator)
            .finish()
    }
}
