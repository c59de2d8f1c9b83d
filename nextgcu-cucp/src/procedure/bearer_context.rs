//! E1AP Bearer Context procedures toward the CU-UP

use nextgcu_common::{CuUpUeE1apId, PduSessionId, Plmn, ProcedureKind};

use super::{CorrelationKey, Procedure};
use crate::messages::{
    E1apCause, E1apMessage, E1apResponse, E1apResponsePayload, PduSessionFailedItem,
    PduSessionSetupItem,
};

/// Parameters of a Bearer Context Setup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerContextSetupRequest {
    /// Serving PLMN of the UE
    pub serving_plmn: Plmn,
    /// Sessions to set up
    pub pdu_sessions: Vec<PduSessionSetupItem>,
}

/// Outcome of a Bearer Context Setup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BearerContextSetupOutcome {
    /// CU-UP created the bearer context
    Success {
        /// Peer UE id assigned by the CU-UP
        cu_up_ue_e1ap_id: Option<CuUpUeE1apId>,
        /// Sessions set up
        pdu_sessions_setup: Vec<PduSessionId>,
        /// Sessions that failed
        pdu_sessions_failed: Vec<PduSessionFailedItem>,
    },
    /// CU-UP refused the bearer context
    Failure {
        /// Failure cause
        cause: E1apCause,
    },
}

impl BearerContextSetupOutcome {
    /// Returns true for `Success`
    pub fn is_success(&self) -> bool {
        matches!(self, BearerContextSetupOutcome::Success { .. })
    }
}

/// Bearer Context Setup
#[derive(Debug)]
pub struct BearerContextSetupProcedure {
    request: BearerContextSetupRequest,
}

impl BearerContextSetupProcedure {
    /// Creates the procedure
    pub fn new(request: BearerContextSetupRequest) -> Self {
        Self { request }
    }
}

impl Procedure for BearerContextSetupProcedure {
    type Outcome = BearerContextSetupOutcome;

    fn kind(&self) -> ProcedureKind {
        ProcedureKind::BearerContextSetup
    }

    fn build_request(&mut self, key: &CorrelationKey) -> E1apMessage {
        E1apMessage::BearerContextSetupRequest {
            cu_cp_ue_e1ap_id: key.cu_cp_ue_e1ap_id,
            serving_plmn: self.request.serving_plmn,
            pdu_sessions: self.request.pdu_sessions.clone(),
        }
    }

    fn accepts(&self, payload: &E1apResponsePayload) -> bool {
        matches!(
            payload,
            E1apResponsePayload::BearerContextSetupResponse { .. }
                | E1apResponsePayload::BearerContextSetupFailure { .. }
        )
    }

    fn interpret(self, response: E1apResponse) -> Self::Outcome {
        match response.payload {
            E1apResponsePayload::BearerContextSetupResponse {
                pdu_sessions_setup,
                pdu_sessions_failed,
            } => BearerContextSetupOutcome::Success {
                cu_up_ue_e1ap_id: response.cu_up_ue_e1ap_id,
                pdu_sessions_setup,
                pdu_sessions_failed,
            },
            E1apResponsePayload::BearerContextSetupFailure { cause } => {
                BearerContextSetupOutcome::Failure { cause }
            }
            _ => BearerContextSetupOutcome::Failure {
                cause: E1apCause::MessageNotCompatibleWithReceiverState,
            },
        }
    }
}

/// Parameters of a Bearer Context Modification
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BearerContextModificationRequest {
    /// Sessions to modify
    pub pdu_sessions_to_modify: Vec<PduSessionSetupItem>,
    /// Sessions to remove
    pub pdu_sessions_to_remove: Vec<PduSessionId>,
}

/// Outcome of a Bearer Context Modification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BearerContextModificationOutcome {
    /// CU-UP applied the modification
    Success {
        /// Sessions modified
        pdu_sessions_modified: Vec<PduSessionId>,
        /// Sessions that failed
        pdu_sessions_failed: Vec<PduSessionFailedItem>,
    },
    /// CU-UP refused the modification
    Failure {
        /// Failure cause
        cause: E1apCause,
    },
}

/// Bearer Context Modification.
///
/// Only possible once the CU-UP id of the UE is known.
#[derive(Debug)]
pub struct BearerContextModificationProcedure {
    cu_up_ue_e1ap_id: CuUpUeE1apId,
    request: BearerContextModificationRequest,
}

impl BearerContextModificationProcedure {
    /// Creates the procedure for a UE with a known CU-UP id
    pub fn new(cu_up_ue_e1ap_id: CuUpUeE1apId, request: BearerContextModificationRequest) -> Self {
        Self {
            cu_up_ue_e1ap_id,
            request,
        }
    }
}

impl Procedure for BearerContextModificationProcedure {
    type Outcome = BearerContextModificationOutcome;

    fn kind(&self) -> ProcedureKind {
        ProcedureKind::BearerContextModification
    }

    fn build_request(&mut self, key: &CorrelationKey) -> E1apMessage {
        E1apMessage::BearerContextModificationRequest {
            cu_cp_ue_e1ap_id: key.cu_cp_ue_e1ap_id,
            cu_up_ue_e1ap_id: key.cu_up_ue_e1ap_id.unwrap_or(self.cu_up_ue_e1ap_id),
            pdu_sessions_to_modify: self.request.pdu_sessions_to_modify.clone(),
            pdu_sessions_to_remove: self.request.pdu_sessions_to_remove.clone(),
        }
    }

    fn accepts(&self, payload: &E1apResponsePayload) -> bool {
        matches!(
            payload,
            E1apResponsePayload::BearerContextModificationResponse { .. }
                | E1apResponsePayload::BearerContextModificationFailure { .. }
        )
    }

    fn interpret(self, response: E1apResponse) -> Self::Outcome {
        match response.payload {
            E1apResponsePayload::BearerContextModificationResponse {
                pdu_sessions_modified,
                pdu_sessions_failed,
            } => BearerContextModificationOutcome::Success {
                pdu_sessions_modified,
                pdu_sessions_failed,
            },
            E1apResponsePayload::BearerContextModificationFailure { cause } => {
                BearerContextModificationOutcome::Failure { cause }
            }
            _ => BearerContextModificationOutcome::Failure {
                cause: E1apCause::MessageNotCompatibleWithReceiverState,
            },
        }
    }
}

/// Outcome of a Bearer Context Release: the CU-UP confirmed the release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BearerContextReleased;

/// Bearer Context Release
#[derive(Debug)]
pub struct BearerContextReleaseProcedure {
    cu_up_ue_e1ap_id: CuUpUeE1apId,
    cause: E1apCause,
}

impl BearerContextReleaseProcedure {
    /// Creates the procedure for a UE with a known CU-UP id
    pub fn new(cu_up_ue_e1ap_id: CuUpUeE1apId, cause: E1apCause) -> Self {
        Self {
            cu_up_ue_e1ap_id,
            cause,
        }
    }
}

impl Procedure for BearerContextReleaseProcedure {
    type Outcome = BearerContextReleased;

    fn kind(&self) -> ProcedureKind {
        ProcedureKind::BearerContextRelease
    }

    fn build_request(&mut self, key: &CorrelationKey) -> E1apMessage {
        E1apMessage::BearerContextReleaseCommand {
            cu_cp_ue_e1ap_id: key.cu_cp_ue_e1ap_id,
            cu_up_ue_e1ap_id: key.cu_up_ue_e1ap_id.unwrap_or(self.cu_up_ue_e1ap_id),
            cause: self.cause,
        }
    }

    fn accepts(&self, payload: &E1apResponsePayload) -> bool {
        matches!(payload, E1apResponsePayload::BearerContextReleaseComplete)
    }

    fn interpret(self, _response: E1apResponse) -> Self::Outcome {
        BearerContextReleased
    }
}
