//! F1AP and E1AP message types exchanged by the DU processor
//!
//! These are already-decoded representations. Encoding to and from the wire
//! happens outside this crate; the DU processor only sees typed values.

use nextgcu_common::{
    CuCpUeE1apId, CuUpUeE1apId, GnbDuUeF1apId, NrCellId, PduSessionId, Plmn, ProcedureKind, Rnti,
};

use crate::du_processor::UeIndex;
use crate::error::{SetupFailureCause, UeCreationError};

// ============================================================================
// F1AP
// ============================================================================

/// System information broadcast by a served cell
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DuSysInfo {
    /// Packed MIB
    pub mib: Vec<u8>,
    /// Packed SIB1
    pub sib1: Vec<u8>,
}

impl DuSysInfo {
    /// Returns true if the MIB or the SIB1 is empty
    pub fn is_empty(&self) -> bool {
        self.mib.is_empty() || self.sib1.is_empty()
    }
}

/// Served cell entry of an F1 Setup Request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServedCell {
    /// NR cell identity
    pub nr_cell_id: NrCellId,
    /// Physical cell id
    pub pci: u16,
    /// DU system information, mandatory for the CU-CP to accept the cell
    pub sys_info: Option<DuSysInfo>,
}

/// F1 Setup Request sent by a DU
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct F1SetupRequest {
    /// Transaction id echoed in the answer
    pub transaction_id: u8,
    /// gNB-DU id
    pub gnb_du_id: u64,
    /// Optional gNB-DU name
    pub gnb_du_name: Option<String>,
    /// Served cells in request order
    pub served_cells: Vec<ServedCell>,
}

/// Positive answer to an F1 Setup Request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct F1SetupResponse {
    /// Transaction id of the request
    pub transaction_id: u8,
    /// gNB-CU name
    pub gnb_cu_name: String,
    /// Accepted cells, in request order
    pub cells_to_activate: Vec<NrCellId>,
}

/// Negative answer to an F1 Setup Request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct F1SetupFailure {
    /// Transaction id of the request
    pub transaction_id: u8,
    /// Rejection reason
    pub cause: SetupFailureCause,
}

/// Messages the DU processor sends toward the DU
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum F1apMessage {
    /// F1 Setup accepted
    F1SetupResponse(F1SetupResponse),
    /// F1 Setup rejected
    F1SetupFailure(F1SetupFailure),
}

impl F1apMessage {
    /// Procedure name used in protocol logs
    pub fn name(&self) -> &'static str {
        match self {
            F1apMessage::F1SetupResponse(_) => "F1SetupResponse",
            F1apMessage::F1SetupFailure(_) => "F1SetupFailure",
        }
    }
}

/// Request to create a UE context for a UE attaching through the DU
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UeCreationRequest {
    /// C-RNTI assigned by the DU
    pub rnti: Rnti,
    /// Cell the UE attached to
    pub nr_cell_id: NrCellId,
    /// gNB-DU UE F1AP id, if already assigned
    pub du_ue_f1ap_id: Option<GnbDuUeF1apId>,
}

/// Answer to a `UeCreationRequest`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UeCreationResult {
    /// Context created with the given index
    Created(UeIndex),
    /// Creation refused; no state was touched
    Rejected(UeCreationError),
}

impl UeCreationResult {
    /// Returns the UE index, or `None` when rejected
    pub fn ue_index(&self) -> Option<UeIndex> {
        match self {
            UeCreationResult::Created(ue_index) => Some(*ue_index),
            UeCreationResult::Rejected(_) => None,
        }
    }

    /// Returns true for `Created`
    pub fn is_created(&self) -> bool {
        matches!(self, UeCreationResult::Created(_))
    }
}

/// UE Context Release Command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UeContextReleaseCommand {
    /// UE to release
    pub ue_index: UeIndex,
}

// ============================================================================
// E1AP
// ============================================================================

/// E1AP cause values used by the bearer context procedures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum E1apCause {
    /// Unspecified radio network cause
    Unspecified,
    /// Normal release
    NormalRelease,
    /// Procedure canceled
    ProcedureCancelled,
    /// No resources available in the CU-UP
    ResourcesNotAvailable,
    /// Requested 5QI not supported
    NotSupported5qiValue,
    /// Message not compatible with receiver state
    MessageNotCompatibleWithReceiverState,
}

/// PDU session to set up in the CU-UP
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PduSessionSetupItem {
    /// PDU session id
    pub pdu_session_id: PduSessionId,
    /// S-NSSAI SST
    pub sst: u8,
    /// QoS flow ids carried by the session
    pub qos_flows: Vec<u8>,
}

/// PDU session the CU-UP failed to handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PduSessionFailedItem {
    /// PDU session id
    pub pdu_session_id: PduSessionId,
    /// Failure cause
    pub cause: E1apCause,
}

/// Requests sent toward the CU-UP
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum E1apMessage {
    /// Bearer Context Setup Request
    BearerContextSetupRequest {
        /// Local UE id
        cu_cp_ue_e1ap_id: CuCpUeE1apId,
        /// Serving PLMN
        serving_plmn: Plmn,
        /// Sessions to set up
        pdu_sessions: Vec<PduSessionSetupItem>,
    },
    /// Bearer Context Modification Request
    BearerContextModificationRequest {
        /// Local UE id
        cu_cp_ue_e1ap_id: CuCpUeE1apId,
        /// Peer UE id
        cu_up_ue_e1ap_id: CuUpUeE1apId,
        /// Sessions to modify
        pdu_sessions_to_modify: Vec<PduSessionSetupItem>,
        /// Sessions to remove
        pdu_sessions_to_remove: Vec<PduSessionId>,
    },
    /// Bearer Context Release Command
    BearerContextReleaseCommand {
        /// Local UE id
        cu_cp_ue_e1ap_id: CuCpUeE1apId,
        /// Peer UE id
        cu_up_ue_e1ap_id: CuUpUeE1apId,
        /// Release cause
        cause: E1apCause,
    },
}

impl E1apMessage {
    /// Procedure name used in protocol logs
    pub fn name(&self) -> &'static str {
        match self {
            E1apMessage::BearerContextSetupRequest { .. } => "BearerContextSetupRequest",
            E1apMessage::BearerContextModificationRequest { .. } => {
                "BearerContextModificationRequest"
            }
            E1apMessage::BearerContextReleaseCommand { .. } => "BearerContextReleaseCommand",
        }
    }

    /// Local UE id the request is addressed with
    pub fn cu_cp_ue_e1ap_id(&self) -> CuCpUeE1apId {
        match self {
            E1apMessage::BearerContextSetupRequest { cu_cp_ue_e1ap_id, .. }
            | E1apMessage::BearerContextModificationRequest { cu_cp_ue_e1ap_id, .. }
            | E1apMessage::BearerContextReleaseCommand { cu_cp_ue_e1ap_id, .. } => {
                *cu_cp_ue_e1ap_id
            }
        }
    }
}

/// Response payloads received from the CU-UP
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum E1apResponsePayload {
    /// Bearer Context Setup Response
    BearerContextSetupResponse {
        /// Sessions set up
        pdu_sessions_setup: Vec<PduSessionId>,
        /// Sessions that failed
        pdu_sessions_failed: Vec<PduSessionFailedItem>,
    },
    /// Bearer Context Setup Failure
    BearerContextSetupFailure {
        /// Failure cause
        cause: E1apCause,
    },
    /// Bearer Context Modification Response
    BearerContextModificationResponse {
        /// Sessions modified
        pdu_sessions_modified: Vec<PduSessionId>,
        /// Sessions that failed
        pdu_sessions_failed: Vec<PduSessionFailedItem>,
    },
    /// Bearer Context Modification Failure
    BearerContextModificationFailure {
        /// Failure cause
        cause: E1apCause,
    },
    /// Bearer Context Release Complete
    BearerContextReleaseComplete,
}

impl E1apResponsePayload {
    /// Procedure name used in protocol logs
    pub fn name(&self) -> &'static str {
        match self {
            E1apResponsePayload::BearerContextSetupResponse { .. } => "BearerContextSetupResponse",
            E1apResponsePayload::BearerContextSetupFailure { .. } => "BearerContextSetupFailure",
            E1apResponsePayload::BearerContextModificationResponse { .. } => {
                "BearerContextModificationResponse"
            }
            E1apResponsePayload::BearerContextModificationFailure { .. } => {
                "BearerContextModificationFailure"
            }
            E1apResponsePayload::BearerContextReleaseComplete => "BearerContextReleaseComplete",
        }
    }

    /// Procedure this payload answers
    pub fn procedure_kind(&self) -> ProcedureKind {
        match self {
            E1apResponsePayload::BearerContextSetupResponse { .. }
            | E1apResponsePayload::BearerContextSetupFailure { .. } => {
                ProcedureKind::BearerContextSetup
            }
            E1apResponsePayload::BearerContextModificationResponse { .. }
            | E1apResponsePayload::BearerContextModificationFailure { .. } => {
                ProcedureKind::BearerContextModification
            }
            E1apResponsePayload::BearerContextReleaseComplete => ProcedureKind::BearerContextRelease,
        }
    }
}

/// Inbound E1AP message from the CU-UP, addressed by its UE id pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct E1apResponse {
    /// Local UE id echoed by the CU-UP
    pub cu_cp_ue_e1ap_id: CuCpUeE1apId,
    /// Peer UE id, absent in some failure answers
    pub cu_up_ue_e1ap_id: Option<CuUpUeE1apId>,
    /// Message content
    pub payload: E1apResponsePayload,
}
