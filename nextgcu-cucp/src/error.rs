//! Error types for the CU-CP
//!
//! Each component reports its own failure enum; `CuCpError` is the umbrella
//! type returned by the DU processor's public operations and classifies every
//! failure into an `ErrorKind`.

use std::fmt;

use nextgcu_common::{NrCellId, ProcedureKind, Rnti};
use thiserror::Error;

use crate::du_processor::UeIndex;
use crate::procedure::ProcedureId;

/// Reasons an F1 Setup Request is rejected.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SetupFailureCause {
    /// The request carries no served cells
    #[error("served cells list is missing")]
    MissingServedCells,

    /// The request carries more cells than the configured maximum
    #[error("{count} served cells exceed the maximum of {max}")]
    TooManyCells {
        /// Number of cells in the request
        count: usize,
        /// Configured maximum
        max: usize,
    },

    /// A served cell has no (or empty) system information
    #[error("served cell {cell} lacks system information")]
    MissingSystemInformation {
        /// Offending cell
        cell: NrCellId,
    },
}

/// Reasons a UE creation request is rejected.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum UeCreationError {
    /// RNTI outside the configured C-RNTI range
    #[error("RNTI {0} is not a valid C-RNTI")]
    InvalidRnti(Rnti),

    /// Cell not served by the attached DU
    #[error("cell {0} is not served by this DU")]
    InvalidCell(NrCellId),

    /// RNTI already bound to a live UE context
    #[error("RNTI {0} is already in use")]
    DuplicateUe(Rnti),

    /// UE count reached the pool capacity
    #[error("maximum number of UEs ({max}) reached")]
    CapacityExceeded {
        /// Configured capacity
        max: u16,
    },
}

/// UE index pool and context store errors.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum UeIndexError {
    /// No free index left
    #[error("UE index pool exhausted (capacity {capacity})")]
    CapacityExceeded {
        /// Pool capacity
        capacity: u16,
    },

    /// Index is out of range or not in use
    #[error("invalid UE index {0}")]
    InvalidIndex(UeIndex),
}

/// Failure outcomes of a procedure handle.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ProcedureError {
    /// No correlated response arrived before the deadline
    #[error("{kind} timed out after {ticks} ticks")]
    TimedOut {
        /// Procedure type
        kind: ProcedureKind,
        /// Timeout that elapsed
        ticks: u64,
    },

    /// The procedure was canceled before completion
    #[error("{kind} was canceled")]
    Canceled {
        /// Procedure type
        kind: ProcedureKind,
    },

    /// No handle with the given id exists
    #[error("unknown procedure {0}")]
    UnknownProcedure(ProcedureId),
}

/// Identifier referenced by a caller that could not be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identifier {
    /// UE index
    UeIndex(UeIndex),
    /// Procedure id
    Procedure(ProcedureId),
    /// CU-UP UE E1AP id not yet known for a UE
    CuUpUeE1apId(UeIndex),
    /// Signalling radio bearer id
    Srb(u8),
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::UeIndex(ue_index) => write!(f, "ue_index={ue_index}"),
            Identifier::Procedure(id) => write!(f, "procedure={id}"),
            Identifier::CuUpUeE1apId(ue_index) => {
                write!(f, "gNB-CU-UP UE E1AP ID of ue_index={ue_index}")
            }
            Identifier::Srb(srb_id) => write!(f, "srb={srb_id}"),
        }
    }
}

/// Error classification shared by every CU-CP failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Structural setup request violation
    MalformedRequest,
    /// Index pool or UE count exhausted
    CapacityExceeded,
    /// RNTI already bound
    DuplicateUe,
    /// Unknown RNTI, cell, UE index or procedure
    InvalidIdentifier,
    /// No correlated response before the deadline
    ProcedureTimeout,
    /// Procedure canceled by its owner
    ProcedureCanceled,
    /// Response for an already finished handle
    UnexpectedDuplicateResponse,
}

/// Umbrella error of the CU-CP public operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CuCpError {
    /// F1 Setup Request violates structural rules
    #[error("malformed request: {0}")]
    MalformedRequest(#[from] SetupFailureCause),

    /// Capacity exhausted
    #[error("capacity exceeded: at most {max} UEs")]
    CapacityExceeded {
        /// Configured UE capacity
        max: u16,
    },

    /// RNTI already bound to a UE
    #[error("duplicate UE with RNTI {0}")]
    DuplicateUe(Rnti),

    /// Unknown identifier
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(Identifier),

    /// Unknown RNTI value (outside the accepted range)
    #[error("invalid RNTI {0}")]
    InvalidRnti(Rnti),

    /// Unknown cell
    #[error("invalid cell {0}")]
    InvalidCell(NrCellId),

    /// Procedure deadline elapsed
    #[error("{kind} timed out after {ticks} ticks")]
    ProcedureTimeout {
        /// Procedure type
        kind: ProcedureKind,
        /// Timeout that elapsed
        ticks: u64,
    },

    /// Procedure canceled
    #[error("{0} canceled")]
    ProcedureCanceled(ProcedureKind),

    /// Response for an already finished procedure
    #[error("unexpected duplicate response for procedure {0}")]
    UnexpectedDuplicateResponse(ProcedureId),
}

impl CuCpError {
    /// Classifies the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            CuCpError::MalformedRequest(_) => ErrorKind::MalformedRequest,
            CuCpError::CapacityExceeded { .. } => ErrorKind::CapacityExceeded,
            CuCpError::DuplicateUe(_) => ErrorKind::DuplicateUe,
            CuCpError::InvalidIdentifier(_)
            | CuCpError::InvalidRnti(_)
            | CuCpError::InvalidCell(_) => ErrorKind::InvalidIdentifier,
            CuCpError::ProcedureTimeout { .. } => ErrorKind::ProcedureTimeout,
            CuCpError::ProcedureCanceled(_) => ErrorKind::ProcedureCanceled,
            CuCpError::UnexpectedDuplicateResponse(_) => ErrorKind::UnexpectedDuplicateResponse,
        }
    }
}

impl From<UeCreationError> for CuCpError {
    fn from(err: UeCreationError) -> Self {
        match err {
            UeCreationError::InvalidRnti(rnti) => CuCpError::InvalidRnti(rnti),
            UeCreationError::InvalidCell(cell) => CuCpError::InvalidCell(cell),
            UeCreationError::DuplicateUe(rnti) => CuCpError::DuplicateUe(rnti),
            UeCreationError::CapacityExceeded { max } => CuCpError::CapacityExceeded { max },
        }
    }
}

impl From<UeIndexError> for CuCpError {
    fn from(err: UeIndexError) -> Self {
        match err {
            UeIndexError::CapacityExceeded { capacity } => {
                CuCpError::CapacityExceeded { max: capacity }
            }
            UeIndexError::InvalidIndex(ue_index) => {
                CuCpError::InvalidIdentifier(Identifier::UeIndex(ue_index))
            }
        }
    }
}

impl From<ProcedureError> for CuCpError {
    fn from(err: ProcedureError) -> Self {
        match err {
            ProcedureError::TimedOut { kind, ticks } => CuCpError::ProcedureTimeout { kind, ticks },
            ProcedureError::Canceled { kind } => CuCpError::ProcedureCanceled(kind),
            ProcedureError::UnknownProcedure(id) => {
                CuCpError::InvalidIdentifier(Identifier::Procedure(id))
            }
        }
    }
}
