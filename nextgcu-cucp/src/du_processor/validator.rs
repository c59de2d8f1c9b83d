//! DU Session Validation
//!
//! Pure checks run before any DU processor state is touched. Both functions
//! report the first failing rule in a fixed order.

use nextgcu_common::{NrCellId, Rnti, RntiRange};

use super::cell::CellTable;
use super::ue_context::UeContextStore;
use crate::error::{SetupFailureCause, UeCreationError};
use crate::messages::F1SetupRequest;

/// Checks an F1 Setup Request.
///
/// Order: served cells present, cell count within `max_cells`, every cell
/// carrying non-empty system information.
pub fn validate_setup(request: &F1SetupRequest, max_cells: usize) -> Result<(), SetupFailureCause> {
    if request.served_cells.is_empty() {
        return Err(SetupFailureCause::MissingServedCells);
    }

    if request.served_cells.len() > max_cells {
        return Err(SetupFailureCause::TooManyCells {
            count: request.served_cells.len(),
            max: max_cells,
        });
    }

    if let Some(cell) = request
        .served_cells
        .iter()
        .find(|cell| cell.sys_info.as_ref().map_or(true, |si| si.is_empty()))
    {
        return Err(SetupFailureCause::MissingSystemInformation {
            cell: cell.nr_cell_id,
        });
    }

    Ok(())
}

/// Inputs to the UE creation check
pub struct CreationCheck<'a> {
    /// Accepted RNTI range
    pub rnti_range: RntiRange,
    /// Cells installed by the last accepted setup
    pub cells: &'a CellTable,
    /// Live UE contexts
    pub ues: &'a UeContextStore,
    /// UE capacity
    pub max_ues: u16,
}

/// Checks a UE creation request.
///
/// Order: RNTI in range, cell served, RNTI not bound, UE count below capacity.
pub fn validate_creation(
    rnti: Rnti,
    nr_cell_id: NrCellId,
    check: &CreationCheck<'_>,
) -> Result<(), UeCreationError> {
    if !rnti.is_crnti() || !check.rnti_range.contains(rnti) {
        return Err(UeCreationError::InvalidRnti(rnti));
    }

    if !check.cells.contains(nr_cell_id) {
        return Err(UeCreationError::InvalidCell(nr_cell_id));
    }

    if check.ues.find_by_rnti(rnti).is_some() {
        return Err(UeCreationError::DuplicateUe(rnti));
    }

    if check.ues.count() >= usize::from(check.max_ues) {
        return Err(UeCreationError::CapacityExceeded { max: check.max_ues });
    }

    Ok(())
}
