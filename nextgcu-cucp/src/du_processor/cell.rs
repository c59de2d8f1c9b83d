//! Served cell records installed by an accepted F1 Setup

use nextgcu_common::NrCellId;

use crate::messages::ServedCell;

/// Cell served by the attached DU
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellRecord {
    /// NR cell identity
    pub nr_cell_id: NrCellId,
    /// Physical cell id
    pub pci: u16,
    /// True if the cell carried system information at setup
    pub has_sys_info: bool,
}

impl From<&ServedCell> for CellRecord {
    fn from(cell: &ServedCell) -> Self {
        Self {
            nr_cell_id: cell.nr_cell_id,
            pci: cell.pci,
            has_sys_info: cell.sys_info.as_ref().is_some_and(|si| !si.is_empty()),
        }
    }
}

/// Cells of the DU, in setup request order.
///
/// Read-only between setups; a new accepted setup replaces the whole set.
#[derive(Debug, Default)]
pub struct CellTable {
    cells: Vec<CellRecord>,
}

impl CellTable {
    /// Creates an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the installed cells with the given served cells
    pub fn install(&mut self, served_cells: &[ServedCell]) {
        self.cells = served_cells.iter().map(CellRecord::from).collect();
    }

    /// Returns true if the cell is served
    pub fn contains(&self, nr_cell_id: NrCellId) -> bool {
        self.get(nr_cell_id).is_some()
    }

    /// Looks up a cell record
    pub fn get(&self, nr_cell_id: NrCellId) -> Option<&CellRecord> {
        self.cells.iter().find(|cell| cell.nr_cell_id == nr_cell_id)
    }

    /// Installed cell ids in setup order
    pub fn ids(&self) -> Vec<NrCellId> {
        self.cells.iter().map(|cell| cell.nr_cell_id).collect()
    }

    /// Number of installed cells
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns true if no setup has been accepted
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
