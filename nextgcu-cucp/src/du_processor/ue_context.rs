//! UE Context Management
//!
//! Authoritative per-UE state of a DU processor, keyed by UE index. A context
//! exists only between a successful creation and the matching release.
//!
//! UE indexes are reused as soon as they are freed, E1AP ids are not: each
//! context gets its gNB-CU-CP UE E1AP id from a running counter, so an answer
//! meant for a released UE never correlates with its successor.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use nextgcu_common::{CuCpUeE1apId, CuUpUeE1apId, GnbDuUeF1apId, NrCellId, Rnti};

use super::ue_index::UeIndex;
use crate::error::UeIndexError;

/// Number of signalling radio bearers per UE (SRB0..SRB3)
pub const MAX_NOF_SRBS: usize = 4;

/// Per-SRB state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SrbContext {
    /// Next PDCP sequence number to assign
    pub next_pdcp_sn: u32,
}

impl SrbContext {
    /// Returns the current sequence number and advances the counter
    pub fn next_sequence(&mut self) -> u32 {
        let sn = self.next_pdcp_sn;
        self.next_pdcp_sn = self.next_pdcp_sn.wrapping_add(1);
        sn
    }
}

/// UE context
#[derive(Debug, Clone)]
pub struct UeContext {
    /// UE index within the DU processor
    pub ue_index: UeIndex,
    /// C-RNTI
    pub rnti: Rnti,
    /// Cell the UE is attached to
    pub nr_cell_id: NrCellId,
    /// gNB-CU-CP UE E1AP id, the local id toward the CU-UP
    pub cu_cp_ue_e1ap_id: CuCpUeE1apId,
    /// gNB-DU UE F1AP id, if assigned by the DU
    pub du_ue_f1ap_id: Option<GnbDuUeF1apId>,
    /// gNB-CU-UP UE E1AP id, learned from the first CU-UP response
    pub cu_up_ue_e1ap_id: Option<CuUpUeE1apId>,
    /// SRB sub-state
    pub srbs: [SrbContext; MAX_NOF_SRBS],
}

impl UeContext {
    /// Creates a new UE context
    pub fn new(
        ue_index: UeIndex,
        cu_cp_ue_e1ap_id: CuCpUeE1apId,
        rnti: Rnti,
        nr_cell_id: NrCellId,
        du_ue_f1ap_id: Option<GnbDuUeF1apId>,
    ) -> Self {
        Self {
            ue_index,
            rnti,
            nr_cell_id,
            cu_cp_ue_e1ap_id,
            du_ue_f1ap_id,
            cu_up_ue_e1ap_id: None,
            srbs: [SrbContext::default(); MAX_NOF_SRBS],
        }
    }
}

/// UE context store
#[derive(Debug, Default)]
pub struct UeContextStore {
    contexts: BTreeMap<UeIndex, UeContext>,
    next_cu_cp_ue_e1ap_id: u32,
}

impl UeContextStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context for an index reserved from the pool.
    ///
    /// The caller validates and allocates first; an existing entry under the
    /// same index is replaced.
    pub fn create(
        &mut self,
        ue_index: UeIndex,
        rnti: Rnti,
        nr_cell_id: NrCellId,
        du_ue_f1ap_id: Option<GnbDuUeF1apId>,
    ) -> &UeContext {
        let cu_cp_ue_e1ap_id = self.allocate_cu_cp_ue_e1ap_id();
        let ctx = UeContext::new(ue_index, cu_cp_ue_e1ap_id, rnti, nr_cell_id, du_ue_f1ap_id);
        match self.contexts.entry(ue_index) {
            Entry::Occupied(mut entry) => {
                entry.insert(ctx);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(ctx),
        }
    }

    /// Removes a context
    pub fn remove(&mut self, ue_index: UeIndex) -> Result<UeContext, UeIndexError> {
        self.contexts
            .remove(&ue_index)
            .ok_or(UeIndexError::InvalidIndex(ue_index))
    }

    /// Looks up a context
    pub fn lookup(&self, ue_index: UeIndex) -> Option<&UeContext> {
        self.contexts.get(&ue_index)
    }

    /// Looks up a mutable context
    pub fn lookup_mut(&mut self, ue_index: UeIndex) -> Option<&mut UeContext> {
        self.contexts.get_mut(&ue_index)
    }

    /// Finds the context bound to an RNTI
    pub fn find_by_rnti(&self, rnti: Rnti) -> Option<&UeContext> {
        self.contexts.values().find(|ctx| ctx.rnti == rnti)
    }

    /// Finds the context bound to a gNB-CU-CP UE E1AP id
    pub fn find_by_cu_cp_ue_e1ap_id(&self, id: CuCpUeE1apId) -> Option<&UeContext> {
        self.contexts.values().find(|ctx| ctx.cu_cp_ue_e1ap_id == id)
    }

    /// Number of live contexts
    pub fn count(&self) -> usize {
        self.contexts.len()
    }

    /// Indexes of all live contexts
    pub fn ue_indexes(&self) -> Vec<UeIndex> {
        self.contexts.keys().copied().collect()
    }

    // Live contexts are bounded by the UE index range, so a free id is
    // always found.
    fn allocate_cu_cp_ue_e1ap_id(&mut self) -> CuCpUeE1apId {
        loop {
            let id = CuCpUeE1apId(self.next_cu_cp_ue_e1ap_id);
            self.next_cu_cp_ue_e1ap_id = self.next_cu_cp_ue_e1ap_id.wrapping_add(1);
            if self.find_by_cu_cp_ue_e1ap_id(id).is_none() {
                return id;
            }
        }
    }
}
