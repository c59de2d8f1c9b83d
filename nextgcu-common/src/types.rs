//! Core identifier types: PLMN, RNTI, NR cell identity, F1AP/E1AP UE ids, etc.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Public Land Mobile Network identifier.
///
/// A PLMN consists of:
/// - MCC (Mobile Country Code): 3 decimal digits (001-999)
/// - MNC (Mobile Network Code): 2 or 3 decimal digits
///
/// The `long_mnc` field indicates whether the MNC uses 3 digits (true) or 2 digits (false).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Plmn {
    /// Mobile Country Code (3 digits, range 0-999)
    pub mcc: u16,
    /// Mobile Network Code (2-3 digits, range 0-999)
    pub mnc: u16,
    /// True if MNC is 3 digits, false if 2 digits
    pub long_mnc: bool,
}

impl Plmn {
    /// Creates a new PLMN with the given MCC and MNC.
    pub const fn new(mcc: u16, mnc: u16, long_mnc: bool) -> Self {
        Self { mcc, mnc, long_mnc }
    }

    /// Returns true if this PLMN has valid values set.
    pub fn has_value(&self) -> bool {
        self.mcc > 0 || self.mnc > 0
    }
}

impl fmt::Debug for Plmn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.long_mnc {
            write!(f, "Plmn({:03}-{:03})", self.mcc, self.mnc)
        } else {
            write!(f, "Plmn({:03}-{:02})", self.mcc, self.mnc)
        }
    }
}

impl fmt::Display for Plmn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.long_mnc {
            write!(f, "{:03}{:03}", self.mcc, self.mnc)
        } else {
            write!(f, "{:03}{:02}", self.mcc, self.mnc)
        }
    }
}

/// Radio Network Temporary Identifier.
///
/// C-RNTI values live in `0x0001..=0xFFEF` (TS 38.321 Table 7.1-1). Zero is
/// reserved and the top of the range is taken by P-RNTI/SI-RNTI and reserved values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Rnti(pub u16);

impl Rnti {
    /// Reserved value, never assigned to a UE
    pub const INVALID: Rnti = Rnti(0);
    /// Lowest assignable C-RNTI
    pub const MIN_CRNTI: Rnti = Rnti(0x0001);
    /// Highest assignable C-RNTI
    pub const MAX_CRNTI: Rnti = Rnti(0xFFEF);

    /// Returns the raw RNTI value
    pub fn value(&self) -> u16 {
        self.0
    }

    /// Returns true if the value lies in the C-RNTI range
    pub fn is_crnti(&self) -> bool {
        *self >= Self::MIN_CRNTI && *self <= Self::MAX_CRNTI
    }
}

impl fmt::Display for Rnti {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

impl From<u16> for Rnti {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

/// NR Cell Identity (36-bit value)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NrCellId(u64);

impl NrCellId {
    /// Mask of the 36 significant bits
    pub const MASK: u64 = 0xF_FFFF_FFFF;

    /// Creates a cell identity, keeping only the lower 36 bits
    pub const fn new(value: u64) -> Self {
        Self(value & Self::MASK)
    }

    /// Returns the raw identity value
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NrCellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#011x}", self.0)
    }
}

/// Index of a DU attached to this CU-CP
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DuIndex(pub u16);

impl fmt::Display for DuIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// gNB-DU UE F1AP ID (assigned by the DU)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GnbDuUeF1apId(pub u32);

/// gNB-CU-CP UE E1AP ID (assigned locally)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CuCpUeE1apId(pub u32);

/// gNB-CU-UP UE E1AP ID (assigned by the CU-UP)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CuUpUeE1apId(pub u32);

impl fmt::Display for CuCpUeE1apId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for CuUpUeE1apId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// PDU Session ID (1-15)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PduSessionId(pub u8);

/// Types of peer handshakes driven by the procedure orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcedureKind {
    /// E1AP Bearer Context Setup
    BearerContextSetup,
    /// E1AP Bearer Context Modification
    BearerContextModification,
    /// E1AP Bearer Context Release
    BearerContextRelease,
}

impl fmt::Display for ProcedureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcedureKind::BearerContextSetup => write!(f, "BearerContextSetup"),
            ProcedureKind::BearerContextModification => write!(f, "BearerContextModification"),
            ProcedureKind::BearerContextRelease => write!(f, "BearerContextRelease"),
        }
    }
}
