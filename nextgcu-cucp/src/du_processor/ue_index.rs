//! UE Index Allocation
//!
//! Each DU processor hands out UE indexes from a bounded pool. The free set
//! is ordered, so `allocate` always returns the lowest-numbered free slot and
//! a released index is the first one reused.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::UeIndexError;

/// UE index, unique within one DU processor for the lifetime of the UE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UeIndex(u16);

impl UeIndex {
    /// Sentinel outside every valid pool range
    pub const INVALID: UeIndex = UeIndex(u16::MAX);

    /// Creates a UE index from a raw value
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    /// Returns the raw index value
    pub fn value(&self) -> u16 {
        self.0
    }

    /// Returns false for the `INVALID` sentinel
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }
}

impl fmt::Display for UeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}", self.0)
        } else {
            write!(f, "invalid")
        }
    }
}

/// Bounded pool of UE indexes in `[0, capacity)`.
#[derive(Debug)]
pub struct UeIndexPool {
    capacity: u16,
    free: BTreeSet<u16>,
}

impl UeIndexPool {
    /// Creates a pool with every index in `[0, capacity)` free.
    ///
    /// The range never reaches the `INVALID` sentinel.
    pub fn new(capacity: u16) -> Self {
        Self {
            capacity,
            free: (0..capacity).collect(),
        }
    }

    /// Reserves the lowest free index
    pub fn allocate(&mut self) -> Result<UeIndex, UeIndexError> {
        self.free
            .pop_first()
            .map(UeIndex)
            .ok_or(UeIndexError::CapacityExceeded {
                capacity: self.capacity,
            })
    }

    /// Returns an index to the pool.
    ///
    /// Releasing an out-of-range or already free index is rejected.
    pub fn release(&mut self, ue_index: UeIndex) -> Result<(), UeIndexError> {
        if ue_index.0 >= self.capacity || !self.free.insert(ue_index.0) {
            return Err(UeIndexError::InvalidIndex(ue_index));
        }
        Ok(())
    }

    /// Returns true if the index is currently reserved
    pub fn is_allocated(&self, ue_index: UeIndex) -> bool {
        ue_index.0 < self.capacity && !self.free.contains(&ue_index.0)
    }

    /// Pool capacity
    pub fn capacity(&self) -> u16 {
        self.capacity
    }

    /// Number of reserved indexes
    pub fn allocated(&self) -> usize {
        self.capacity as usize - self.free.len()
    }

    /// Number of free indexes
    pub fn available(&self) -> usize {
        self.free.len()
    }
}
