//! Memory access fault definitions.
//!
//! This module defines the fault type the memory manager reports to the CPU.
//! Faults never unwind through the pipeline: the control unit turns an
//! unmapped read into a read of zero and keeps executing.

use std::fmt;

/// Faults raised by virtual-to-physical translation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessError {
    /// Read of a virtual page that was never written and is not in swap.
    ///
    /// The associated value is the faulting virtual byte address. The caller
    /// treats this as a read of zero; no frame is allocated.
    UnmappedRead(u32),
}

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessError::UnmappedRead(addr) => {
                write!(f, "UnmappedRead({:#x})", addr)
            }
        }
    }
}

impl std::error::Error for AccessError {}
