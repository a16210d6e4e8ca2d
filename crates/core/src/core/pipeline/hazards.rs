//! Data hazard detection.
//!
//! This pipeline resolves Read-After-Write hazards by pure stall insertion:
//! when the instruction in decode reads a register that one of the two
//! preceding in-flight instructions writes, the decode slot is rewritten to
//! a bubble and the PC rolls back so the fetch re-issues. There is no
//! operand forwarding.

use super::latch::Latch;

/// Checks whether the instruction in slot `idx` conflicts with either of the
/// two preceding latches.
///
/// A conflict exists when a preceding non-bubble instruction writes a
/// non-zero register contained in the read set of slot `idx`.
pub fn raw_conflict(slots: &[Latch], idx: usize) -> bool {
    let (r1, r2) = slots[idx].d.hazard_reads();
    if r1.is_none() && r2.is_none() {
        return false;
    }

    for back in 1..=2 {
        if idx < back {
            break;
        }
        let prev = &slots[idx - back].d;
        if prev.op.is_inert() {
            continue;
        }
        if let Some(dest) = prev.hazard_dest() {
            if r1 == Some(dest) || r2 == Some(dest) {
                return true;
            }
        }
    }
    false
}
