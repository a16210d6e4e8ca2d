//! ABI register names.
//!
//! The 32 general registers carry the conventional MIPS ABI names. The name
//! table is used by the register dump, the operation trace, and the program
//! loader (which accepts names with or without the leading `$`).

/// ABI names of the 32 general registers, indexed by register number.
pub const NAMES: [&str; 32] = [
    "$zero", "$at", "$v0", "$v1", "$a0", "$a1", "$a2", "$a3", "$t0", "$t1", "$t2", "$t3", "$t4",
    "$t5", "$t6", "$t7", "$s0", "$s1", "$s2", "$s3", "$s4", "$s5", "$s6", "$s7", "$t8", "$t9",
    "$k0", "$k1", "$gp", "$sp", "$fp", "$ra",
];

/// Index of the return-address register `$ra`.
pub const REG_RA: u8 = 31;

/// Returns the ABI name of a register index.
pub fn name(idx: u8) -> &'static str {
    NAMES[idx as usize & 0x1f]
}

/// Resolves a register name to its index.
///
/// Accepts names with or without the leading `$`, case-insensitively.
/// Returns `None` for unknown names.
pub fn index_of(name: &str) -> Option<u8> {
    let lower = name.to_ascii_lowercase();
    let bare = lower.strip_prefix('$').unwrap_or(&lower);
    NAMES
        .iter()
        .position(|n| &n[1..] == bare)
        .map(|i| i as u8)
}
