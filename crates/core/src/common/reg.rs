//! Register bank.
//!
//! This module implements the per-process register file. It performs the following:
//! 1. **Storage:** Maintains the 32 general-purpose MIPS registers plus PC, IR, and MAR.
//! 2. **Invariant enforcement:** Ensures that `$zero` is hardwired to zero.
//! 3. **Debugging:** Provides a stable textual dump of the complete register state.

use crate::isa::abi;

/// Register bank holding 32 general registers and the three special registers.
///
/// General registers are addressed by index (see [`crate::isa::abi`] for the
/// name table). Register 0 (`$zero`) is hardwired to zero and cannot be
/// modified.
#[derive(Clone, Debug, Default)]
pub struct RegisterBank {
    regs: [u32; 32],
    /// Program counter, in bytes. Advanced by 4 on fetch.
    pub pc: u32,
    /// Instruction register, holding the most recently fetched word.
    pub ir: u32,
    /// Memory address register, latched from PC at fetch.
    pub mar: u32,
}

impl RegisterBank {
    /// Creates a new register bank with all registers initialized to zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a general-purpose register value.
    ///
    /// # Arguments
    ///
    /// * `idx` - Register index (0-31). Register `$zero` always returns 0.
    pub fn read(&self, idx: u8) -> u32 {
        if idx == 0 {
            0
        } else {
            self.regs[idx as usize & 0x1f]
        }
    }

    /// Writes a value to a general-purpose register.
    ///
    /// Writes to `$zero` are silently discarded.
    ///
    /// # Arguments
    ///
    /// * `idx` - Register index (0-31).
    /// * `val` - The 32-bit value to write.
    pub fn write(&mut self, idx: u8, val: u32) {
        if idx != 0 {
            self.regs[idx as usize & 0x1f] = val;
        }
    }

    /// Renders the contents of all registers as a stable multi-line string.
    ///
    /// Registers are listed in pairs by ABI name with hexadecimal values,
    /// followed by PC, IR, and MAR.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for i in (0..32).step_by(2) {
            out.push_str(&format!(
                "{:<5}={:#010x} {:<5}={:#010x}\n",
                abi::NAMES[i],
                self.read(i as u8),
                abi::NAMES[i + 1],
                self.read(i as u8 + 1)
            ));
        }
        out.push_str(&format!(
            "pc   ={:#010x} ir   ={:#010x} mar  ={:#010x}\n",
            self.pc, self.ir, self.mar
        ));
        out
    }
}
