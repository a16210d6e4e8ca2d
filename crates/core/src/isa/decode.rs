//! Instruction decoder.
//!
//! This module turns a raw 32-bit word into the decoded form the pipeline
//! latches carry. It provides:
//! 1. **Field extraction:** opcode, funct, rs/rt/rd, shamt, 16-bit immediate,
//!    and the 26-bit jump target.
//! 2. **Mnemonic resolution:** The opcode/funct tables of the recognized set;
//!    unknown encodings decode to `Nop`.
//! 3. **Hazard sets:** The registers an instruction reads and the register it
//!    writes, used by the decode-stage RAW check.

use super::opcodes::*;

/// Decoded operation, including the synthetic pipeline-only entries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mnemonic {
    Add,
    Sub,
    Mult,
    Div,
    J,
    Jal,
    Beq,
    Bne,
    Bgt,
    Blt,
    Addi,
    Addiu,
    Andi,
    Slti,
    Lui,
    Lw,
    Sw,
    Li,
    Print,
    End,
    /// Unrecognized encoding; flows through every stage with no effect.
    #[default]
    Nop,
    /// Hazard or flush filler; consumes a cycle but has no effect.
    Bubble,
}

impl Mnemonic {
    /// Returns true for the two do-nothing entries.
    pub fn is_inert(self) -> bool {
        matches!(self, Mnemonic::Nop | Mnemonic::Bubble)
    }

    /// Lowercase assembly name, used in trace lines.
    pub fn name(self) -> &'static str {
        match self {
            Mnemonic::Add => "add",
            Mnemonic::Sub => "sub",
            Mnemonic::Mult => "mult",
            Mnemonic::Div => "div",
            Mnemonic::J => "j",
            Mnemonic::Jal => "jal",
            Mnemonic::Beq => "beq",
            Mnemonic::Bne => "bne",
            Mnemonic::Bgt => "bgt",
            Mnemonic::Blt => "blt",
            Mnemonic::Addi => "addi",
            Mnemonic::Addiu => "addiu",
            Mnemonic::Andi => "andi",
            Mnemonic::Slti => "slti",
            Mnemonic::Lui => "lui",
            Mnemonic::Lw => "lw",
            Mnemonic::Sw => "sw",
            Mnemonic::Li => "li",
            Mnemonic::Print => "print",
            Mnemonic::End => "end",
            Mnemonic::Nop => "nop",
            Mnemonic::Bubble => "bubble",
        }
    }
}

/// One decoded instruction, as held in a pipeline latch.
#[derive(Clone, Copy, Debug, Default)]
pub struct Decoded {
    /// The raw instruction word.
    pub raw: u32,
    /// Decoded operation.
    pub op: Mnemonic,
    /// Source register index (bits 25..21).
    pub rs: u8,
    /// Target register index (bits 20..16).
    pub rt: u8,
    /// Destination register index (bits 15..11).
    pub rd: u8,
    /// Shift amount (bits 10..6).
    pub shamt: u8,
    /// Sign-extended 16-bit immediate.
    pub imm: i32,
    /// 26-bit jump target (bits 25..0).
    pub target: u32,
}

impl Decoded {
    /// A bubble latch.
    pub fn bubble() -> Self {
        Self {
            op: Mnemonic::Bubble,
            ..Self::default()
        }
    }

    /// Rewrites this latch into a bubble in place.
    pub fn poison(&mut self) {
        *self = Self::bubble();
    }

    /// The immediate reinterpreted as an unsigned 16-bit quantity.
    ///
    /// Loads, stores, and memory prints treat the immediate as an absolute
    /// byte address filled in by the assembler.
    pub fn uimm(&self) -> u32 {
        self.raw & 0xffff
    }

    /// The register this instruction writes, for hazard lookback.
    ///
    /// Returns `None` when the instruction writes nothing or writes `$zero`.
    pub fn hazard_dest(&self) -> Option<u8> {
        let dest = match self.op {
            Mnemonic::Add | Mnemonic::Sub | Mnemonic::Mult | Mnemonic::Div => self.rd,
            Mnemonic::Addi
            | Mnemonic::Addiu
            | Mnemonic::Andi
            | Mnemonic::Slti
            | Mnemonic::Lui
            | Mnemonic::Li
            | Mnemonic::Lw => self.rt,
            Mnemonic::Jal => super::abi::REG_RA,
            _ => return None,
        };
        if dest == 0 { None } else { Some(dest) }
    }

    /// The registers this instruction reads, for hazard detection.
    pub fn hazard_reads(&self) -> (Option<u8>, Option<u8>) {
        match self.op {
            Mnemonic::Add
            | Mnemonic::Sub
            | Mnemonic::Mult
            | Mnemonic::Div
            | Mnemonic::Beq
            | Mnemonic::Bne
            | Mnemonic::Bgt
            | Mnemonic::Blt
            | Mnemonic::Sw => (Some(self.rs), Some(self.rt)),
            Mnemonic::Addi | Mnemonic::Addiu | Mnemonic::Andi | Mnemonic::Slti | Mnemonic::Lw => {
                (Some(self.rs), None)
            }
            Mnemonic::Print => (Some(self.rt), None),
            _ => (None, None),
        }
    }
}

/// Decodes a raw instruction word.
///
/// Unknown opcodes (and unknown R-type funct codes) decode to `Nop`, which
/// flows through the pipeline with no effect.
pub fn decode(raw: u32) -> Decoded {
    let opcode = (raw >> 26) & 0x3f;
    let op = match opcode {
        OP_RTYPE => match raw & 0x3f {
            FUNCT_ADD => Mnemonic::Add,
            FUNCT_SUB => Mnemonic::Sub,
            FUNCT_MULT => Mnemonic::Mult,
            FUNCT_DIV => Mnemonic::Div,
            _ => Mnemonic::Nop,
        },
        OP_J => Mnemonic::J,
        OP_JAL => Mnemonic::Jal,
        OP_BEQ => Mnemonic::Beq,
        OP_BNE => Mnemonic::Bne,
        OP_BGT => Mnemonic::Bgt,
        OP_BLT => Mnemonic::Blt,
        OP_ADDI => Mnemonic::Addi,
        OP_ADDIU => Mnemonic::Addiu,
        OP_ANDI => Mnemonic::Andi,
        OP_SLTI => Mnemonic::Slti,
        OP_LUI => Mnemonic::Lui,
        OP_LW => Mnemonic::Lw,
        OP_SW => Mnemonic::Sw,
        OP_LI => Mnemonic::Li,
        OP_PRINT => Mnemonic::Print,
        OP_END => Mnemonic::End,
        _ => Mnemonic::Nop,
    };

    Decoded {
        raw,
        op,
        rs: ((raw >> 21) & 0x1f) as u8,
        rt: ((raw >> 16) & 0x1f) as u8,
        rd: ((raw >> 11) & 0x1f) as u8,
        shamt: ((raw >> 6) & 0x1f) as u8,
        imm: (raw & 0xffff) as u16 as i16 as i32,
        target: raw & 0x03ff_ffff,
    }
}
