//! Opcode and funct field constants.
//!
//! Opcodes occupy bits 31..26 of an instruction word; R-type operations put
//! 0 there and select the operation through the funct field in bits 5..0.

/// R-type marker opcode; the operation lives in the funct field.
pub const OP_RTYPE: u32 = 0x00;
/// Branch if less than (signed).
pub const OP_BLT: u32 = 0x01;
/// Unconditional jump.
pub const OP_J: u32 = 0x02;
/// Jump and link.
pub const OP_JAL: u32 = 0x03;
/// Branch if equal.
pub const OP_BEQ: u32 = 0x04;
/// Branch if not equal.
pub const OP_BNE: u32 = 0x05;
/// Branch if greater than (signed).
pub const OP_BGT: u32 = 0x07;
/// Add immediate.
pub const OP_ADDI: u32 = 0x08;
/// Add immediate unsigned.
pub const OP_ADDIU: u32 = 0x09;
/// Set if less than immediate (signed).
pub const OP_SLTI: u32 = 0x0a;
/// And immediate.
pub const OP_ANDI: u32 = 0x0c;
/// Load immediate.
pub const OP_LI: u32 = 0x0e;
/// Load upper immediate.
pub const OP_LUI: u32 = 0x0f;
/// Enqueue a console print request.
pub const OP_PRINT: u32 = 0x10;
/// Load word.
pub const OP_LW: u32 = 0x23;
/// Store word.
pub const OP_SW: u32 = 0x2b;
/// End of program; as a bare opcode this forms the end sentinel.
pub const OP_END: u32 = 0x3f;

/// Funct code for ADD.
pub const FUNCT_ADD: u32 = 0x20;
/// Funct code for SUB.
pub const FUNCT_SUB: u32 = 0x22;
/// Funct code for MULT.
pub const FUNCT_MULT: u32 = 0x18;
/// Funct code for DIV.
pub const FUNCT_DIV: u32 = 0x1a;
