//! The closed opcode catalogue: every instruction form this crate knows how to encode or decode,
//! keyed by its opcode byte(s) and schema for the encoder/decoder to drive off of.
//!
//! This is a deliberately small subset of the real x86 instruction set (enough to cover the
//! arithmetic/data-movement/stack forms adjacent tooling needs) rather than an attempt at a
//! general-purpose assembler.

/// The mnemonic an [`OpCode`] row implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mnemonic {
    Mov,
    Add,
    Sub,
    Cmp,
    Push,
    Pop,
}

impl Mnemonic {
    pub fn name(self) -> &'static str {
        match self {
            Mnemonic::Mov => "mov",
            Mnemonic::Add => "add",
            Mnemonic::Sub => "sub",
            Mnemonic::Cmp => "cmp",
            Mnemonic::Push => "push",
            Mnemonic::Pop => "pop",
        }
    }
}

/// The width of an immediate or displacement an opcode form carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImmWidth {
    Imm8,
    Imm32,
}

impl ImmWidth {
    pub fn bytes(self) -> usize {
        match self {
            ImmWidth::Imm8 => 1,
            ImmWidth::Imm32 => 4,
        }
    }
}

/// How an opcode form locates its operands in the instruction stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingKind {
    /// `reg` and `rm` fields of a ModR/M byte both name operands (register-to-register or
    /// register-to/from-memory).
    RegRm,
    /// The register operand is folded into the low 3 bits of the opcode byte itself (`PUSH`/
    /// `POP` forms); no ModR/M byte.
    OpcodeReg,
    /// A ModR/M byte is present but its `reg` field is a fixed opcode-extension digit, not an
    /// operand; `rm` is the sole operand, followed by an immediate.
    RmImm { digit: u8 },
}

/// One row of the opcode table: the fixed byte(s), the mnemonic, and how to find operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpCode {
    pub byte: u8,
    pub mnemonic: Mnemonic,
    pub encoding: EncodingKind,
    /// `true` when the ModR/M `reg` field is the *first* operand and `rm` the second (AT&T calls
    /// this "direction bit set"); `false` when `rm` is first (the destination) and `reg` second.
    pub flipped: bool,
    pub immediate_width: Option<ImmWidth>,
}

impl OpCode {
    pub const fn new(byte: u8, mnemonic: Mnemonic, encoding: EncodingKind, flipped: bool) -> OpCode {
        OpCode {
            byte,
            mnemonic,
            encoding,
            flipped,
            immediate_width: None,
        }
    }

    pub const fn with_immediate(mut self, width: ImmWidth) -> OpCode {
        self.immediate_width = Some(width);
        self
    }

    pub fn has_modrm(self) -> bool {
        !matches!(self.encoding, EncodingKind::OpcodeReg)
    }
}

/// `ADD r/m32, r32` — `rm` is the destination, `reg` the source.
pub const ADD_RM_R: OpCode = OpCode::new(0x01, Mnemonic::Add, EncodingKind::RegRm, false);
/// `ADD r32, r/m32` — `reg` is the destination, `rm` the source.
pub const ADD_R_RM: OpCode = OpCode::new(0x03, Mnemonic::Add, EncodingKind::RegRm, true);
/// `ADD r/m32, imm32` (opcode extension `/0`).
pub const ADD_RM_IMM32: OpCode =
    OpCode::new(0x81, Mnemonic::Add, EncodingKind::RmImm { digit: 0 }, false)
        .with_immediate(ImmWidth::Imm32);

pub const SUB_RM_R: OpCode = OpCode::new(0x29, Mnemonic::Sub, EncodingKind::RegRm, false);
pub const SUB_R_RM: OpCode = OpCode::new(0x2B, Mnemonic::Sub, EncodingKind::RegRm, true);

pub const CMP_RM_R: OpCode = OpCode::new(0x39, Mnemonic::Cmp, EncodingKind::RegRm, false);
pub const CMP_R_RM: OpCode = OpCode::new(0x3B, Mnemonic::Cmp, EncodingKind::RegRm, true);

pub const MOV_RM_R: OpCode = OpCode::new(0x89, Mnemonic::Mov, EncodingKind::RegRm, false);
pub const MOV_R_RM: OpCode = OpCode::new(0x8B, Mnemonic::Mov, EncodingKind::RegRm, true);
pub const MOV_RM_IMM32: OpCode =
    OpCode::new(0xC7, Mnemonic::Mov, EncodingKind::RmImm { digit: 0 }, false)
        .with_immediate(ImmWidth::Imm32);

/// `PUSH r32` — opcode `0x50 + register`.
pub const PUSH_R: OpCode = OpCode::new(0x50, Mnemonic::Push, EncodingKind::OpcodeReg, false);
/// `POP r32` — opcode `0x58 + register`.
pub const POP_R: OpCode = OpCode::new(0x58, Mnemonic::Pop, EncodingKind::OpcodeReg, false);

/// The full closed catalogue, in no particular order. The decoder scans this to find the row
/// matching a byte stream's leading opcode byte (and, for `RmImm` forms, the ModR/M `reg` digit).
pub const OPCODES: &[OpCode] = &[
    ADD_RM_R,
    ADD_R_RM,
    ADD_RM_IMM32,
    SUB_RM_R,
    SUB_R_RM,
    CMP_RM_R,
    CMP_R_RM,
    MOV_RM_R,
    MOV_R_RM,
    MOV_RM_IMM32,
    PUSH_R,
    POP_R,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_has_no_duplicate_plain_opcode_bytes() {
        let plain: alloc::vec::Vec<u8> = OPCODES
            .iter()
            .filter(|op| !matches!(op.encoding, EncodingKind::OpcodeReg))
            .map(|op| op.byte)
            .collect();
        let mut seen = alloc::vec::Vec::new();
        for byte in plain {
            assert!(!seen.contains(&byte), "duplicate opcode byte {byte:#x}");
            seen.push(byte);
        }
    }
}
