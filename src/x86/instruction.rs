//! The decoded/to-be-encoded instruction: an opcode-table row plus up to three operands.

use crate::x86::opcode::{Mnemonic, OpCode};
use crate::x86::operand::Operand;

/// A single x86 instruction. `opcode` pins down the exact encoded form (which of several
/// mnemonic-equivalent opcode bytes to use, e.g. `ADD r/m32, r32` vs `ADD r32, r/m32`);
/// `mnemonic` mirrors `opcode.mnemonic` for callers that only care about the operation, not its
/// encoded shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: OpCode,
    pub mnemonic: Mnemonic,
    pub operand1: Option<Operand>,
    pub operand2: Option<Operand>,
    pub operand3: Option<Operand>,
}

impl Instruction {
    pub fn new(opcode: OpCode) -> Instruction {
        Instruction {
            opcode,
            mnemonic: opcode.mnemonic,
            operand1: None,
            operand2: None,
            operand3: None,
        }
    }

    pub fn with_operand1(mut self, op: Operand) -> Instruction {
        self.operand1 = Some(op);
        self
    }

    pub fn with_operand2(mut self, op: Operand) -> Instruction {
        self.operand2 = Some(op);
        self
    }

    pub fn with_operand3(mut self, op: Operand) -> Instruction {
        self.operand3 = Some(op);
        self
    }
}
