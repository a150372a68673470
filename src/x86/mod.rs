//! A small x86 (IA-32) instruction encoder/decoder/formatter, the kind of thing adjacent tooling
//! needs to emit or inspect a JIT stub or trampoline: a closed opcode catalogue, not a general
//! assembler.

pub mod decoder;
pub mod encoder;
pub mod formatter;
pub mod instruction;
pub mod opcode;
pub mod operand;
pub mod register;

pub use decoder::Disassembler;
pub use encoder::Assembler;
pub use formatter::Formatter;
pub use instruction::Instruction;
pub use opcode::{ImmWidth, Mnemonic, OpCode};
pub use operand::{Operand, OperandType};
pub use register::Register;
