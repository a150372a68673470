//! Renders a decoded [`Instruction`] as FASM-dialect assembly text: Intel operand order, memory
//! operands as `byte/word/dword/qword [base+index*scale+disp]`, immediates in `0x...` hex.

use alloc::format;
use alloc::string::String;

use crate::x86::instruction::Instruction;
use crate::x86::opcode::EncodingKind;
use crate::x86::operand::{Operand, OperandType};

/// Formats instructions as FASM-syntax text. Takes no mutable state; callers own the `String`
/// they build into, so there is no shared formatting buffer to race on.
#[derive(Debug, Default, Clone, Copy)]
pub struct Formatter;

impl Formatter {
    pub fn new() -> Formatter {
        Formatter
    }

    pub fn format(&self, instr: &Instruction) -> String {
        let mnemonic = instr.mnemonic.name();
        let is_rm_imm = matches!(instr.opcode.encoding, EncodingKind::RmImm { .. });
        let slots = [
            (instr.operand1, false),
            (instr.operand2, is_rm_imm),
            (instr.operand3, false),
        ];
        let operands: alloc::vec::Vec<String> = slots
            .into_iter()
            .filter_map(|(op, is_imm)| op.map(|op| (op, is_imm)))
            .map(|(op, is_imm)| {
                if is_imm {
                    format_immediate(op.value)
                } else {
                    self.format_operand(op)
                }
            })
            .collect();
        if operands.is_empty() {
            String::from(mnemonic)
        } else {
            format!("{mnemonic} {}", operands.join(", "))
        }
    }

    fn format_operand(&self, operand: Operand) -> String {
        match operand.operand_type {
            OperandType::Normal => operand.register.name().into(),
            pointer => format!("{} [{}]", size_keyword(pointer), format_memory(operand)),
        }
    }
}

fn size_keyword(operand_type: OperandType) -> &'static str {
    match operand_type {
        OperandType::Normal => "",
        OperandType::BytePointer => "byte",
        OperandType::WordPointer => "word",
        OperandType::DwordPointer => "dword",
        OperandType::QwordPointer => "qword",
    }
}

fn format_memory(operand: Operand) -> String {
    let mut s = String::from(operand.register.name());
    if let Some(index) = operand.index {
        s.push('+');
        s.push_str(index.name());
        if operand.scale != 1 {
            s.push('*');
            s.push_str(&operand.scale.to_string());
        }
    }
    if operand.correction > 0 {
        s.push_str(&format!("+{:#x}", operand.correction));
    } else if operand.correction < 0 {
        s.push_str(&format!("-{:#x}", -operand.correction));
    }
    s
}

/// Formats a plain immediate as `0x...` hex, signed with a leading `-` when negative.
pub fn format_immediate(value: i32) -> String {
    if value < 0 {
        format!("-{:#x}", -(value as i64))
    } else {
        format!("{value:#x}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::x86::instruction::Instruction;
    use crate::x86::opcode::ADD_RM_R;
    use crate::x86::operand::{Operand, OperandType};
    use crate::x86::register::Register;

    #[test]
    fn formats_sib_memory_operand() {
        let instr = Instruction::new(ADD_RM_R)
            .with_operand1(Operand::mem_indexed(
                OperandType::DwordPointer,
                Register::Eax,
                Register::Ebp,
                1,
                0x1337,
            ))
            .with_operand2(Operand::reg(Register::Ecx));
        let text = Formatter::new().format(&instr);
        assert_eq!(text, "add dword [eax+ebp+0x1337], ecx");
    }

    #[test]
    fn formats_plain_register_operands() {
        let instr = Instruction::new(ADD_RM_R)
            .with_operand1(Operand::reg(Register::Eax))
            .with_operand2(Operand::reg(Register::Ecx));
        assert_eq!(Formatter::new().format(&instr), "add eax, ecx");
    }
}
