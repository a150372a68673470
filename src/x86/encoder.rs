//! The `Assembler`: turns a canonical [`Instruction`] into its encoded byte sequence.
//!
//! Emission order (per opcode form): legacy prefixes (none of this crate's forms need one, since
//! they are all 32-bit-operand/32-bit-address), opcode byte(s), ModR/M, SIB, displacement,
//! immediate.

use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::x86::opcode::EncodingKind;
use crate::x86::operand::{Operand, OperandType};
use crate::x86::register::Register;
use crate::x86::Instruction;

/// Encodes canonical instructions into byte sequences.
#[derive(Debug, Default, Clone, Copy)]
pub struct Assembler;

impl Assembler {
    pub fn new() -> Assembler {
        Assembler
    }

    pub fn encode(&self, instr: &Instruction) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        match instr.opcode.encoding {
            EncodingKind::OpcodeReg => {
                let reg = instr
                    .operand1
                    .ok_or_else(|| Error::invalid_encoding("opcode-reg form needs operand1"))?;
                if reg.operand_type != OperandType::Normal {
                    return Err(Error::invalid_encoding(
                        "opcode-reg form's operand must be a bare register",
                    ));
                }
                out.push(instr.opcode.byte | reg.register.bits());
            }
            EncodingKind::RegRm => {
                let (reg_operand, rm_operand) = if instr.opcode.flipped {
                    (instr.operand1, instr.operand2)
                } else {
                    (instr.operand2, instr.operand1)
                };
                let reg_operand = reg_operand
                    .ok_or_else(|| Error::invalid_encoding("reg/rm form needs two operands"))?;
                let rm_operand = rm_operand
                    .ok_or_else(|| Error::invalid_encoding("reg/rm form needs two operands"))?;
                out.push(instr.opcode.byte);
                encode_modrm_group(&mut out, reg_operand.register.bits(), &rm_operand)?;
            }
            EncodingKind::RmImm { digit } => {
                let rm_operand = instr
                    .operand1
                    .ok_or_else(|| Error::invalid_encoding("rm/imm form needs operand1"))?;
                out.push(instr.opcode.byte);
                encode_modrm_group(&mut out, digit, &rm_operand)?;
                let imm = instr
                    .operand2
                    .ok_or_else(|| Error::invalid_encoding("rm/imm form needs an immediate operand2"))?;
                let width = instr.opcode.immediate_width.ok_or_else(|| {
                    Error::invalid_encoding("rm/imm opcode has no declared immediate width")
                })?;
                write_sized(&mut out, imm.value, width.bytes());
            }
        }
        Ok(out)
    }
}

fn write_sized(out: &mut Vec<u8>, value: i32, width: usize) {
    let bytes = value.to_le_bytes();
    out.extend_from_slice(&bytes[..width]);
}

/// Encodes the ModR/M byte (and any SIB/displacement) for `rm_operand`, with `reg_field` already
/// resolved to either the other operand's register or a fixed opcode-extension digit.
fn encode_modrm_group(out: &mut Vec<u8>, reg_field: u8, rm_operand: &Operand) -> Result<()> {
    if rm_operand.operand_type == OperandType::Normal {
        out.push(modrm(0b11, reg_field, rm_operand.register.bits()));
        return Ok(());
    }

    if rm_operand.needs_sib() {
        let (disp_mode, disp_bytes) = displacement_mode(rm_operand, rm_operand.register);
        out.push(modrm(disp_mode, reg_field, 0b100));
        let (scale_bits, index_bits) = match rm_operand.index {
            Some(index) => (scale_to_bits(rm_operand.scale)?, index.bits()),
            None => (0b00, 0b100), // no index
        };
        out.push(sib(scale_bits, index_bits, rm_operand.register.bits()));
        emit_displacement(out, rm_operand.correction, disp_bytes);
        return Ok(());
    }

    // Plain [base] or [base+disp] with no SIB. `rm = 101` under `mod = 00` means "disp32, no
    // base" on real x86, so a base of EBP with zero displacement must be forced to the disp8
    // form instead of falling into that reserved encoding.
    if rm_operand.register == Register::Ebp && rm_operand.correction == 0 {
        out.push(modrm(0b01, reg_field, rm_operand.register.bits()));
        out.push(0);
        return Ok(());
    }
    let (disp_mode, disp_bytes) = displacement_mode(rm_operand, rm_operand.register);
    out.push(modrm(disp_mode, reg_field, rm_operand.register.bits()));
    emit_displacement(out, rm_operand.correction, disp_bytes);
    Ok(())
}

/// `mod` bits and displacement byte count for a pointer operand: no displacement when zero (and
/// not the EBP-as-base special case, handled by the caller), disp8 when it fits signed 8 bits,
/// else disp32.
fn displacement_mode(rm_operand: &Operand, base: Register) -> (u8, usize) {
    if rm_operand.correction == 0 && base != Register::Ebp {
        (0b00, 0)
    } else if (-128..=127).contains(&rm_operand.correction) {
        (0b01, 1)
    } else {
        (0b10, 4)
    }
}

fn emit_displacement(out: &mut Vec<u8>, correction: i32, bytes: usize) {
    if bytes > 0 {
        write_sized(out, correction, bytes);
    }
}

fn modrm(mode: u8, reg: u8, rm: u8) -> u8 {
    (mode << 6) | ((reg & 0x7) << 3) | (rm & 0x7)
}

fn sib(scale: u8, index: u8, base: u8) -> u8 {
    ((scale & 0x3) << 6) | ((index & 0x7) << 3) | (base & 0x7)
}

fn scale_to_bits(scale: u8) -> Result<u8> {
    match scale {
        1 => Ok(0b00),
        2 => Ok(0b01),
        4 => Ok(0b10),
        8 => Ok(0b11),
        other => Err(Error::invalid_encoding(alloc::format!(
            "SIB scale must be 1, 2, 4, or 8, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::x86::opcode::{ADD_RM_R, PUSH_R};
    use crate::x86::operand::OperandType;

    #[test]
    fn encodes_add_esp_base_with_no_displacement() {
        let instr = Instruction::new(ADD_RM_R)
            .with_operand1(Operand::mem(OperandType::DwordPointer, Register::Esp, 0))
            .with_operand2(Operand::reg(Register::Eax));
        let bytes = Assembler::new().encode(&instr).unwrap();
        assert_eq!(bytes, alloc::vec![0x01, 0x04, 0x24]);
    }

    #[test]
    fn encodes_add_with_sib_index_and_disp32() {
        let instr = Instruction::new(ADD_RM_R)
            .with_operand1(Operand::mem_indexed(
                OperandType::DwordPointer,
                Register::Eax,
                Register::Ebp,
                1,
                0x1337,
            ))
            .with_operand2(Operand::reg(Register::Ecx));
        let bytes = Assembler::new().encode(&instr).unwrap();
        assert_eq!(bytes, alloc::vec![0x01, 0x8C, 0x28, 0x37, 0x13, 0x00, 0x00]);
    }

    #[test]
    fn encodes_push_register() {
        let instr = Instruction::new(PUSH_R).with_operand1(Operand::reg(Register::Ebx));
        let bytes = Assembler::new().encode(&instr).unwrap();
        assert_eq!(bytes, alloc::vec![0x53]);
    }
}
