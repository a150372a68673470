//! The `Disassembler`: the inverse of [`crate::x86::encoder::Assembler`] — reads an opcode byte,
//! looks its schema up in the table, and decodes ModR/M, SIB, displacement, and immediate per that
//! schema.

use crate::error::{Error, Result};
use crate::x86::opcode::{EncodingKind, OpCode, OPCODES};
use crate::x86::operand::{Operand, OperandType};
use crate::x86::register::Register;
use crate::x86::Instruction;

/// Decodes byte sequences into canonical instructions.
#[derive(Debug, Default, Clone, Copy)]
pub struct Disassembler;

impl Disassembler {
    pub fn new() -> Disassembler {
        Disassembler
    }

    /// Decodes one instruction starting at `bytes[0]`. Returns the instruction and the number of
    /// bytes consumed.
    pub fn decode(&self, bytes: &[u8]) -> Result<(Instruction, usize)> {
        let &first = bytes
            .first()
            .ok_or_else(|| Error::invalid_encoding("no bytes to decode"))?;

        if let Some(opcode) = find_opcode_reg(first) {
            let reg = Register::from_bits(first & 0x7);
            let instr = Instruction::new(opcode).with_operand1(Operand::reg(reg));
            return Ok((instr, 1));
        }

        let opcode = find_plain_opcode(bytes)?;
        let mut pos = 1;
        let modrm_byte = *bytes
            .get(pos)
            .ok_or_else(|| Error::invalid_encoding("truncated ModR/M byte"))?;
        pos += 1;
        let mode = modrm_byte >> 6;
        let reg_bits = (modrm_byte >> 3) & 0x7;
        let rm_bits = modrm_byte & 0x7;

        let rm_operand = decode_rm(bytes, &mut pos, mode, rm_bits)?;

        let mut instr = Instruction::new(opcode);
        match opcode.encoding {
            EncodingKind::RegRm => {
                let reg_operand = Operand::reg(Register::from_bits(reg_bits));
                if opcode.flipped {
                    instr = instr.with_operand1(reg_operand).with_operand2(rm_operand);
                } else {
                    instr = instr.with_operand1(rm_operand).with_operand2(reg_operand);
                }
            }
            EncodingKind::RmImm { digit } => {
                if reg_bits != digit {
                    return Err(Error::invalid_encoding(
                        "ModR/M reg field does not match this opcode's extension digit",
                    ));
                }
                let width = opcode.immediate_width.ok_or_else(|| {
                    Error::invalid_encoding("rm/imm opcode has no declared immediate width")
                })?;
                let imm = read_sized(bytes, &mut pos, width.bytes())?;
                instr = instr
                    .with_operand1(rm_operand)
                    .with_operand2(Operand::imm32(imm));
            }
            EncodingKind::OpcodeReg => unreachable!("handled above"),
        }
        Ok((instr, pos))
    }
}

fn find_opcode_reg(first_byte: u8) -> Option<OpCode> {
    OPCODES
        .iter()
        .copied()
        .find(|op| matches!(op.encoding, EncodingKind::OpcodeReg) && first_byte & 0xF8 == op.byte)
}

fn find_plain_opcode(bytes: &[u8]) -> Result<OpCode> {
    let first = bytes[0];
    let candidates: alloc::vec::Vec<OpCode> = OPCODES
        .iter()
        .copied()
        .filter(|op| !matches!(op.encoding, EncodingKind::OpcodeReg) && op.byte == first)
        .collect();
    match candidates.len() {
        0 => Err(Error::invalid_encoding(alloc::format!(
            "unrecognized opcode byte {first:#x}"
        ))),
        1 => Ok(candidates[0]),
        _ => {
            // Disambiguate opcode-extension forms by the ModR/M `reg` digit.
            let digit = bytes
                .get(1)
                .ok_or_else(|| Error::invalid_encoding("truncated ModR/M byte"))?
                >> 3
                & 0x7;
            candidates
                .into_iter()
                .find(|op| matches!(op.encoding, EncodingKind::RmImm { digit: d } if d == digit))
                .ok_or_else(|| {
                    Error::invalid_encoding("no opcode form matches this extension digit")
                })
        }
    }
}

fn decode_rm(bytes: &[u8], pos: &mut usize, mode: u8, rm_bits: u8) -> Result<Operand> {
    if mode == 0b11 {
        return Ok(Operand::reg(Register::from_bits(rm_bits)));
    }

    if rm_bits == 0b100 {
        let sib_byte = *bytes
            .get(*pos)
            .ok_or_else(|| Error::invalid_encoding("truncated SIB byte"))?;
        *pos += 1;
        let scale_bits = sib_byte >> 6;
        let index_bits = (sib_byte >> 3) & 0x7;
        let base_bits = sib_byte & 0x7;
        if mode == 0b00 && base_bits == 0b101 {
            return Err(Error::invalid_encoding(
                "disp32-only (no base) SIB addressing is not supported",
            ));
        }
        let base = Register::from_bits(base_bits);
        let index = if index_bits == 0b100 {
            None
        } else {
            Some(Register::from_bits(index_bits))
        };
        let scale = 1u8 << scale_bits;
        let correction = read_displacement(bytes, pos, mode)?;
        return Ok(match index {
            Some(index) => {
                Operand::mem_indexed(OperandType::DwordPointer, base, index, scale, correction)
            }
            None => Operand::mem(OperandType::DwordPointer, base, correction),
        });
    }

    if mode == 0b00 && rm_bits == 0b101 {
        return Err(Error::invalid_encoding(
            "disp32-only (no base) ModR/M addressing is not supported",
        ));
    }

    let base = Register::from_bits(rm_bits);
    let correction = read_displacement(bytes, pos, mode)?;
    Ok(Operand::mem(OperandType::DwordPointer, base, correction))
}

fn read_displacement(bytes: &[u8], pos: &mut usize, mode: u8) -> Result<i32> {
    match mode {
        0b00 => Ok(0),
        0b01 => {
            let v = *bytes
                .get(*pos)
                .ok_or_else(|| Error::invalid_encoding("truncated disp8"))? as i8;
            *pos += 1;
            Ok(v as i32)
        }
        0b10 => read_sized(bytes, pos, 4),
        _ => unreachable!("mode 11 is handled before reaching displacement decoding"),
    }
}

fn read_sized(bytes: &[u8], pos: &mut usize, width: usize) -> Result<i32> {
    let slice = bytes
        .get(*pos..*pos + width)
        .ok_or_else(|| Error::invalid_encoding("truncated immediate/displacement"))?;
    *pos += width;
    let mut buf = [0u8; 4];
    buf[..width].copy_from_slice(slice);
    if width < 4 && buf[width - 1] & 0x80 != 0 {
        for b in buf.iter_mut().skip(width) {
            *b = 0xFF;
        }
    }
    Ok(i32::from_le_bytes(buf))
}
