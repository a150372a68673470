//! The 20-byte COFF file header (`IMAGE_FILE_HEADER`) and its `Machine`/`Characteristics` enums.

use scroll::{Pread, Pwrite, SizeWith};

use crate::error::{Error, Result};
use crate::io::BinaryReader;

/// `"PE\0\0"` as a little-endian `u32`.
pub const PE_SIGNATURE: u32 = 0x0000_4550;

pub const SIZEOF_COFF_HEADER: usize = 20;

/// A handful of the more common `Machine` values from `winnt.h`. Unknown values round-trip as
/// [`Machine::Unknown`] rather than failing the parse.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Machine {
    I386,
    Amd64,
    Arm64,
    Arm,
    Unknown(u16),
}

impl Machine {
    pub fn from_u16(v: u16) -> Self {
        match v {
            0x014c => Machine::I386,
            0x8664 => Machine::Amd64,
            0xAA64 => Machine::Arm64,
            0x01c0 => Machine::Arm,
            other => Machine::Unknown(other),
        }
    }

    pub fn to_u16(self) -> u16 {
        match self {
            Machine::I386 => 0x014c,
            Machine::Amd64 => 0x8664,
            Machine::Arm64 => 0xAA64,
            Machine::Arm => 0x01c0,
            Machine::Unknown(v) => v,
        }
    }
}

/// `IMAGE_FILE_*` characteristics bits.
pub const IMAGE_FILE_RELOCS_STRIPPED: u16 = 0x0001;
pub const IMAGE_FILE_EXECUTABLE_IMAGE: u16 = 0x0002;
pub const IMAGE_FILE_LINE_NUMS_STRIPPED: u16 = 0x0004;
pub const IMAGE_FILE_LOCAL_SYMS_STRIPPED: u16 = 0x0008;
pub const IMAGE_FILE_LARGE_ADDRESS_AWARE: u16 = 0x0020;
pub const IMAGE_FILE_BYTES_REVERSED_LO: u16 = 0x0080;
pub const IMAGE_FILE_32BIT_MACHINE: u16 = 0x0100;
pub const IMAGE_FILE_DLL: u16 = 0x2000;
pub const IMAGE_FILE_UP_SYSTEM_ONLY: u16 = 0x4000;
pub const IMAGE_FILE_BYTES_REVERSED_HI: u16 = 0x8000;

/// A thin newtype over the raw characteristics bits, with named accessors rather than a bitflags
/// type — mirrors how the rest of this corpus exposes COFF/section characteristics.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct FileCharacteristics(pub u16);

impl FileCharacteristics {
    pub fn from_bits_truncate(bits: u16) -> Self {
        FileCharacteristics(bits)
    }

    pub fn bits(self) -> u16 {
        self.0
    }

    pub fn contains(self, flag: u16) -> bool {
        self.0 & flag == flag
    }

    pub fn is_dll(self) -> bool {
        self.contains(IMAGE_FILE_DLL)
    }
}

/// The raw, on-disk layout of the COFF file header, before `machine`/`characteristics` are
/// promoted to their typed forms.
#[repr(C)]
#[derive(Debug, PartialEq, Copy, Clone, Default, Pread, Pwrite, SizeWith)]
struct RawFileHeader {
    machine: u16,
    number_of_sections: u16,
    time_date_stamp: u32,
    pointer_to_symbol_table: u32,
    number_of_symbols: u32,
    size_of_optional_header: u16,
    characteristics: u16,
}

/// The COFF file header, following the 4-byte PE signature.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct FileHeader {
    pub machine: Machine,
    pub number_of_sections: u16,
    pub time_date_stamp: u32,
    pub pointer_to_symbol_table: u32,
    pub number_of_symbols: u32,
    pub size_of_optional_header: u16,
    pub characteristics: FileCharacteristics,
}

impl FileHeader {
    /// Read the 4-byte PE signature followed by the 20-byte COFF header.
    pub fn parse(reader: &mut BinaryReader) -> Result<Self> {
        let signature = reader.read_u32()?;
        if signature != PE_SIGNATURE {
            return Err(Error::bad_image(alloc::format!(
                "bad PE signature {signature:#x}, expected {PE_SIGNATURE:#x}"
            )));
        }
        let bytes = reader.read_bytes(SIZEOF_COFF_HEADER)?;
        let raw: RawFileHeader = bytes.pread_with(0, scroll::LE)?;
        Ok(FileHeader {
            machine: Machine::from_u16(raw.machine),
            number_of_sections: raw.number_of_sections,
            time_date_stamp: raw.time_date_stamp,
            pointer_to_symbol_table: raw.pointer_to_symbol_table,
            number_of_symbols: raw.number_of_symbols,
            size_of_optional_header: raw.size_of_optional_header,
            characteristics: FileCharacteristics::from_bits_truncate(raw.characteristics),
        })
    }

    pub fn write(&self, writer: &mut crate::io::BinaryWriter) -> Result<()> {
        writer.write_u32(PE_SIGNATURE);
        let raw = RawFileHeader {
            machine: self.machine.to_u16(),
            number_of_sections: self.number_of_sections,
            time_date_stamp: self.time_date_stamp,
            pointer_to_symbol_table: self.pointer_to_symbol_table,
            number_of_symbols: self.number_of_symbols,
            size_of_optional_header: self.size_of_optional_header,
            characteristics: self.characteristics.bits(),
        };
        let mut buf = [0u8; SIZEOF_COFF_HEADER];
        buf.pwrite_with(raw, 0, scroll::LE)?;
        writer.write_bytes(&buf);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_pe_signature() {
        let mut bytes = alloc::vec![0u8; 4 + SIZEOF_COFF_HEADER];
        bytes[0..4].copy_from_slice(&0xDEAD_BEEFu32.to_le_bytes());
        let mut reader = BinaryReader::new(&bytes);
        assert!(FileHeader::parse(&mut reader).is_err());
    }

    #[test]
    fn unknown_machine_round_trips() {
        assert_eq!(Machine::from_u16(0x1234).to_u16(), 0x1234);
    }
}
