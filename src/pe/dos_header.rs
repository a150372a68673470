//! The legacy MS-DOS header and stub that precede every PE signature.

use scroll::{Pread, Pwrite, SizeWith};

use crate::error::{Error, Result};
use crate::io::BinaryReader;

/// `'MZ'`, Mark Zbikowski's initials, little-endian as a `u16`.
pub const DOS_MAGIC: u16 = 0x5A4D;

/// Fixed size of the DOS header proper (not including the variable-length stub that follows it).
pub const SIZEOF_DOS_HEADER: usize = 64;

/// Offset of `e_lfanew` (here, [`DosHeader::next_header_offset`]) within the header.
pub const E_LFANEW_OFFSET: usize = 0x3C;

/// The 64-byte `IMAGE_DOS_HEADER`.
///
/// Only two fields are meaningful to a modern loader: [`signature`](Self::signature) (`e_magic`)
/// and [`next_header_offset`](Self::next_header_offset) (`e_lfanew`), which points at the 4-byte
/// PE signature. The rest is carried byte-for-byte so a structural round trip reproduces it
/// exactly.
#[repr(C)]
#[derive(Debug, PartialEq, Copy, Clone, Pread, Pwrite, SizeWith)]
pub struct DosHeader {
    pub signature: u16,
    pub bytes_on_last_page: u16,
    pub pages_in_file: u16,
    pub relocations: u16,
    pub size_of_header_in_paragraphs: u16,
    pub minimum_extra_paragraphs: u16,
    pub maximum_extra_paragraphs: u16,
    pub initial_ss: u16,
    pub initial_sp: u16,
    pub checksum: u16,
    pub initial_ip: u16,
    pub initial_cs: u16,
    pub file_address_of_relocation_table: u16,
    pub overlay_number: u16,
    pub reserved: [u16; 4],
    pub oem_id: u16,
    pub oem_info: u16,
    pub reserved2: [u16; 10],
    /// `e_lfanew`: byte offset of the PE signature from the start of the file.
    pub next_header_offset: u32,
}

impl Default for DosHeader {
    fn default() -> Self {
        DosHeader {
            signature: DOS_MAGIC,
            bytes_on_last_page: 0,
            pages_in_file: 0,
            relocations: 0,
            size_of_header_in_paragraphs: 4,
            minimum_extra_paragraphs: 0,
            maximum_extra_paragraphs: 0xFFFF,
            initial_ss: 0,
            initial_sp: 0,
            checksum: 0,
            initial_ip: 0,
            initial_cs: 0,
            file_address_of_relocation_table: 0,
            overlay_number: 0,
            reserved: [0; 4],
            oem_id: 0,
            oem_info: 0,
            reserved2: [0; 10],
            next_header_offset: SIZEOF_DOS_HEADER as u32,
        }
    }
}

impl DosHeader {
    pub fn parse(reader: &mut BinaryReader) -> Result<Self> {
        let bytes = reader.read_bytes(SIZEOF_DOS_HEADER)?;
        let header: DosHeader = bytes.pread_with(0, scroll::LE)?;
        if header.signature != DOS_MAGIC {
            return Err(Error::bad_image(alloc::format!(
                "bad DOS signature {:#x}, expected {:#x}",
                header.signature,
                DOS_MAGIC
            )));
        }
        Ok(header)
    }
}

/// The bytes between the end of the fixed DOS header and `next_header_offset`: traditionally the
/// "this program cannot be run in DOS mode" real-mode stub, but preserved opaquely here since its
/// contents have no bearing on CLI/PE parsing.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct DosStub(pub alloc::vec::Vec<u8>);

impl DosStub {
    pub fn parse(reader: &mut BinaryReader, dos_header: &DosHeader) -> Result<Self> {
        let stub_len = (dos_header.next_header_offset as usize).saturating_sub(SIZEOF_DOS_HEADER);
        Ok(DosStub(reader.read_bytes(stub_len)?.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = alloc::vec![0u8; SIZEOF_DOS_HEADER];
        bytes[0..2].copy_from_slice(b"XX");
        let mut reader = BinaryReader::new(&bytes);
        assert!(DosHeader::parse(&mut reader).is_err());
    }

    #[test]
    fn round_trips_through_scroll() {
        let header = DosHeader::default();
        let mut buf = [0u8; SIZEOF_DOS_HEADER];
        buf.pwrite_with(header, 0, scroll::LE).unwrap();
        let mut reader = BinaryReader::new(&buf);
        let parsed = DosHeader::parse(&mut reader).unwrap();
        assert_eq!(parsed, header);
    }
}
