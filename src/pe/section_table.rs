//! The 40-byte section header, and the [`Section`] that pairs it with its contents segment.

use alloc::string::String;
use scroll::{Pread, Pwrite, SizeWith};

use crate::error::Result;
use crate::io::{BinaryReader, BinaryWriter};
use crate::options::{MappingMode, ParseOptions};
use crate::segment::Segment;

pub const SIZEOF_SECTION_HEADER: usize = 40;

pub const IMAGE_SCN_CNT_CODE: u32 = 0x0000_0020;
pub const IMAGE_SCN_CNT_INITIALIZED_DATA: u32 = 0x0000_0040;
pub const IMAGE_SCN_CNT_UNINITIALIZED_DATA: u32 = 0x0000_0080;
pub const IMAGE_SCN_MEM_EXECUTE: u32 = 0x2000_0000;
pub const IMAGE_SCN_MEM_READ: u32 = 0x4000_0000;
pub const IMAGE_SCN_MEM_WRITE: u32 = 0x8000_0000;

#[repr(C)]
#[derive(Debug, PartialEq, Copy, Clone, Default, Pread, Pwrite, SizeWith)]
struct RawSectionHeader {
    name: [u8; 8],
    virtual_size: u32,
    virtual_address: u32,
    size_of_raw_data: u32,
    pointer_to_raw_data: u32,
    pointer_to_relocations: u32,
    pointer_to_linenumbers: u32,
    number_of_relocations: u16,
    number_of_linenumbers: u16,
    characteristics: u32,
}

/// The 40-byte `IMAGE_SECTION_HEADER`.
#[derive(Debug, PartialEq, Clone, Copy, Default)]
pub struct SectionHeader {
    pub name: [u8; 8],
    pub virtual_size: u32,
    pub virtual_address: u32,
    pub size_of_raw_data: u32,
    pub pointer_to_raw_data: u32,
    pub pointer_to_relocations: u32,
    pub pointer_to_linenumbers: u32,
    pub number_of_relocations: u16,
    pub number_of_linenumbers: u16,
    pub characteristics: u32,
}

impl SectionHeader {
    pub fn parse(reader: &mut BinaryReader) -> Result<Self> {
        let bytes = reader.read_bytes(SIZEOF_SECTION_HEADER)?;
        let raw: RawSectionHeader = bytes.pread_with(0, scroll::LE)?;
        Ok(SectionHeader {
            name: raw.name,
            virtual_size: raw.virtual_size,
            virtual_address: raw.virtual_address,
            size_of_raw_data: raw.size_of_raw_data,
            pointer_to_raw_data: raw.pointer_to_raw_data,
            pointer_to_relocations: raw.pointer_to_relocations,
            pointer_to_linenumbers: raw.pointer_to_linenumbers,
            number_of_relocations: raw.number_of_relocations,
            number_of_linenumbers: raw.number_of_linenumbers,
            characteristics: raw.characteristics,
        })
    }

    pub fn write(&self, writer: &mut BinaryWriter) -> Result<()> {
        let raw = RawSectionHeader {
            name: self.name,
            virtual_size: self.virtual_size,
            virtual_address: self.virtual_address,
            size_of_raw_data: self.size_of_raw_data,
            pointer_to_raw_data: self.pointer_to_raw_data,
            pointer_to_relocations: self.pointer_to_relocations,
            pointer_to_linenumbers: self.pointer_to_linenumbers,
            number_of_relocations: self.number_of_relocations,
            number_of_linenumbers: self.number_of_linenumbers,
            characteristics: self.characteristics,
        };
        let mut buf = [0u8; SIZEOF_SECTION_HEADER];
        buf.pwrite_with(raw, 0, scroll::LE)?;
        writer.write_bytes(&buf);
        Ok(())
    }

    /// The section's name, trimmed at the first NUL. Long (`/offset`-style string-table) names
    /// are returned verbatim; resolving them against the symbol table is out of this core's
    /// scope.
    pub fn name(&self) -> Result<String> {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(8);
        core::str::from_utf8(&self.name[..end])
            .map(String::from)
            .map_err(|_| crate::error::Error::bad_image("section name is not valid utf-8"))
    }

    pub fn is_executable(&self) -> bool {
        self.characteristics & IMAGE_SCN_MEM_EXECUTE != 0
    }
}

/// A section header paired with its contents as a [`Segment`].
#[derive(Debug)]
pub struct Section {
    pub header: SectionHeader,
    pub contents: Segment,
}

impl Section {
    /// Parse one section given its header, per §4.3's two mapping-mode rules:
    ///
    /// - *Unmapped*: contents live at `pointer_to_raw_data`, sized `size_of_raw_data`.
    /// - *Mapped*: contents live at `virtual_address` (relative to `reader`'s own start), sized
    ///   `virtual_size`.
    ///
    /// In both cases the resulting segment's virtual size is `virtual_size`, carrying physically
    /// only `min(virtual_size, size_of_raw_data)` bytes — the rest is the zero-filled gap the
    /// loader is responsible for.
    pub fn parse(
        reader: &BinaryReader,
        header: SectionHeader,
        opts: &ParseOptions,
    ) -> Result<Self> {
        let virtual_size = if header.virtual_size == 0 {
            header.size_of_raw_data
        } else {
            header.virtual_size
        };
        let physical_len = core::cmp::min(virtual_size, header.size_of_raw_data) as usize;

        let raw = match opts.mapping {
            MappingMode::Unmapped => {
                if header.pointer_to_raw_data == 0 || header.size_of_raw_data == 0 {
                    // Open question (resolved): PointerToRawData = 0 reads as zero bytes.
                    alloc::vec::Vec::new()
                } else {
                    reader
                        .fork(header.pointer_to_raw_data as usize, physical_len)?
                        .read_bytes(physical_len)?
                        .to_vec()
                }
            }
            MappingMode::Mapped => reader
                .fork(header.virtual_address as usize, physical_len)?
                .read_bytes(physical_len)?
                .to_vec(),
        };

        let contents = Segment::padded(Segment::raw(raw), virtual_size)?;
        Ok(Section { header, contents })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(virtual_size: u32, size_of_raw_data: u32, pointer: u32) -> SectionHeader {
        SectionHeader {
            name: *b".text\0\0\0",
            virtual_size,
            virtual_address: 0x1000,
            size_of_raw_data,
            pointer_to_raw_data: pointer,
            ..Default::default()
        }
    }

    #[test]
    fn virtual_size_can_exceed_physical() {
        let data = alloc::vec![0u8; 0x200];
        let reader = BinaryReader::new(&data);
        let h = header(0x1000, 0x100, 0);
        let section = Section::parse(&reader, h, &ParseOptions::unmapped()).unwrap();
        assert_eq!(section.contents.virtual_size(), 0x1000);
        assert_eq!(section.contents.physical_size(), 0x100);
    }

    #[test]
    fn zero_pointer_to_raw_data_is_zero_bytes() {
        let data = alloc::vec![0u8; 0x200];
        let reader = BinaryReader::new(&data);
        let h = header(0x100, 0x100, 0);
        let section = Section::parse(&reader, h, &ParseOptions::unmapped()).unwrap();
        assert_eq!(section.contents.physical_size(), 0);
    }
}
