//! A PE32/PE32+ parser and rebuilder.
//!
//! [`PEFile::parse_with_opts`] implements §4.3's six-step walk; [`PEFile::rebuild`] implements
//! §4.2's two-phase assign-then-emit walk over a [`Segment`] tree built from the current header
//! and section state.

pub mod data_directories;
pub mod dos_header;
pub mod file_header;
pub mod optional_header;
pub mod section_table;
pub mod utils;

use alloc::vec::Vec;
use log::debug;

use crate::error::{Error, Result};
use crate::io::{BinaryReader, BinaryWriter};
use crate::options::ParseOptions;
use crate::segment::{OffsetAssignment, Segment};

pub use dos_header::{DosHeader, DosStub};
pub use file_header::FileHeader;
pub use optional_header::OptionalHeader;
pub use section_table::{Section, SectionHeader};

/// An analyzed, mutable PE32/PE32+ image.
#[derive(Debug)]
pub struct PEFile {
    pub dos_header: DosHeader,
    pub dos_stub: DosStub,
    pub file_header: FileHeader,
    pub optional_header: Option<OptionalHeader>,
    /// Bytes between the end of the section table and `size_of_headers`; preserved byte-for-byte
    /// rather than interpreted (vendor padding, rich headers, etc).
    pub extra_header_data: Vec<u8>,
    pub sections: Vec<Section>,
}

impl PEFile {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        Self::parse_with_opts(bytes, &ParseOptions::default())
    }

    pub fn parse_with_opts(bytes: &[u8], opts: &ParseOptions) -> Result<Self> {
        let mut reader = BinaryReader::new(bytes);

        let dos_header = DosHeader::parse(&mut reader)?;
        let dos_stub = DosStub::parse(&mut reader, &dos_header)?;
        debug!("dos header parsed, pe offset {:#x}", dos_header.next_header_offset);

        reader.seek(dos_header.next_header_offset as usize)?;
        let file_header = FileHeader::parse(&mut reader)?;
        debug!("{:#?}", file_header);

        let optional_header_start = reader.position();
        let optional_header = if file_header.size_of_optional_header > 0 {
            Some(OptionalHeader::parse(
                &mut reader,
                file_header.size_of_optional_header,
            )?)
        } else {
            None
        };

        // Section headers begin exactly `size_of_optional_header` bytes after the optional
        // header started, regardless of how many bytes we actually interpreted from it (it may
        // carry vendor extensions we don't model).
        reader.seek(optional_header_start + file_header.size_of_optional_header as usize)?;

        let mut section_headers = Vec::with_capacity(file_header.number_of_sections as usize);
        for i in 0..file_header.number_of_sections {
            let header = SectionHeader::parse(&mut reader)?;
            debug!("({i}) {:#?}", header);
            section_headers.push(header);
        }

        let extra_header_data = if let Some(oh) = &optional_header {
            let size_of_headers = oh.windows_fields.size_of_headers as usize;
            if size_of_headers > reader.position() {
                reader.read_bytes(size_of_headers - reader.position())?.to_vec()
            } else {
                Vec::new()
            }
        } else {
            Vec::new()
        };

        let mut sections = Vec::with_capacity(section_headers.len());
        for header in section_headers {
            sections.push(Section::parse(&reader, header, opts)?);
        }

        validate_sections(&sections, opts)?;

        Ok(PEFile {
            dos_header,
            dos_stub,
            file_header,
            optional_header,
            extra_header_data,
            sections,
        })
    }

    /// Whether this is a managed (CLI) image, i.e. it carries a non-empty CLR runtime header
    /// data directory.
    pub fn is_managed(&self) -> bool {
        self.optional_header
            .as_ref()
            .and_then(|oh| oh.data_directories.clr_runtime_header())
            .is_some()
    }

    /// Serialize the whole image back to bytes via the two-phase rebuild (§4.2): build a
    /// [`Segment`] tree mirroring the current headers and sections, assign fresh offsets, then
    /// emit.
    pub fn rebuild(&self) -> Result<Vec<u8>> {
        let file_alignment = self
            .optional_header
            .as_ref()
            .map(|oh| oh.windows_fields.file_alignment)
            .unwrap_or(0x200);

        let mut header_writer = BinaryWriter::new();
        self.dos_header.write_into(&mut header_writer)?;
        header_writer.write_bytes(&self.dos_stub.0);
        self.file_header.write(&mut header_writer)?;
        if let Some(oh) = &self.optional_header {
            oh.write(&mut header_writer)?;
        }
        for section in &self.sections {
            section.header.write(&mut header_writer)?;
        }
        header_writer.write_bytes(&self.extra_header_data);
        if let Some(oh) = &self.optional_header {
            let size_of_headers = oh.windows_fields.size_of_headers as usize;
            if size_of_headers > header_writer.position() {
                header_writer.write_bytes(&alloc::vec![
                    0u8;
                    size_of_headers - header_writer.position()
                ]);
            }
        }

        let headers_segment = Segment::raw(header_writer.into_bytes());
        let mut children = Vec::with_capacity(1 + self.sections.len());
        children.push(headers_segment);
        for section in &self.sections {
            children.push(Segment::padded(
                Segment::raw(section_body_bytes(section)?),
                section.contents.virtual_size(),
            )?);
        }

        let mut tree = Segment::composite(children);
        tree.assign_offsets(OffsetAssignment {
            new_file_offset: 0,
            new_rva: 0,
            parent_alignment: file_alignment,
        });

        let mut writer = BinaryWriter::with_capacity(tree.physical_size() as usize);
        tree.write(&mut writer)?;
        Ok(writer.into_bytes())
    }
}

fn section_body_bytes(section: &Section) -> Result<Vec<u8>> {
    let mut w = BinaryWriter::new();
    section.contents.write(&mut w)?;
    Ok(w.into_bytes())
}

fn validate_sections(sections: &[Section], opts: &ParseOptions) -> Result<()> {
    let permissive = opts.mode.is_permissive();
    let mut last_rva: Option<u32> = None;
    for section in sections {
        if let Some(prev) = last_rva {
            if section.header.virtual_address < prev && !permissive {
                return Err(Error::invariant_violation(
                    "sections must be strictly ordered by virtual_address",
                ));
            }
        }
        last_rva = Some(section.header.virtual_address);
        if section.contents.virtual_size() < section.header.size_of_raw_data && !permissive {
            return Err(Error::invariant_violation(
                "section virtual_size must be >= size_of_raw_data",
            ));
        }
    }
    Ok(())
}

impl DosHeader {
    fn write_into(&self, writer: &mut BinaryWriter) -> Result<()> {
        use scroll::Pwrite;
        let mut buf = [0u8; dos_header::SIZEOF_DOS_HEADER];
        buf.pwrite_with(*self, 0, scroll::LE)?;
        writer.write_bytes(&buf);
        Ok(())
    }
}

/// Convenience re-export used pervasively by consumers of this crate.
pub use crate::options::MappingMode as PeMappingMode;

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_pe_bytes() -> Vec<u8> {
        // A hand-assembled, minimal, valid-shaped 32-bit PE with one `.text` section and no
        // data directories beyond zero, enough to exercise the full parse walk.
        let mut dos = alloc::vec![0u8; 0x80];
        dos[0..2].copy_from_slice(b"MZ");
        dos[0x3C..0x40].copy_from_slice(&0x80u32.to_le_bytes());

        let mut pe = Vec::new();
        pe.extend_from_slice(&0x0000_4550u32.to_le_bytes()); // "PE\0\0"
        pe.extend_from_slice(&0x014cu16.to_le_bytes()); // machine: I386
        pe.extend_from_slice(&1u16.to_le_bytes()); // number_of_sections
        pe.extend_from_slice(&0u32.to_le_bytes()); // time_date_stamp
        pe.extend_from_slice(&0u32.to_le_bytes()); // pointer_to_symbol_table
        pe.extend_from_slice(&0u32.to_le_bytes()); // number_of_symbols
        let optional_header_size = 224u16; // PE32 standard+windows fields with 16 dirs
        pe.extend_from_slice(&optional_header_size.to_le_bytes());
        pe.extend_from_slice(&0x0102u16.to_le_bytes()); // characteristics

        // optional header, PE32
        pe.extend_from_slice(&0x10bu16.to_le_bytes()); // magic
        pe.push(0); // major linker
        pe.push(0); // minor linker
        pe.extend_from_slice(&0u32.to_le_bytes()); // size_of_code
        pe.extend_from_slice(&0u32.to_le_bytes()); // size_of_initialized_data
        pe.extend_from_slice(&0u32.to_le_bytes()); // size_of_uninitialized_data
        pe.extend_from_slice(&0x1000u32.to_le_bytes()); // address_of_entry_point
        pe.extend_from_slice(&0x1000u32.to_le_bytes()); // base_of_code
        pe.extend_from_slice(&0u32.to_le_bytes()); // base_of_data
        pe.extend_from_slice(&0x4000_0000u32.to_le_bytes()); // image_base
        pe.extend_from_slice(&0x1000u32.to_le_bytes()); // section_alignment
        pe.extend_from_slice(&0x200u32.to_le_bytes()); // file_alignment
        pe.extend_from_slice(&[0u8; 8]); // os/image version words
        pe.extend_from_slice(&[0u8; 4]); // subsystem version words
        pe.extend_from_slice(&0u32.to_le_bytes()); // win32_version_value
        pe.extend_from_slice(&0x2000u32.to_le_bytes()); // size_of_image
        let size_of_headers = 0x200u32;
        pe.extend_from_slice(&size_of_headers.to_le_bytes());
        pe.extend_from_slice(&0u32.to_le_bytes()); // checksum
        pe.extend_from_slice(&3u16.to_le_bytes()); // subsystem
        pe.extend_from_slice(&0u16.to_le_bytes()); // dll_characteristics
        pe.extend_from_slice(&[0u8; 16]); // stack/heap reserve+commit
        pe.extend_from_slice(&0u32.to_le_bytes()); // loader_flags
        pe.extend_from_slice(&16u32.to_le_bytes()); // number_of_rva_and_sizes
        pe.extend_from_slice(&[0u8; 16 * 8]); // 16 empty data directories

        // one section header
        let mut name = [0u8; 8];
        name[..5].copy_from_slice(b".text");
        pe.extend_from_slice(&name);
        pe.extend_from_slice(&0x200u32.to_le_bytes()); // virtual_size
        pe.extend_from_slice(&0x1000u32.to_le_bytes()); // virtual_address
        pe.extend_from_slice(&0x200u32.to_le_bytes()); // size_of_raw_data
        pe.extend_from_slice(&0x200u32.to_le_bytes()); // pointer_to_raw_data
        pe.extend_from_slice(&[0u8; 8]); // relocations/linenumbers pointers
        pe.extend_from_slice(&[0u8; 4]); // relocation/linenumber counts
        pe.extend_from_slice(&0x6000_0020u32.to_le_bytes()); // characteristics: code|execute|read

        let mut file = dos;
        file.extend_from_slice(&pe);
        file.resize(0x200, 0);
        file.extend_from_slice(&alloc::vec![0xCCu8; 0x200]); // .text contents
        file
    }

    #[test]
    fn parses_minimal_pe() {
        let bytes = minimal_pe_bytes();
        let pe = PEFile::parse(&bytes).unwrap();
        assert_eq!(pe.sections.len(), 1);
        assert_eq!(pe.sections[0].header.name().unwrap(), ".text");
        assert!(!pe.is_managed());
    }

    #[test]
    fn rebuild_preserves_section_count() {
        let bytes = minimal_pe_bytes();
        let pe = PEFile::parse(&bytes).unwrap();
        let rebuilt = pe.rebuild().unwrap();
        let reparsed = PEFile::parse(&rebuilt).unwrap();
        assert_eq!(reparsed.sections.len(), 1);
    }
}
