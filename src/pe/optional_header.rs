//! The PE32/PE32+ optional header: standard (COFF-derived) fields, Windows-specific fields, and
//! the trailing array of data directories.

use scroll::{Pread, Pwrite, SizeWith};

use crate::container::Container;
use crate::error::{Error, Result};
use crate::io::{BinaryReader, BinaryWriter};

use super::data_directories::DataDirectories;

pub const MAGIC_32: u16 = 0x10b;
pub const MAGIC_64: u16 = 0x20b;

#[repr(C)]
#[derive(Debug, PartialEq, Copy, Clone, Default, Pread, Pwrite, SizeWith)]
pub struct StandardFields32 {
    pub magic: u16,
    pub major_linker_version: u8,
    pub minor_linker_version: u8,
    pub size_of_code: u32,
    pub size_of_initialized_data: u32,
    pub size_of_uninitialized_data: u32,
    pub address_of_entry_point: u32,
    pub base_of_code: u32,
    pub base_of_data: u32,
}

#[repr(C)]
#[derive(Debug, PartialEq, Copy, Clone, Default, Pread, Pwrite, SizeWith)]
pub struct StandardFields64 {
    pub magic: u16,
    pub major_linker_version: u8,
    pub minor_linker_version: u8,
    pub size_of_code: u32,
    pub size_of_initialized_data: u32,
    pub size_of_uninitialized_data: u32,
    pub address_of_entry_point: u32,
    pub base_of_code: u32,
}

/// Unified 32/64-bit standard fields; `base_of_data` is absent in PE32+ and reads as 0.
#[derive(Debug, PartialEq, Clone, Copy, Default)]
pub struct StandardFields {
    pub magic: u16,
    pub major_linker_version: u8,
    pub minor_linker_version: u8,
    pub size_of_code: u64,
    pub size_of_initialized_data: u64,
    pub size_of_uninitialized_data: u64,
    pub address_of_entry_point: u64,
    pub base_of_code: u64,
    pub base_of_data: u32,
}

impl From<StandardFields32> for StandardFields {
    fn from(f: StandardFields32) -> Self {
        StandardFields {
            magic: f.magic,
            major_linker_version: f.major_linker_version,
            minor_linker_version: f.minor_linker_version,
            size_of_code: f.size_of_code as u64,
            size_of_initialized_data: f.size_of_initialized_data as u64,
            size_of_uninitialized_data: f.size_of_uninitialized_data as u64,
            address_of_entry_point: f.address_of_entry_point as u64,
            base_of_code: f.base_of_code as u64,
            base_of_data: f.base_of_data,
        }
    }
}

impl From<StandardFields64> for StandardFields {
    fn from(f: StandardFields64) -> Self {
        StandardFields {
            magic: f.magic,
            major_linker_version: f.major_linker_version,
            minor_linker_version: f.minor_linker_version,
            size_of_code: f.size_of_code as u64,
            size_of_initialized_data: f.size_of_initialized_data as u64,
            size_of_uninitialized_data: f.size_of_uninitialized_data as u64,
            address_of_entry_point: f.address_of_entry_point as u64,
            base_of_code: f.base_of_code as u64,
            base_of_data: 0,
        }
    }
}

#[repr(C)]
#[derive(Debug, PartialEq, Copy, Clone, Default, Pread, Pwrite, SizeWith)]
pub struct WindowsFields32 {
    pub image_base: u32,
    pub section_alignment: u32,
    pub file_alignment: u32,
    pub major_operating_system_version: u16,
    pub minor_operating_system_version: u16,
    pub major_image_version: u16,
    pub minor_image_version: u16,
    pub major_subsystem_version: u16,
    pub minor_subsystem_version: u16,
    pub win32_version_value: u32,
    pub size_of_image: u32,
    pub size_of_headers: u32,
    pub check_sum: u32,
    pub subsystem: u16,
    pub dll_characteristics: u16,
    pub size_of_stack_reserve: u32,
    pub size_of_stack_commit: u32,
    pub size_of_heap_reserve: u32,
    pub size_of_heap_commit: u32,
    pub loader_flags: u32,
    pub number_of_rva_and_sizes: u32,
}

#[repr(C)]
#[derive(Debug, PartialEq, Copy, Clone, Default, Pread, Pwrite, SizeWith)]
pub struct WindowsFields64 {
    pub image_base: u64,
    pub section_alignment: u32,
    pub file_alignment: u32,
    pub major_operating_system_version: u16,
    pub minor_operating_system_version: u16,
    pub major_image_version: u16,
    pub minor_image_version: u16,
    pub major_subsystem_version: u16,
    pub minor_subsystem_version: u16,
    pub win32_version_value: u32,
    pub size_of_image: u32,
    pub size_of_headers: u32,
    pub check_sum: u32,
    pub subsystem: u16,
    pub dll_characteristics: u16,
    pub size_of_stack_reserve: u64,
    pub size_of_stack_commit: u64,
    pub size_of_heap_reserve: u64,
    pub size_of_heap_commit: u64,
    pub loader_flags: u32,
    pub number_of_rva_and_sizes: u32,
}

/// Unified 32/64-bit Windows-specific fields.
#[derive(Debug, PartialEq, Clone, Copy, Default)]
pub struct WindowsFields {
    pub image_base: u64,
    pub section_alignment: u32,
    pub file_alignment: u32,
    pub major_operating_system_version: u16,
    pub minor_operating_system_version: u16,
    pub major_image_version: u16,
    pub minor_image_version: u16,
    pub major_subsystem_version: u16,
    pub minor_subsystem_version: u16,
    pub win32_version_value: u32,
    pub size_of_image: u32,
    pub size_of_headers: u32,
    pub check_sum: u32,
    pub subsystem: u16,
    pub dll_characteristics: u16,
    pub size_of_stack_reserve: u64,
    pub size_of_stack_commit: u64,
    pub size_of_heap_reserve: u64,
    pub size_of_heap_commit: u64,
    pub loader_flags: u32,
    pub number_of_rva_and_sizes: u32,
}

impl From<WindowsFields32> for WindowsFields {
    fn from(f: WindowsFields32) -> Self {
        WindowsFields {
            image_base: f.image_base as u64,
            section_alignment: f.section_alignment,
            file_alignment: f.file_alignment,
            major_operating_system_version: f.major_operating_system_version,
            minor_operating_system_version: f.minor_operating_system_version,
            major_image_version: f.major_image_version,
            minor_image_version: f.minor_image_version,
            major_subsystem_version: f.major_subsystem_version,
            minor_subsystem_version: f.minor_subsystem_version,
            win32_version_value: f.win32_version_value,
            size_of_image: f.size_of_image,
            size_of_headers: f.size_of_headers,
            check_sum: f.check_sum,
            subsystem: f.subsystem,
            dll_characteristics: f.dll_characteristics,
            size_of_stack_reserve: f.size_of_stack_reserve as u64,
            size_of_stack_commit: f.size_of_stack_commit as u64,
            size_of_heap_reserve: f.size_of_heap_reserve as u64,
            size_of_heap_commit: f.size_of_heap_commit as u64,
            loader_flags: f.loader_flags,
            number_of_rva_and_sizes: f.number_of_rva_and_sizes,
        }
    }
}

impl From<WindowsFields64> for WindowsFields {
    fn from(f: WindowsFields64) -> Self {
        WindowsFields {
            image_base: f.image_base,
            section_alignment: f.section_alignment,
            file_alignment: f.file_alignment,
            major_operating_system_version: f.major_operating_system_version,
            minor_operating_system_version: f.minor_operating_system_version,
            major_image_version: f.major_image_version,
            minor_image_version: f.minor_image_version,
            major_subsystem_version: f.major_subsystem_version,
            minor_subsystem_version: f.minor_subsystem_version,
            win32_version_value: f.win32_version_value,
            size_of_image: f.size_of_image,
            size_of_headers: f.size_of_headers,
            check_sum: f.check_sum,
            subsystem: f.subsystem,
            dll_characteristics: f.dll_characteristics,
            size_of_stack_reserve: f.size_of_stack_reserve,
            size_of_stack_commit: f.size_of_stack_commit,
            size_of_heap_reserve: f.size_of_heap_reserve,
            size_of_heap_commit: f.size_of_heap_commit,
            loader_flags: f.loader_flags,
            number_of_rva_and_sizes: f.number_of_rva_and_sizes,
        }
    }
}

/// The full optional header: standard fields, Windows fields, and the data directory array.
/// `container` tracks whether this was parsed as PE32 or PE32+ so [`OptionalHeader::write`] can
/// reproduce the same shape.
#[derive(Debug, PartialEq, Clone)]
pub struct OptionalHeader {
    pub container: Container,
    pub standard_fields: StandardFields,
    pub windows_fields: WindowsFields,
    pub data_directories: DataDirectories,
}

impl OptionalHeader {
    pub fn parse(reader: &mut BinaryReader, size_of_optional_header: u16) -> Result<Self> {
        let start = reader.position();
        let magic: u16 = reader
            .as_slice()
            .pread_with(reader.position(), scroll::LE)?;
        let (container, standard_fields, windows_fields) = match magic {
            MAGIC_32 => {
                let std_bytes = reader.read_bytes(core::mem::size_of::<StandardFields32>())?;
                let std_fields: StandardFields32 = std_bytes.pread_with(0, scroll::LE)?;
                let win_bytes = reader.read_bytes(core::mem::size_of::<WindowsFields32>())?;
                let win_fields: WindowsFields32 = win_bytes.pread_with(0, scroll::LE)?;
                (Container::Little, std_fields.into(), win_fields.into())
            }
            MAGIC_64 => {
                let std_bytes = reader.read_bytes(core::mem::size_of::<StandardFields64>())?;
                let std_fields: StandardFields64 = std_bytes.pread_with(0, scroll::LE)?;
                let win_bytes = reader.read_bytes(core::mem::size_of::<WindowsFields64>())?;
                let win_fields: WindowsFields64 = win_bytes.pread_with(0, scroll::LE)?;
                (Container::Big, std_fields.into(), win_fields.into())
            }
            other => {
                return Err(Error::bad_image(alloc::format!(
                    "unknown optional header magic {other:#x}"
                )))
            }
        };
        let count = windows_fields.number_of_rva_and_sizes as usize;
        let data_directories = DataDirectories::parse(reader, count)?;

        // `size_of_optional_header` may legitimately under- or over-shoot what we just consumed
        // (extra data directories, vendor padding); the caller is responsible for seeking past it.
        let _consumed = reader.position() - start;
        let _ = size_of_optional_header;

        Ok(OptionalHeader {
            container,
            standard_fields,
            windows_fields,
            data_directories,
        })
    }

    pub fn write(&self, writer: &mut BinaryWriter) -> Result<()> {
        match self.container {
            Container::Little => {
                let std = StandardFields32 {
                    magic: MAGIC_32,
                    major_linker_version: self.standard_fields.major_linker_version,
                    minor_linker_version: self.standard_fields.minor_linker_version,
                    size_of_code: self.standard_fields.size_of_code as u32,
                    size_of_initialized_data: self.standard_fields.size_of_initialized_data as u32,
                    size_of_uninitialized_data: self.standard_fields.size_of_uninitialized_data
                        as u32,
                    address_of_entry_point: self.standard_fields.address_of_entry_point as u32,
                    base_of_code: self.standard_fields.base_of_code as u32,
                    base_of_data: self.standard_fields.base_of_data,
                };
                let mut buf = [0u8; core::mem::size_of::<StandardFields32>()];
                buf.pwrite_with(std, 0, scroll::LE)?;
                writer.write_bytes(&buf);

                let win = WindowsFields32 {
                    image_base: self.windows_fields.image_base as u32,
                    section_alignment: self.windows_fields.section_alignment,
                    file_alignment: self.windows_fields.file_alignment,
                    major_operating_system_version: self
                        .windows_fields
                        .major_operating_system_version,
                    minor_operating_system_version: self
                        .windows_fields
                        .minor_operating_system_version,
                    major_image_version: self.windows_fields.major_image_version,
                    minor_image_version: self.windows_fields.minor_image_version,
                    major_subsystem_version: self.windows_fields.major_subsystem_version,
                    minor_subsystem_version: self.windows_fields.minor_subsystem_version,
                    win32_version_value: self.windows_fields.win32_version_value,
                    size_of_image: self.windows_fields.size_of_image,
                    size_of_headers: self.windows_fields.size_of_headers,
                    check_sum: self.windows_fields.check_sum,
                    subsystem: self.windows_fields.subsystem,
                    dll_characteristics: self.windows_fields.dll_characteristics,
                    size_of_stack_reserve: self.windows_fields.size_of_stack_reserve as u32,
                    size_of_stack_commit: self.windows_fields.size_of_stack_commit as u32,
                    size_of_heap_reserve: self.windows_fields.size_of_heap_reserve as u32,
                    size_of_heap_commit: self.windows_fields.size_of_heap_commit as u32,
                    loader_flags: self.windows_fields.loader_flags,
                    number_of_rva_and_sizes: self.windows_fields.number_of_rva_and_sizes,
                };
                let mut buf = [0u8; core::mem::size_of::<WindowsFields32>()];
                buf.pwrite_with(win, 0, scroll::LE)?;
                writer.write_bytes(&buf);
            }
            Container::Big => {
                let std = StandardFields64 {
                    magic: MAGIC_64,
                    major_linker_version: self.standard_fields.major_linker_version,
                    minor_linker_version: self.standard_fields.minor_linker_version,
                    size_of_code: self.standard_fields.size_of_code as u32,
                    size_of_initialized_data: self.standard_fields.size_of_initialized_data as u32,
                    size_of_uninitialized_data: self.standard_fields.size_of_uninitialized_data
                        as u32,
                    address_of_entry_point: self.standard_fields.address_of_entry_point as u32,
                    base_of_code: self.standard_fields.base_of_code as u32,
                };
                let mut buf = [0u8; core::mem::size_of::<StandardFields64>()];
                buf.pwrite_with(std, 0, scroll::LE)?;
                writer.write_bytes(&buf);

                let win = WindowsFields64 {
                    image_base: self.windows_fields.image_base,
                    section_alignment: self.windows_fields.section_alignment,
                    file_alignment: self.windows_fields.file_alignment,
                    major_operating_system_version: self
                        .windows_fields
                        .major_operating_system_version,
                    minor_operating_system_version: self
                        .windows_fields
                        .minor_operating_system_version,
                    major_image_version: self.windows_fields.major_image_version,
                    minor_image_version: self.windows_fields.minor_image_version,
                    major_subsystem_version: self.windows_fields.major_subsystem_version,
                    minor_subsystem_version: self.windows_fields.minor_subsystem_version,
                    win32_version_value: self.windows_fields.win32_version_value,
                    size_of_image: self.windows_fields.size_of_image,
                    size_of_headers: self.windows_fields.size_of_headers,
                    check_sum: self.windows_fields.check_sum,
                    subsystem: self.windows_fields.subsystem,
                    dll_characteristics: self.windows_fields.dll_characteristics,
                    size_of_stack_reserve: self.windows_fields.size_of_stack_reserve,
                    size_of_stack_commit: self.windows_fields.size_of_stack_commit,
                    size_of_heap_reserve: self.windows_fields.size_of_heap_reserve,
                    size_of_heap_commit: self.windows_fields.size_of_heap_commit,
                    loader_flags: self.windows_fields.loader_flags,
                    number_of_rva_and_sizes: self.windows_fields.number_of_rva_and_sizes,
                };
                let mut buf = [0u8; core::mem::size_of::<WindowsFields64>()];
                buf.pwrite_with(win, 0, scroll::LE)?;
                writer.write_bytes(&buf);
            }
        }
        self.data_directories.write(writer)
    }

    pub fn is_64(&self) -> bool {
        self.container.is_big()
    }
}
