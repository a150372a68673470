//! The CLI/COR20 header (`IMAGE_COR20_HEADER`), located via the optional header's CLR runtime
//! header data directory.

use scroll::{Pread, Pwrite, SizeWith};

use crate::error::{Error, Result};
use crate::io::BinaryReader;
use crate::pe::data_directories::DataDirectory;

pub const SIZEOF_NET_DIRECTORY: usize = 72;

pub const COMIMAGE_FLAGS_ILONLY: u32 = 0x0000_0001;
pub const COMIMAGE_FLAGS_32BITREQUIRED: u32 = 0x0000_0002;
pub const COMIMAGE_FLAGS_IL_LIBRARY: u32 = 0x0000_0004;
pub const COMIMAGE_FLAGS_STRONGNAMESIGNED: u32 = 0x0000_0008;
pub const COMIMAGE_FLAGS_NATIVE_ENTRYPOINT: u32 = 0x0000_0010;
pub const COMIMAGE_FLAGS_TRACKDEBUGDATA: u32 = 0x0001_0000;

#[repr(C)]
#[derive(Debug, PartialEq, Copy, Clone, Default, Pread, Pwrite, SizeWith)]
struct RawNetDirectory {
    cb: u32,
    major_runtime_version: u16,
    minor_runtime_version: u16,
    metadata: DataDirectory,
    flags: u32,
    entry_point_token_or_rva: u32,
    resources: DataDirectory,
    strong_name_signature: DataDirectory,
    code_manager_table: DataDirectory,
    vtable_fixups: DataDirectory,
    export_address_table_jumps: DataDirectory,
    managed_native_header: DataDirectory,
}

/// The 72-byte CLI header (also known as the COR20 header).
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct NetDirectory {
    pub major_runtime_version: u16,
    pub minor_runtime_version: u16,
    /// Points at the [`super::root::MetadataRoot`].
    pub metadata: DataDirectory,
    pub flags: u32,
    pub entry_point_token_or_rva: u32,
    pub resources: DataDirectory,
    pub strong_name_signature: DataDirectory,
    pub vtable_fixups: DataDirectory,
}

impl NetDirectory {
    pub fn parse(reader: &mut BinaryReader) -> Result<Self> {
        let bytes = reader.read_bytes(SIZEOF_NET_DIRECTORY)?;
        let raw: RawNetDirectory = bytes.pread_with(0, scroll::LE)?;
        if raw.cb as usize != SIZEOF_NET_DIRECTORY {
            return Err(Error::bad_image(alloc::format!(
                "CLI header cb ({:#x}) does not match expected size ({SIZEOF_NET_DIRECTORY:#x})",
                raw.cb
            )));
        }
        Ok(NetDirectory {
            major_runtime_version: raw.major_runtime_version,
            minor_runtime_version: raw.minor_runtime_version,
            metadata: raw.metadata,
            flags: raw.flags,
            entry_point_token_or_rva: raw.entry_point_token_or_rva,
            resources: raw.resources,
            strong_name_signature: raw.strong_name_signature,
            vtable_fixups: raw.vtable_fixups,
        })
    }

    pub fn is_il_only(&self) -> bool {
        self.flags & COMIMAGE_FLAGS_ILONLY != 0
    }

    pub fn is_native_entrypoint(&self) -> bool {
        self.flags & COMIMAGE_FLAGS_NATIVE_ENTRYPOINT != 0
    }

    /// The entry point as a metadata token, or `None` when [`is_native_entrypoint`](Self::is_native_entrypoint)
    /// is set (the field holds an RVA instead).
    pub fn entry_point_token(&self) -> Option<u32> {
        if self.is_native_entrypoint() {
            None
        } else {
            Some(self.entry_point_token_or_rva)
        }
    }
}
