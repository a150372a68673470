//! The optional header's trailing array of `(rva, size)` data directories.

use scroll::{Pread, Pwrite, SizeWith};

use crate::error::{Error, Result};
use crate::io::{BinaryReader, BinaryWriter};

#[repr(C)]
#[derive(Debug, PartialEq, Copy, Clone, Default, Pread, Pwrite, SizeWith)]
pub struct DataDirectory {
    pub rva: u32,
    pub size: u32,
}

pub const SIZEOF_DATA_DIRECTORY: usize = 8;
const NUM_DATA_DIRECTORIES: usize = 16;

impl DataDirectory {
    /// A directory is empty iff both fields are zero.
    pub fn is_empty(&self) -> bool {
        self.rva == 0 && self.size == 0
    }

    fn parse(reader: &mut BinaryReader) -> Result<Self> {
        let bytes = reader.read_bytes(SIZEOF_DATA_DIRECTORY)?;
        Ok(bytes.pread_with(0, scroll::LE)?)
    }

    fn write(&self, writer: &mut BinaryWriter) -> Result<()> {
        let mut buf = [0u8; SIZEOF_DATA_DIRECTORY];
        buf.pwrite_with(*self, 0, scroll::LE)?;
        writer.write_bytes(&buf);
        Ok(())
    }
}

/// Well-known directory indices, in declaration order.
pub mod index {
    pub const EXPORT_TABLE: usize = 0;
    pub const IMPORT_TABLE: usize = 1;
    pub const RESOURCE_TABLE: usize = 2;
    pub const EXCEPTION_TABLE: usize = 3;
    pub const CERTIFICATE_TABLE: usize = 4;
    pub const BASE_RELOCATION_TABLE: usize = 5;
    pub const DEBUG: usize = 6;
    pub const ARCHITECTURE: usize = 7;
    pub const GLOBAL_PTR: usize = 8;
    pub const TLS_TABLE: usize = 9;
    pub const LOAD_CONFIG_TABLE: usize = 10;
    pub const BOUND_IMPORT: usize = 11;
    pub const IMPORT_ADDRESS_TABLE: usize = 12;
    pub const DELAY_IMPORT_DESCRIPTOR: usize = 13;
    pub const CLR_RUNTIME_HEADER: usize = 14;
    pub const RESERVED: usize = 15;
}

#[derive(Debug, PartialEq, Clone)]
pub struct DataDirectories {
    entries: [Option<DataDirectory>; NUM_DATA_DIRECTORIES],
    /// The image's own `NumberOfRvaAndSizes`, usually but not always 16. `write()` emits exactly
    /// this many entries so a round-trip reproduces the source image's layout byte for byte.
    count: usize,
}

impl Default for DataDirectories {
    fn default() -> Self {
        DataDirectories {
            entries: [None; NUM_DATA_DIRECTORIES],
            count: NUM_DATA_DIRECTORIES,
        }
    }
}

macro_rules! directory_getters {
    ($($name:ident => $idx:path;)*) => {
        $(
            #[inline]
            pub fn $name(&self) -> Option<DataDirectory> {
                self.entries[$idx]
            }
        )*
    };
}

impl DataDirectories {
    pub fn parse(reader: &mut BinaryReader, count: usize) -> Result<Self> {
        if count > NUM_DATA_DIRECTORIES {
            return Err(Error::bad_image(alloc::format!(
                "data directory count ({count}) exceeds the maximum of {NUM_DATA_DIRECTORIES}"
            )));
        }
        let mut entries = [None; NUM_DATA_DIRECTORIES];
        for slot in entries.iter_mut().take(count) {
            let dd = DataDirectory::parse(reader)?;
            *slot = if dd.is_empty() { None } else { Some(dd) };
        }
        Ok(DataDirectories { entries, count })
    }

    /// The number of directory entries this was parsed with (the source image's
    /// `NumberOfRvaAndSizes`).
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn write(&self, writer: &mut BinaryWriter) -> Result<()> {
        for slot in &self.entries[..self.count] {
            slot.unwrap_or_default().write(writer)?;
        }
        Ok(())
    }

    pub fn get(&self, idx: usize) -> Option<DataDirectory> {
        self.entries.get(idx).copied().flatten()
    }

    pub fn set(&mut self, idx: usize, dd: Option<DataDirectory>) {
        if idx < NUM_DATA_DIRECTORIES {
            self.entries[idx] = dd;
        }
    }

    directory_getters! {
        export_table => index::EXPORT_TABLE;
        import_table => index::IMPORT_TABLE;
        resource_table => index::RESOURCE_TABLE;
        exception_table => index::EXCEPTION_TABLE;
        certificate_table => index::CERTIFICATE_TABLE;
        base_relocation_table => index::BASE_RELOCATION_TABLE;
        debug_table => index::DEBUG;
        tls_table => index::TLS_TABLE;
        load_config_table => index::LOAD_CONFIG_TABLE;
        delay_import_descriptor => index::DELAY_IMPORT_DESCRIPTOR;
        clr_runtime_header => index::CLR_RUNTIME_HEADER;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_directory_entries_become_none() {
        let bytes = [0u8; SIZEOF_DATA_DIRECTORY * 2];
        let mut reader = BinaryReader::new(&bytes);
        let dirs = DataDirectories::parse(&mut reader, 2).unwrap();
        assert_eq!(dirs.export_table(), None);
    }

    #[test]
    fn rejects_too_many_directories() {
        let bytes = [0u8; SIZEOF_DATA_DIRECTORY];
        let mut reader = BinaryReader::new(&bytes);
        assert!(DataDirectories::parse(&mut reader, 20).is_err());
    }

    #[test]
    fn write_round_trips_a_count_below_sixteen() {
        let mut bytes = alloc::vec![0u8; SIZEOF_DATA_DIRECTORY * 8];
        bytes[0..4].copy_from_slice(&0x2000u32.to_le_bytes());
        bytes[4..8].copy_from_slice(&0x40u32.to_le_bytes());
        let mut reader = BinaryReader::new(&bytes);
        let dirs = DataDirectories::parse(&mut reader, 8).unwrap();
        assert_eq!(dirs.count(), 8);

        let mut writer = BinaryWriter::new();
        dirs.write(&mut writer).unwrap();
        assert_eq!(writer.into_bytes(), bytes);
    }
}
