//! The metadata root (a.k.a. storage signature + storage header): the `BSJB`-stamped structure
//! located by [`super::net_directory::NetDirectory::metadata`], holding the version string and
//! the array of named stream headers.

use alloc::string::String;
use alloc::vec::Vec;
use log::debug;

use crate::error::{Error, Result};
use crate::io::BinaryReader;

/// `'BSJB'`, little-endian as a `u32`.
pub const METADATA_SIGNATURE: u32 = 0x424A_5342;

fn align_up(value: usize, align: usize) -> usize {
    if align <= 1 {
        return value;
    }
    value.div_ceil(align) * align
}

/// One entry in the metadata root's stream directory.
#[derive(Debug, Clone)]
pub struct StreamHeader {
    /// Byte offset of the stream's data, relative to the start of the metadata root.
    pub offset: u32,
    pub size: u32,
    pub name: String,
}

impl StreamHeader {
    fn parse(reader: &mut BinaryReader) -> Result<Self> {
        let offset = reader.read_u32()?;
        let size = reader.read_u32()?;
        let start = reader.position();
        let name = reader.read_cstr()?.into();
        let consumed = reader.position() - start;
        let padded = align_up(consumed, 4);
        if padded > consumed {
            reader.read_bytes(padded - consumed)?;
        }
        Ok(StreamHeader { offset, size, name })
    }

    /// Slice this stream's bytes out of the metadata root's backing buffer.
    pub fn data<'a>(&self, root_bytes: &'a [u8]) -> Result<&'a [u8]> {
        let start = self.offset as usize;
        let end = start
            .checked_add(self.size as usize)
            .ok_or_else(|| Error::out_of_bounds(self.offset as u64, root_bytes.len()))?;
        root_bytes
            .get(start..end)
            .ok_or_else(|| Error::out_of_bounds(end as u64, root_bytes.len()))
    }
}

/// The CLI metadata root, minus the heap contents themselves (those are reached via
/// [`StreamHeader::data`] against the same backing buffer this was parsed from).
#[derive(Debug, Clone)]
pub struct MetadataRoot {
    pub major_version: u16,
    pub minor_version: u16,
    pub version: String,
    pub flags: u16,
    pub streams: Vec<StreamHeader>,
}

impl MetadataRoot {
    pub fn parse(reader: &mut BinaryReader) -> Result<Self> {
        let signature = reader.read_u32()?;
        if signature != METADATA_SIGNATURE {
            return Err(Error::bad_image(alloc::format!(
                "bad metadata root signature {signature:#x}, expected {METADATA_SIGNATURE:#x}"
            )));
        }
        let major_version = reader.read_u16()?;
        let minor_version = reader.read_u16()?;
        let _reserved = reader.read_u32()?;
        let version_len = reader.read_u32()? as usize;
        let version_bytes = reader.read_bytes(version_len)?;
        let version = String::from_utf8_lossy(
            version_bytes
                .split(|&b| b == 0)
                .next()
                .unwrap_or(version_bytes),
        )
        .into_owned();

        let flags = reader.read_u16()?;
        let stream_count = reader.read_u16()?;
        let mut streams = Vec::with_capacity(stream_count as usize);
        for _ in 0..stream_count {
            streams.push(StreamHeader::parse(reader)?);
        }
        debug!("metadata root {major_version}.{minor_version} '{version}', {stream_count} streams");

        Ok(MetadataRoot {
            major_version,
            minor_version,
            version,
            flags,
            streams,
        })
    }

    /// Find a stream header by its exact name (e.g. `"#Strings"`, `"#~"`, `"#-"`).
    pub fn stream(&self, name: &str) -> Option<&StreamHeader> {
        self.streams.iter().find(|s| s.name == name)
    }

    /// The tables stream, whichever of the two names it was stored under.
    pub fn tables_stream(&self) -> Option<&StreamHeader> {
        self.stream("#~").or_else(|| self.stream("#-"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_root_bytes() -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&METADATA_SIGNATURE.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes()); // major
        bytes.extend_from_slice(&1u16.to_le_bytes()); // minor
        bytes.extend_from_slice(&0u32.to_le_bytes()); // reserved
        let version = b"v4.0.30319\0\0"; // already 4-byte aligned at 12 bytes
        bytes.extend_from_slice(&(version.len() as u32).to_le_bytes());
        bytes.extend_from_slice(version);
        bytes.extend_from_slice(&0u16.to_le_bytes()); // flags
        bytes.extend_from_slice(&1u16.to_le_bytes()); // stream count
        bytes.extend_from_slice(&0x6cu32.to_le_bytes()); // stream offset
        bytes.extend_from_slice(&0x100u32.to_le_bytes()); // stream size
        bytes.extend_from_slice(b"#~\0\0"); // name, padded to 4
        bytes
    }

    #[test]
    fn parses_version_and_streams() {
        let bytes = sample_root_bytes();
        let mut reader = BinaryReader::new(&bytes);
        let root = MetadataRoot::parse(&mut reader).unwrap();
        assert_eq!(root.version, "v4.0.30319");
        assert_eq!(root.streams.len(), 1);
        assert_eq!(root.streams[0].name, "#~");
        assert!(root.tables_stream().is_some());
    }

    #[test]
    fn rejects_bad_signature() {
        let mut bytes = sample_root_bytes();
        bytes[0] = 0;
        let mut reader = BinaryReader::new(&bytes);
        assert!(MetadataRoot::parse(&mut reader).is_err());
    }
}
