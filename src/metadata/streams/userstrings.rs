//! The `#US` (user strings) heap: length-prefixed UTF-16LE strings, the one heap whose entries
//! are not UTF-8. Each entry is `compressed_len` bytes of UTF-16 code units plus one trailing
//! byte (non-zero iff any code unit has its high bit set or is a disallowed single-byte char).

use alloc::string::String;
use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::io::BinaryReader;

/// A borrowed view over the `#US` heap.
#[derive(Debug, Clone, Copy)]
pub struct UserStringsHeap<'a> {
    bytes: &'a [u8],
}

impl<'a> UserStringsHeap<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        UserStringsHeap { bytes }
    }

    /// Index 0 is always the empty string.
    pub fn get(&self, index: u32) -> Result<String> {
        let index = index as usize;
        if index == 0 {
            return Ok(String::new());
        }
        let mut reader = BinaryReader::new(
            self.bytes
                .get(index..)
                .ok_or_else(|| Error::out_of_bounds(index as u64, self.bytes.len()))?,
        );
        let len = reader.read_compressed_u32()? as usize;
        if len == 0 {
            return Ok(String::new());
        }
        let entry = reader.read_bytes(len)?;
        let code_unit_bytes = &entry[..len - 1];
        if code_unit_bytes.len() % 2 != 0 {
            return Err(Error::malformed_metadata(
                "#US entry's code unit region has an odd byte length",
            ));
        }
        let units: Vec<u16> = code_unit_bytes
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        String::from_utf16(&units)
            .map_err(|_| Error::malformed_metadata("#US entry is not valid utf-16"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_for(s: &str) -> alloc::vec::Vec<u8> {
        let mut bytes = alloc::vec::Vec::new();
        let mut payload = alloc::vec::Vec::new();
        for unit in s.encode_utf16() {
            payload.extend_from_slice(&unit.to_le_bytes());
        }
        payload.push(0); // trailing flag byte
        bytes.push(payload.len() as u8);
        bytes.extend_from_slice(&payload);
        bytes
    }

    #[test]
    fn reads_utf16_string() {
        let mut heap_bytes = alloc::vec![0u8];
        heap_bytes.extend_from_slice(&entry_for("Hi"));
        let heap = UserStringsHeap::new(&heap_bytes);
        assert_eq!(heap.get(1).unwrap(), "Hi");
    }

    #[test]
    fn index_zero_is_empty() {
        let heap = UserStringsHeap::new(&[0]);
        assert_eq!(heap.get(0).unwrap(), "");
    }
}
