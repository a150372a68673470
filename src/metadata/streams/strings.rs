//! The `#Strings` heap: NUL-terminated UTF-8 strings addressed by byte offset.

use alloc::string::String;

use crate::error::{Error, Result};

/// A borrowed view over the `#Strings` heap.
#[derive(Debug, Clone, Copy)]
pub struct StringsHeap<'a> {
    bytes: &'a [u8],
}

impl<'a> StringsHeap<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        StringsHeap { bytes }
    }

    /// Index 0 is always the empty string, by convention; this returns `""` for it without
    /// touching the buffer.
    pub fn get(&self, index: u32) -> Result<String> {
        let index = index as usize;
        if index == 0 {
            return Ok(String::new());
        }
        let slice = self
            .bytes
            .get(index..)
            .ok_or_else(|| Error::out_of_bounds(index as u64, self.bytes.len()))?;
        let end = slice
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| Error::malformed_metadata("#Strings entry is not NUL-terminated"))?;
        core::str::from_utf8(&slice[..end])
            .map(String::from)
            .map_err(|_| Error::malformed_metadata("#Strings entry is not valid utf-8"))
    }
}
