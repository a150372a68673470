//! Unified parsing options for the PE and metadata parsers.

use core::result;

/// Binary parsing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// Standard parsing mode — fails on the first structural violation.
    Strict,
    /// Permissive parsing mode — downgrades specific, named recoverable violations to a logged
    /// warning plus a default or substituted value, rather than aborting the whole parse.
    Permissive,
}

impl Default for ParseMode {
    fn default() -> Self {
        ParseMode::Strict
    }
}

impl ParseMode {
    pub(crate) fn is_permissive(&self) -> bool {
        matches!(self, ParseMode::Permissive)
    }
}

/// Whether a PE image is being parsed as its on-disk layout, or as an OS loader would map it
/// into memory.
///
/// The two modes disagree about how a section header's `(file_offset, size)` pair is computed —
/// see [`crate::pe::PEFile::parse_with_opts`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingMode {
    /// The reader sees the file exactly as it sits on disk: section contents live at
    /// `pointer_to_raw_data`, sized `size_of_raw_data`.
    Unmapped,
    /// The reader sees a process image the way a loader mapped it: section contents live at
    /// `virtual_address` (relative to the image's own base in the reader), sized `virtual_size`.
    Mapped,
}

impl Default for MappingMode {
    fn default() -> Self {
        MappingMode::Unmapped
    }
}

/// Parsing options shared by the PE and metadata parsers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    pub mode: ParseMode,
    pub mapping: MappingMode,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            mode: ParseMode::default(),
            mapping: MappingMode::default(),
        }
    }
}

impl ParseOptions {
    pub fn new() -> Self {
        Default::default()
    }

    /// Options for parsing a file exactly as it sits on disk, strictly.
    pub fn unmapped() -> Self {
        ParseOptions {
            mode: ParseMode::Strict,
            mapping: MappingMode::Unmapped,
        }
    }

    /// Options for parsing an in-memory mapped image, strictly.
    pub fn mapped() -> Self {
        ParseOptions {
            mode: ParseMode::Strict,
            mapping: MappingMode::Mapped,
        }
    }

    pub fn with_mode(mut self, mode: ParseMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_mapping(mut self, mapping: MappingMode) -> Self {
        self.mapping = mapping;
        self
    }
}

/// Helper trait to ease permissive-mode fallbacks at call sites.
///
/// When `permissive` is true, errors are downgraded to a `log::warn!` (if the `alloc` feature's
/// `log` dependency is enabled) and a default or provided value is substituted; otherwise the
/// original error is propagated unchanged.
pub(crate) trait Permissive<T, E> {
    fn or_permissive_and_default(self, permissive: bool, context: &str) -> result::Result<T, E>
    where
        T: Default;

    #[allow(unused)]
    fn or_permissive_and_value(
        self,
        permissive: bool,
        context: &str,
        value: T,
    ) -> result::Result<T, E>;
}

impl<T, E: core::fmt::Display> Permissive<T, E> for result::Result<T, E> {
    fn or_permissive_and_default(self, permissive: bool, context: &str) -> result::Result<T, E>
    where
        T: Default,
    {
        self.or_else(|e| {
            if permissive {
                #[cfg(feature = "alloc")]
                log::warn!("{context}: {e}, continuing with default value");
                Ok(T::default())
            } else {
                Err(e)
            }
        })
    }

    fn or_permissive_and_value(
        self,
        permissive: bool,
        context: &str,
        value: T,
    ) -> result::Result<T, E> {
        self.or_else(|e| {
            if permissive {
                #[cfg(feature = "alloc")]
                log::warn!("{context}: {e}, continuing with provided value");
                Ok(value)
            } else {
                Err(e)
            }
        })
    }
}
