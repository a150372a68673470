//! Binary container width (32- vs 64-bit) and the small parsing context built from it.
//!
//! PE32 and PE32+ differ only in a handful of optional-header fields widening from `u32` to
//! `u64`; everything else in the file is identical. Rather than duplicating every downstream
//! parser per width, components take a [`Container`] (or the richer [`Ctx`]) and branch on it in
//! the few places width actually matters.

use scroll::Endian;

/// Whether a binary is natively 32-bit ("little") or 64-bit ("big") in its pointer-sized fields.
///
/// The names mirror the convention used throughout the pack this module is grounded on: `Little`
/// is not an endianness here, it is a historical synonym for "small/32-bit" container.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Container {
    /// A 32-bit (PE32) container.
    Little,
    /// A 64-bit (PE32+) container.
    Big,
}

impl Default for Container {
    fn default() -> Self {
        Container::Little
    }
}

impl Container {
    /// The width of a native pointer-sized field, in bytes.
    pub fn size(self) -> usize {
        match self {
            Container::Little => 4,
            Container::Big => 8,
        }
    }

    /// `true` for the 64-bit (PE32+) container.
    pub fn is_big(self) -> bool {
        matches!(self, Container::Big)
    }
}

/// A binary parsing context: container width plus byte order.
///
/// PE images are always little-endian on disk, but threading the endianness through explicitly
/// (rather than hard-coding `scroll::LE` everywhere) keeps the metadata and segment layers
/// reusable if a caller ever needs to inspect a byte-swapped capture.
#[derive(Debug, Clone, Copy)]
pub struct Ctx {
    pub container: Container,
    pub le: Endian,
}

impl Ctx {
    pub fn new(container: Container, le: Endian) -> Self {
        Ctx { container, le }
    }

    pub fn is_big(self) -> bool {
        self.container.is_big()
    }
}

impl Default for Ctx {
    fn default() -> Self {
        Ctx {
            container: Container::Little,
            le: scroll::LE,
        }
    }
}

impl From<Container> for Ctx {
    fn from(container: Container) -> Self {
        Ctx {
            container,
            le: scroll::LE,
        }
    }
}
