//! The universal "chunk of bytes at a `(file_offset, rva)` pair" abstraction.
//!
//! A [`Segment`] either owns raw bytes, is a zero-padded wrapper around a smaller segment, is a
//! composite sequence of sub-segments, or is a base segment with after-the-fact byte patches
//! applied ([`patched::PatchedSegment`]). Rather than an open trait hierarchy ("every segment
//! is-a base segment"), the four shapes are a closed enum dispatching through one inherent impl —
//! the deep-inheritance case from the design notes realized as a capability enum.
//!
//! Rebuilding a tree of segments is a two-phase walk:
//!
//! 1. [`Segment::assign_offsets`] walks top-down, giving every segment (and recursively, its
//!    children) a new `file_offset`/`rva` derived from its parent's plus accumulated sibling
//!    sizes and alignment padding.
//! 2. [`Segment::write`] walks again and serializes each leaf; composites simply concatenate
//!    their children's output.

pub mod patched;

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::io::BinaryWriter;

pub use patched::{Patch, PatchValue, PatchedSegment};

/// Parameters threaded down an [`Segment::assign_offsets`] walk.
#[derive(Debug, Clone, Copy)]
pub struct OffsetAssignment {
    pub new_file_offset: u64,
    pub new_rva: u32,
    /// Alignment the *parent* wants its children's file offsets rounded up to (0/1 = none).
    pub parent_alignment: u32,
}

/// A chunk of bytes at a `(file_offset, rva)` pair, with a virtual size that may exceed its
/// physical size (the gap is zero-filled at load).
#[derive(Debug)]
pub struct Segment {
    file_offset: u64,
    rva: u32,
    kind: SegmentKind,
}

#[derive(Debug)]
enum SegmentKind {
    /// Owns raw bytes outright; physical size == virtual size == length.
    Raw(Vec<u8>),
    /// An ordered sequence of sub-segments, laid out back-to-back (with alignment padding between
    /// them) at rebuild time.
    Composite(Vec<Segment>),
    /// Wraps a smaller segment, reporting a larger virtual size; the gap is zero-filled on write.
    Padded {
        inner: Box<Segment>,
        virtual_size: u32,
    },
    /// A base segment plus edits applied after the base serializes itself.
    Patched(PatchedSegment),
}

fn align_up(value: u64, align: u32) -> u64 {
    if align <= 1 {
        return value;
    }
    let align = align as u64;
    value.div_ceil(align) * align
}

impl Segment {
    /// A leaf segment that owns `bytes` outright.
    pub fn raw(bytes: Vec<u8>) -> Self {
        Segment {
            file_offset: 0,
            rva: 0,
            kind: SegmentKind::Raw(bytes),
        }
    }

    /// A composite segment laying out `children` back to back.
    pub fn composite(children: Vec<Segment>) -> Self {
        Segment {
            file_offset: 0,
            rva: 0,
            kind: SegmentKind::Composite(children),
        }
    }

    /// Wrap `inner` so it reports `virtual_size` instead of its natural size. `virtual_size` must
    /// be `>= inner.virtual_size()`; violating this is an [`crate::error::ErrorKind::InvariantViolation`].
    pub fn padded(inner: Segment, virtual_size: u32) -> Result<Self> {
        if virtual_size < inner.virtual_size() {
            return Err(Error::invariant_violation(
                "padded segment's virtual size must be >= its inner segment's virtual size",
            ));
        }
        Ok(Segment {
            file_offset: 0,
            rva: 0,
            kind: SegmentKind::Padded {
                inner: Box::new(inner),
                virtual_size,
            },
        })
    }

    /// Wrap `base` with a list of post-serialization byte patches. See [`PatchedSegment`].
    pub fn patched(base: Segment, patches: Vec<Patch>) -> Self {
        Segment {
            file_offset: 0,
            rva: 0,
            kind: SegmentKind::Patched(PatchedSegment::new(base, patches)),
        }
    }

    pub fn file_offset(&self) -> u64 {
        self.file_offset
    }

    pub fn rva(&self) -> u32 {
        self.rva
    }

    /// The number of bytes this segment actually carries on disk.
    ///
    /// For a composite, this is measured from the composite's own assigned `file_offset` to the
    /// end of its last child, so it correctly includes any inter-child alignment padding applied
    /// by [`assign_offsets`](Segment::assign_offsets). Before assignment has run, a composite
    /// reports the naive sum of its children's sizes (no gaps).
    pub fn physical_size(&self) -> u32 {
        match &self.kind {
            SegmentKind::Raw(bytes) => bytes.len() as u32,
            SegmentKind::Composite(children) => match children.last() {
                Some(last) if last.file_offset() > 0 || self.file_offset > 0 => {
                    (last.file_offset() + last.physical_size() as u64 - self.file_offset) as u32
                }
                _ => children.iter().map(|c| c.physical_size()).sum(),
            },
            SegmentKind::Padded { inner, .. } => inner.physical_size(),
            SegmentKind::Patched(p) => p.physical_size(),
        }
    }

    /// The number of bytes this segment occupies once loaded; always `>= physical_size()`.
    pub fn virtual_size(&self) -> u32 {
        match &self.kind {
            SegmentKind::Raw(bytes) => bytes.len() as u32,
            SegmentKind::Composite(children) => match children.last() {
                Some(last) if last.rva() > 0 || self.rva > 0 => last.rva() + last.virtual_size() - self.rva,
                _ => children.iter().map(|c| c.virtual_size()).sum(),
            },
            SegmentKind::Padded { virtual_size, .. } => *virtual_size,
            SegmentKind::Patched(p) => p.virtual_size(),
        }
    }

    /// All segment kinds support offset reassignment; kept as a method (rather than assuming it)
    /// so a future variant could opt out without breaking the walk.
    pub fn can_update_offsets(&self) -> bool {
        true
    }

    /// Top-down offset assignment: give this segment its new `(file_offset, rva)`, then
    /// recursively lay out children with per-child alignment padding.
    pub fn assign_offsets(&mut self, params: OffsetAssignment) {
        self.file_offset = params.new_file_offset;
        self.rva = params.new_rva;
        if let SegmentKind::Composite(children) = &mut self.kind {
            let mut file_offset = params.new_file_offset;
            let mut rva = params.new_rva;
            for child in children.iter_mut() {
                file_offset = align_up(file_offset, params.parent_alignment);
                let rva_aligned = align_up(rva as u64, params.parent_alignment) as u32;
                child.assign_offsets(OffsetAssignment {
                    new_file_offset: file_offset,
                    new_rva: rva_aligned,
                    parent_alignment: params.parent_alignment,
                });
                file_offset += child.physical_size() as u64;
                rva = rva_aligned + child.virtual_size();
            }
        } else if let SegmentKind::Padded { inner, .. } = &mut self.kind {
            inner.assign_offsets(params);
        } else if let SegmentKind::Patched(p) = &mut self.kind {
            p.assign_offsets(params);
        }
    }

    /// Serialize this segment's physical bytes into `writer`. Composites concatenate their
    /// children; padded/raw segments never emit their virtual tail (the loader is responsible for
    /// zero-filling it).
    pub fn write(&self, writer: &mut BinaryWriter) -> Result<()> {
        match &self.kind {
            SegmentKind::Raw(bytes) => {
                writer.write_bytes(bytes);
                Ok(())
            }
            SegmentKind::Composite(children) => {
                for child in children {
                    child.write(writer)?;
                }
                Ok(())
            }
            SegmentKind::Padded { inner, .. } => inner.write(writer),
            SegmentKind::Patched(p) => p.write(writer),
        }
    }

    /// Convenience: serialize to a freshly allocated `Vec<u8>`.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut w = BinaryWriter::with_capacity(self.physical_size() as usize);
        self.write(&mut w)?;
        Ok(w.into_bytes())
    }
}
