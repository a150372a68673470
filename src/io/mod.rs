//! Shared binary I/O primitives: a random-access reader and a sequential writer.
//!
//! These are the core's only collaborators for byte-level access — everything above this layer
//! (the PE model, the segment tree, the metadata engine, the x86 codec) goes through a
//! [`BinaryReader`] or [`BinaryWriter`] rather than indexing slices directly.

mod reader;
mod writer;

pub use reader::BinaryReader;
pub use writer::{BinaryWriter, PooledWriter, WriterPool};
