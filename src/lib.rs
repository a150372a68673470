//! `imagecore`: a PE/COFF and CLI (.NET) metadata parsing/rewriting library, plus a small x86
//! ModR/M instruction encoder/decoder.
//!
//! The three hard pieces live in [`pe`] (the PE file model and offset rebuilding), [`metadata`]
//! (the `#~`/`#-` tables heap and its satellite heaps/signatures), and [`x86`] (instruction
//! encoding and decoding). [`segment`] and [`io`] are the shared plumbing both layers build on.
//!
//! This crate is `no_std` by default; enable `std` (the default feature) for `std::error::Error`
//! and the full `scroll` backend.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod container;
pub mod error;
pub mod io;
pub mod metadata;
pub mod options;
pub mod pe;
pub mod segment;
pub mod x86;

pub use container::{Container, Ctx};
pub use error::{Error, ErrorKind, Result};
pub use options::{MappingMode, ParseMode, ParseOptions};
pub use pe::PEFile;
