//! The four satellite heaps addressed by index from table columns and signatures: `#Strings`,
//! `#US` (user strings), `#Blob`, and `#GUID`. Each is an append-only byte buffer; lookups are
//! O(1) given the byte (or, for GUID, 1-based slot) offset.

pub mod blob;
pub mod guid;
pub mod strings;
pub mod userstrings;

pub use blob::BlobHeap;
pub use guid::GuidHeap;
pub use strings::StringsHeap;
pub use userstrings::UserStringsHeap;
