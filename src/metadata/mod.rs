//! CLI metadata: the `.NET` directory, metadata root, heaps, tables, signatures, tokens, and
//! type system layered on top of a parsed [`PEFile`](crate::pe::PEFile).
//!
//! Layering mirrors the data flow: [`NetDirectory`] names the metadata root's RVA; [`MetadataRoot`]
//! names the heap streams; [`tables::TablesStream`] is one of those streams, decoded into rows;
//! [`signature`] decodes the blobs those rows point into; [`token::TokenResolver`] turns a raw
//! 32-bit token back into a row.

pub mod net_directory;
pub mod root;
pub mod signature;
pub mod streams;
pub mod tables;
pub mod token;
pub mod type_system;

use log::debug;

use crate::error::{Error, Result};
use crate::io::BinaryReader;
use crate::pe::utils::find_offset;
use crate::pe::PEFile;

pub use net_directory::NetDirectory;
pub use root::MetadataRoot;
pub use streams::{BlobHeap, GuidHeap, StringsHeap, UserStringsHeap};
pub use tables::TablesStream;
pub use token::{MetadataToken, TokenResolver};

/// A fully parsed CLI metadata image: the CLR header, the metadata root, the four heaps, and the
/// decoded tables stream. Heaps borrow directly from the image bytes passed to [`Metadata::parse`];
/// nothing here is copied beyond the tables stream's own decoded rows.
#[derive(Debug)]
pub struct Metadata<'a> {
    pub net_directory: NetDirectory,
    pub root: MetadataRoot,
    pub strings: StringsHeap<'a>,
    pub user_strings: UserStringsHeap<'a>,
    pub blob: BlobHeap<'a>,
    pub guid: GuidHeap<'a>,
    pub tables: TablesStream,
}

impl<'a> Metadata<'a> {
    /// Locates and parses the CLI metadata directory of an already-parsed PE image.
    ///
    /// `image_bytes` must be the same (unmapped, on-disk) byte buffer `pe` was parsed from;
    /// every RVA the metadata directory names is resolved against `pe.sections` the way
    /// [`crate::pe::utils::find_offset`] resolves any other data directory.
    pub fn parse(pe: &PEFile, image_bytes: &'a [u8]) -> Result<Metadata<'a>> {
        let optional_header = pe
            .optional_header
            .as_ref()
            .ok_or_else(|| Error::bad_image("PE has no optional header to hold a CLR directory"))?;
        let clr_dir = optional_header
            .data_directories
            .clr_runtime_header()
            .ok_or_else(|| Error::bad_image("image has no CLR runtime header directory"))?;
        let clr_offset = find_offset(clr_dir.rva as usize, &pe.sections)
            .ok_or_else(|| Error::bad_image("CLR runtime header RVA maps to no section"))?;

        let mut reader = BinaryReader::new(image_bytes);
        reader.seek(clr_offset)?;
        let net_directory = NetDirectory::parse(&mut reader)?;
        debug!("{net_directory:#?}");

        let root_offset = find_offset(net_directory.metadata.rva as usize, &pe.sections)
            .ok_or_else(|| Error::bad_image("metadata root RVA maps to no section"))?;
        let root_bytes = image_bytes
            .get(root_offset..root_offset + net_directory.metadata.size as usize)
            .ok_or_else(|| {
                Error::out_of_bounds(root_offset as u64, image_bytes.len())
            })?;

        let mut root_reader = BinaryReader::new(root_bytes);
        let root = MetadataRoot::parse(&mut root_reader)?;
        debug!("{root:#?}");

        let strings = StringsHeap::new(
            root.stream("#Strings")
                .map(|s| s.data(root_bytes))
                .transpose()?
                .unwrap_or(&[]),
        );
        let user_strings = UserStringsHeap::new(
            root.stream("#US")
                .map(|s| s.data(root_bytes))
                .transpose()?
                .unwrap_or(&[]),
        );
        let blob = BlobHeap::new(
            root.stream("#Blob")
                .map(|s| s.data(root_bytes))
                .transpose()?
                .unwrap_or(&[]),
        );
        let guid = GuidHeap::new(
            root.stream("#GUID")
                .map(|s| s.data(root_bytes))
                .transpose()?
                .unwrap_or(&[]),
        );

        let tables_stream_header = root
            .tables_stream()
            .ok_or_else(|| Error::malformed_metadata("metadata root has no #~/#- stream"))?;
        let tables = TablesStream::parse(tables_stream_header.data(root_bytes)?)?;

        Ok(Metadata {
            net_directory,
            root,
            strings,
            user_strings,
            blob,
            guid,
            tables,
        })
    }

    pub fn resolver(&self) -> TokenResolver<'_> {
        TokenResolver::new(&self.tables)
    }
}
