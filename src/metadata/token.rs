//! Metadata tokens: the public, flat `(table_id, row_id)` identifier CLI bytecode and other
//! metadata rows reference each other by, and the resolver that turns one into a row view.

use crate::error::{Error, Result};
use crate::metadata::tables::row::TableRow;
use crate::metadata::tables::schema::TableId;
use crate::metadata::tables::TablesStream;

/// A metadata token: a table id in the top byte, a 1-based row id in the low 24 bits. `(0, 0)`
/// (i.e. `0x00000000`) is the universal NULL token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetadataToken {
    pub table_id: u8,
    pub row_id: u32,
}

impl MetadataToken {
    pub const NULL: MetadataToken = MetadataToken {
        table_id: 0,
        row_id: 0,
    };

    pub fn is_null(self) -> bool {
        self.table_id == 0 && self.row_id == 0
    }

    pub fn from_u32(raw: u32) -> MetadataToken {
        MetadataToken {
            table_id: (raw >> 24) as u8,
            row_id: raw & 0x00FF_FFFF,
        }
    }

    pub fn to_u32(self) -> u32 {
        ((self.table_id as u32) << 24) | (self.row_id & 0x00FF_FFFF)
    }

    pub fn table(self) -> Option<TableId> {
        TableId::from_u8(self.table_id)
    }
}

/// Resolves metadata tokens against a borrowed [`TablesStream`]. Holding a reference rather than
/// owning the stream keeps a single parsed metadata image shareable across however many
/// resolutions a caller needs, without cloning row data.
#[derive(Debug, Clone, Copy)]
pub struct TokenResolver<'a> {
    tables: &'a TablesStream,
}

impl<'a> TokenResolver<'a> {
    pub fn new(tables: &'a TablesStream) -> Self {
        TokenResolver { tables }
    }

    /// Resolves `token` to its row. NULL resolves to `Ok(None)`; a nonzero `row_id` that is out
    /// of range, or a table id not in the closed schema, is [`Error::malformed_metadata`].
    pub fn resolve(&self, token: MetadataToken) -> Result<Option<&'a TableRow>> {
        if token.is_null() {
            return Ok(None);
        }
        let table = token
            .table()
            .ok_or_else(|| Error::malformed_metadata("metadata token names an undefined table"))?;
        self.tables
            .row(table, token.row_id)
            .map(Some)
            .ok_or_else(|| {
                Error::malformed_metadata("metadata token row id is out of range for its table")
            })
    }
}
