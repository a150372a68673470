//! The `#~`/`#-` tables heap: the fixed header, the per-table row counts, and the 45-table row
//! data that everything else in `metadata` (signatures, tokens, the type system) is built on.

pub mod coded_index;
pub mod row;
pub mod schema;

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::io::BinaryReader;

use coded_index::{coded_index_width, CodedIndex};
use row::{ColumnValue, TableRow};
use schema::{columns, ColumnKind, TableId, MAX_TABLE_ID};

const HEAP_WIDE_STRINGS: u8 = 0x01;
const HEAP_WIDE_GUIDS: u8 = 0x02;
const HEAP_WIDE_BLOBS: u8 = 0x04;

/// The parsed `#~`/`#-` stream: row counts for every table plus the decoded rows themselves.
///
/// `#-` (the "uncompressed"/edit-and-continue variant some tools emit) shares this exact header
/// and row layout; it differs only in that its `valid_mask` may include extra bookkeeping bits
/// tools ignore and it is not guaranteed sorted. Both are handled by the same parser.
#[derive(Debug, Clone)]
pub struct TablesStream {
    pub major_version: u8,
    pub minor_version: u8,
    pub heap_sizes_flags: u8,
    pub valid_mask: u64,
    pub sorted_mask: u64,
    row_counts: [u32; MAX_TABLE_ID as usize + 1],
    tables: BTreeMap<TableId, Vec<TableRow>>,
    /// Bytes left over after the last declared row, if the stream is longer than the schema
    /// accounts for. Some toolchains pad or append private data here; it is preserved verbatim
    /// rather than rejected so a rebuild can round-trip it.
    raw_extra: Vec<u8>,
}

impl TablesStream {
    pub fn row_count(&self, table: TableId) -> u32 {
        self.row_counts[table.to_u8() as usize]
    }

    pub fn rows(&self, table: TableId) -> &[TableRow] {
        self.tables
            .get(&table)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn row(&self, table: TableId, row_id: u32) -> Option<&TableRow> {
        if row_id == 0 {
            return None;
        }
        self.rows(table).get(row_id as usize - 1)
    }

    pub fn raw_extra(&self) -> &[u8] {
        &self.raw_extra
    }

    fn string_index_width(&self) -> usize {
        if self.heap_sizes_flags & HEAP_WIDE_STRINGS != 0 {
            4
        } else {
            2
        }
    }

    fn guid_index_width(&self) -> usize {
        if self.heap_sizes_flags & HEAP_WIDE_GUIDS != 0 {
            4
        } else {
            2
        }
    }

    fn blob_index_width(&self) -> usize {
        if self.heap_sizes_flags & HEAP_WIDE_BLOBS != 0 {
            4
        } else {
            2
        }
    }

    fn simple_index_width(&self, target: TableId) -> usize {
        if self.row_count(target) > 0xFFFF {
            4
        } else {
            2
        }
    }

    fn column_width(&self, kind: ColumnKind) -> usize {
        match kind {
            ColumnKind::Fixed1 => 1,
            ColumnKind::Fixed2 => 2,
            ColumnKind::Fixed4 => 4,
            ColumnKind::StringIndex => self.string_index_width(),
            ColumnKind::GuidIndex => self.guid_index_width(),
            ColumnKind::BlobIndex => self.blob_index_width(),
            ColumnKind::SimpleIndex(target) => self.simple_index_width(target),
            ColumnKind::CodedIndex(coded) => {
                coded_index_width(coded, |t| self.row_count(t))
            }
        }
    }

    fn read_column(&self, reader: &mut BinaryReader, kind: ColumnKind) -> Result<ColumnValue> {
        let width = self.column_width(kind);
        let raw = match width {
            1 => reader.read_u8()? as u32,
            2 => reader.read_u16()? as u32,
            4 => reader.read_u32()?,
            _ => unreachable!("column widths are always 1, 2, or 4 bytes"),
        };
        match kind {
            ColumnKind::CodedIndex(coded) => Ok(ColumnValue::Coded(CodedIndex::decode(coded, raw)?)),
            _ => Ok(ColumnValue::Value(raw)),
        }
    }

    /// Parses the `#~`/`#-` stream body. `data` is the full stream bytes (the stream header's
    /// `size` slice of the metadata root), not the whole metadata root.
    pub fn parse(data: &[u8]) -> Result<TablesStream> {
        let mut reader = BinaryReader::new(data);
        let _reserved = reader.read_u32()?;
        let major_version = reader.read_u8()?;
        let minor_version = reader.read_u8()?;
        let heap_sizes_flags = reader.read_u8()?;
        let _reserved2 = reader.read_u8()?;
        let valid_mask = reader.read_u64()?;
        let sorted_mask = reader.read_u64()?;

        let mut row_counts = [0u32; MAX_TABLE_ID as usize + 1];
        for id in 0..=MAX_TABLE_ID {
            if valid_mask & (1u64 << id) != 0 {
                if TableId::from_u8(id).is_none() {
                    return Err(Error::malformed_metadata(
                        "valid_mask sets a reserved table id",
                    ));
                }
                row_counts[id as usize] = reader.read_u32()?;
            }
        }

        let mut stream = TablesStream {
            major_version,
            minor_version,
            heap_sizes_flags,
            valid_mask,
            sorted_mask,
            row_counts,
            tables: BTreeMap::new(),
            raw_extra: Vec::new(),
        };

        for id in 0..=MAX_TABLE_ID {
            if valid_mask & (1u64 << id) == 0 {
                continue;
            }
            let table = TableId::from_u8(id).expect("validated above");
            let count = stream.row_counts[id as usize];
            let schema = columns(table);
            let mut rows = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let mut cols = Vec::with_capacity(schema.len());
                for kind in schema {
                    cols.push(stream.read_column(&mut reader, *kind)?);
                }
                rows.push(TableRow::new(cols));
            }
            stream.tables.insert(table, rows);
        }

        let pos = reader.position();
        stream.raw_extra = reader.as_slice()[pos..].to_vec();
        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_header(valid_mask: u64, row_counts: &[u32]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.push(2); // major
        bytes.push(0); // minor
        bytes.push(0); // heap_sizes_flags: all heaps narrow
        bytes.push(1); // reserved2
        bytes.extend_from_slice(&valid_mask.to_le_bytes());
        bytes.extend_from_slice(&0u64.to_le_bytes()); // sorted_mask
        for count in row_counts {
            bytes.extend_from_slice(&count.to_le_bytes());
        }
        bytes
    }

    #[test]
    fn parses_module_table_only() {
        // Module: Generation(u2), Name(string idx, 2 bytes), Mvid(guid idx, 2), EncId(2), EncBaseId(2)
        let mut bytes = minimal_header(1 << 0, &[1]);
        bytes.extend_from_slice(&1u16.to_le_bytes()); // generation
        bytes.extend_from_slice(&5u16.to_le_bytes()); // name
        bytes.extend_from_slice(&1u16.to_le_bytes()); // mvid
        bytes.extend_from_slice(&0u16.to_le_bytes()); // enc id
        bytes.extend_from_slice(&0u16.to_le_bytes()); // enc base id

        let stream = TablesStream::parse(&bytes).unwrap();
        assert_eq!(stream.row_count(TableId::Module), 1);
        let row = stream.row(TableId::Module, 1).unwrap();
        assert_eq!(row.column(0).as_value(), 1);
        assert_eq!(row.column(1).as_value(), 5);
        assert!(stream.raw_extra().is_empty());
    }

    #[test]
    fn widens_typedef_simple_index_when_field_table_is_huge() {
        // TypeDef references Field/MethodDef via simple index; force Field row count above 2^16
        // so TypeDef's FieldList column must be read as 4 bytes.
        let big_field_count = (1u32 << 16) + 1;
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.push(2);
        bytes.push(0);
        bytes.push(0);
        bytes.push(1);
        let valid = (1u64 << TableId::TypeDef.to_u8()) | (1u64 << TableId::Field.to_u8());
        bytes.extend_from_slice(&valid.to_le_bytes());
        bytes.extend_from_slice(&0u64.to_le_bytes());
        // row counts in ascending table id order: Field(4) comes before TypeDef(2)? No: TypeDef=2 < Field=4.
        bytes.extend_from_slice(&1u32.to_le_bytes()); // TypeDef row count
        bytes.extend_from_slice(&big_field_count.to_le_bytes()); // Field row count

        // TypeDef row: Flags(4), Name(2), Namespace(2), Extends(coded TypeDefOrRef, 2 bytes: max(rows)=1 for TypeDef/TypeSpec/TypeRef all 0 except none set -> 2 bytes), FieldList(simple->Field, now 4 bytes since Field rows > 2^16), MethodList(simple->MethodDef, 2 bytes since 0 rows)
        bytes.extend_from_slice(&0u32.to_le_bytes()); // flags
        bytes.extend_from_slice(&0u16.to_le_bytes()); // name
        bytes.extend_from_slice(&0u16.to_le_bytes()); // namespace
        bytes.extend_from_slice(&0u16.to_le_bytes()); // extends (coded, narrow)
        bytes.extend_from_slice(&1u32.to_le_bytes()); // field list (widened to 4 bytes)
        bytes.extend_from_slice(&0u16.to_le_bytes()); // method list (narrow)

        let stream = TablesStream::parse(&bytes).unwrap();
        assert_eq!(stream.row_count(TableId::Field), big_field_count);
        let row = stream.row(TableId::TypeDef, 1).unwrap();
        assert_eq!(row.column(4).as_value(), 1);
    }
}
