//! Coded-index encoding: a tagged `(table, row)` pair packed into the low bits of an otherwise
//! plain index column, per ECMA-335 §II.24.2.6.

use crate::error::{Error, Result};
use crate::metadata::tables::schema::{CodedIndexKind, TableId};

/// A decoded coded index: which table a row lives in, and its 1-based row number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodedIndex {
    pub table: TableId,
    pub row: u32,
}

impl CodedIndex {
    /// Decodes `raw` under `kind`'s tag width. `raw == 0` always means a null reference.
    pub fn decode(kind: CodedIndexKind, raw: u32) -> Result<Option<CodedIndex>> {
        if raw == 0 {
            return Ok(None);
        }
        let tag_bits = kind.tag_bits();
        let tag_mask = (1u32 << tag_bits) - 1;
        let tag = (raw & tag_mask) as usize;
        let row = raw >> tag_bits;
        let table = kind.tables().get(tag).copied().flatten().ok_or_else(|| {
            Error::malformed_metadata("coded index tag selects an unassigned table")
        })?;
        Ok(Some(CodedIndex { table, row }))
    }

    /// The inverse of [`decode`]: packs `self` back into a tagged raw value.
    pub fn encode(self, kind: CodedIndexKind) -> Result<u32> {
        let tag = kind
            .tables()
            .iter()
            .position(|t| *t == Some(self.table))
            .ok_or_else(|| {
                Error::malformed_metadata("table is not a valid target for this coded index kind")
            })? as u32;
        Ok((self.row << kind.tag_bits()) | tag)
    }
}

/// The on-disk column width (2 or 4 bytes) for a coded index, given the row count of every table
/// it can target. Per ECMA-335 §II.24.2.6: 2 bytes unless the largest target table's row count
/// would overflow the bits left after the tag, in which case 4.
pub fn coded_index_width(kind: CodedIndexKind, row_count_of: impl Fn(TableId) -> u32) -> usize {
    let tag_bits = kind.tag_bits();
    let max_rows = kind
        .tables()
        .iter()
        .filter_map(|t| *t)
        .map(row_count_of)
        .max()
        .unwrap_or(0);
    if (max_rows as u64) << tag_bits >= 1u64 << 16 {
        4
    } else {
        2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_coded_index_is_none() {
        assert_eq!(
            CodedIndex::decode(CodedIndexKind::TypeDefOrRef, 0).unwrap(),
            None
        );
    }

    #[test]
    fn round_trips_through_encode_decode() {
        let kind = CodedIndexKind::TypeDefOrRef;
        let idx = CodedIndex {
            table: TableId::TypeRef,
            row: 42,
        };
        let raw = idx.encode(kind).unwrap();
        assert_eq!(CodedIndex::decode(kind, raw).unwrap(), Some(idx));
    }

    #[test]
    fn widens_when_rows_exceed_sixteen_bits() {
        let kind = CodedIndexKind::TypeDefOrRef; // 2 tag bits
        let small = coded_index_width(kind, |_| 10);
        assert_eq!(small, 2);
        let wide = coded_index_width(kind, |t| if t == TableId::TypeDef { 1 << 14 } else { 0 });
        assert_eq!(wide, 4);
    }
}
