//! Whole-component metadata scenarios: a minimal managed PE, parsed end to end through
//! `Metadata::parse`, down to resolving its entry-point token.

use imagecore::metadata::Metadata;
use imagecore::metadata::tables::schema::TableId;
use imagecore::pe::PEFile;

fn push_dir(buf: &mut Vec<u8>, rva: u32, size: u32) {
    buf.extend_from_slice(&rva.to_le_bytes());
    buf.extend_from_slice(&size.to_le_bytes());
}

/// Builds a `#~` tables-heap payload with exactly one `Module`, `TypeDef`, and `MethodDef` row.
/// `field_rows`/`param_rows`/`typedef_extra_rows` let callers grow the `Field`/`Param`/`TypeDef`
/// row counts to force the coded-index/simple-index width to widen past 16 bits.
fn tables_heap_bytes(field_rows: u32, param_rows: u32) -> Vec<u8> {
    let mut tables: Vec<(TableId, u32)> = vec![
        (TableId::Module, 1),
        (TableId::TypeDef, 1),
        (TableId::MethodDef, 1),
    ];
    if field_rows > 0 {
        tables.push((TableId::Field, field_rows));
    }
    if param_rows > 0 {
        tables.push((TableId::Param, param_rows));
    }
    tables.sort_by_key(|(id, _)| id.to_u8());

    let mut valid_mask = 0u64;
    for (id, _) in &tables {
        valid_mask |= 1u64 << id.to_u8();
    }

    let mut bytes = Vec::new();
    bytes.extend_from_slice(&0u32.to_le_bytes()); // reserved
    bytes.push(2); // major
    bytes.push(0); // minor
    bytes.push(0); // heap_sizes_flags: all heap indices narrow
    bytes.push(0); // reserved2
    bytes.extend_from_slice(&valid_mask.to_le_bytes());
    bytes.extend_from_slice(&0u64.to_le_bytes()); // sorted_mask

    for (_, rows) in &tables {
        bytes.extend_from_slice(&rows.to_le_bytes());
    }

    let field_row_count = field_rows;
    let param_row_count = param_rows;
    let field_index_width = if (field_row_count as u64) << 1 >= 1u64 << 16 { 4 } else { 2 };
    let param_index_width = if (param_row_count as u64) << 1 >= 1u64 << 16 { 4 } else { 2 };

    for (id, rows) in &tables {
        for _ in 0..*rows {
            match id {
                TableId::Module => {
                    bytes.extend_from_slice(&0u16.to_le_bytes()); // generation
                    bytes.extend_from_slice(&0u16.to_le_bytes()); // name
                    bytes.extend_from_slice(&0u16.to_le_bytes()); // mvid
                    bytes.extend_from_slice(&0u16.to_le_bytes()); // encid
                    bytes.extend_from_slice(&0u16.to_le_bytes()); // encbaseid
                }
                TableId::TypeDef => {
                    bytes.extend_from_slice(&0u32.to_le_bytes()); // flags
                    bytes.extend_from_slice(&0u16.to_le_bytes()); // name
                    bytes.extend_from_slice(&0u16.to_le_bytes()); // namespace
                    bytes.extend_from_slice(&0u16.to_le_bytes()); // extends (TypeDefOrRef, null)
                    if field_index_width == 4 {
                        bytes.extend_from_slice(&1u32.to_le_bytes());
                    } else {
                        bytes.extend_from_slice(&1u16.to_le_bytes());
                    }
                    if param_index_width == 4 {
                        bytes.extend_from_slice(&1u32.to_le_bytes());
                    } else {
                        bytes.extend_from_slice(&1u16.to_le_bytes());
                    }
                }
                TableId::Field => {
                    bytes.extend_from_slice(&0u16.to_le_bytes()); // flags
                    bytes.extend_from_slice(&0u16.to_le_bytes()); // name
                    bytes.extend_from_slice(&0u16.to_le_bytes()); // signature (blob)
                }
                TableId::MethodDef => {
                    bytes.extend_from_slice(&0u32.to_le_bytes()); // rva
                    bytes.extend_from_slice(&0u16.to_le_bytes()); // implflags
                    bytes.extend_from_slice(&0u16.to_le_bytes()); // flags
                    bytes.extend_from_slice(&0u16.to_le_bytes()); // name
                    bytes.extend_from_slice(&0u16.to_le_bytes()); // signature
                    if param_index_width == 4 {
                        bytes.extend_from_slice(&1u32.to_le_bytes());
                    } else {
                        bytes.extend_from_slice(&1u16.to_le_bytes());
                    }
                }
                TableId::Param => {
                    bytes.extend_from_slice(&0u16.to_le_bytes()); // flags
                    bytes.extend_from_slice(&0u16.to_le_bytes()); // sequence
                    bytes.extend_from_slice(&0u16.to_le_bytes()); // name
                }
                _ => unreachable!("no other tables are added by this fixture"),
            }
        }
    }
    bytes
}

fn metadata_root_bytes(tables_heap: &[u8]) -> Vec<u8> {
    let mut root = Vec::new();
    root.extend_from_slice(&0x424A_5342u32.to_le_bytes()); // 'BSJB'
    root.extend_from_slice(&1u16.to_le_bytes());
    root.extend_from_slice(&1u16.to_le_bytes());
    root.extend_from_slice(&0u32.to_le_bytes()); // reserved
    let version = b"v4.0.30319\0\0";
    root.extend_from_slice(&(version.len() as u32).to_le_bytes());
    root.extend_from_slice(version);
    root.extend_from_slice(&0u16.to_le_bytes()); // flags
    root.extend_from_slice(&1u16.to_le_bytes()); // stream count

    let stream_header_len = 4 + 4 + 4; // offset, size, "#~\0\0"
    let fixed_len = root.len() + stream_header_len;
    root.extend_from_slice(&(fixed_len as u32).to_le_bytes());
    root.extend_from_slice(&(tables_heap.len() as u32).to_le_bytes());
    root.extend_from_slice(b"#~\0\0");
    root.extend_from_slice(tables_heap);
    root
}

/// Assembles a minimal managed PE: one `.text` section holding the CLI header immediately
/// followed by the metadata root, with the optional header's CLR runtime header directory
/// pointing at it.
fn minimal_managed_pe(field_rows: u32, param_rows: u32) -> Vec<u8> {
    let tables_heap = tables_heap_bytes(field_rows, param_rows);
    let root = metadata_root_bytes(&tables_heap);

    let section_va = 0x2000u32;
    let clr_header_rva = section_va;
    let metadata_rva = clr_header_rva + 72;

    let mut clr_header = Vec::new();
    clr_header.extend_from_slice(&72u32.to_le_bytes()); // cb
    clr_header.extend_from_slice(&2u16.to_le_bytes()); // major_runtime_version
    clr_header.extend_from_slice(&5u16.to_le_bytes()); // minor_runtime_version
    push_dir(&mut clr_header, metadata_rva, root.len() as u32); // metadata
    clr_header.extend_from_slice(&1u32.to_le_bytes()); // flags: COMIMAGE_FLAGS_ILONLY
    clr_header.extend_from_slice(&0x0600_0001u32.to_le_bytes()); // entry_point_token
    push_dir(&mut clr_header, 0, 0); // resources
    push_dir(&mut clr_header, 0, 0); // strong_name_signature
    push_dir(&mut clr_header, 0, 0); // code_manager_table
    push_dir(&mut clr_header, 0, 0); // vtable_fixups
    push_dir(&mut clr_header, 0, 0); // export_address_table_jumps
    push_dir(&mut clr_header, 0, 0); // managed_native_header

    let mut section_data = clr_header;
    section_data.extend_from_slice(&root);
    let section_raw_size = 0x400u32;
    section_data.resize(section_raw_size as usize, 0);

    let mut dos = vec![0u8; 0x80];
    dos[0..2].copy_from_slice(b"MZ");
    dos[0x3C..0x40].copy_from_slice(&0x80u32.to_le_bytes());

    let mut pe = Vec::new();
    pe.extend_from_slice(&0x0000_4550u32.to_le_bytes());
    pe.extend_from_slice(&0x014Cu16.to_le_bytes());
    pe.extend_from_slice(&1u16.to_le_bytes()); // number_of_sections
    pe.extend_from_slice(&0u32.to_le_bytes());
    pe.extend_from_slice(&0u32.to_le_bytes());
    pe.extend_from_slice(&0u32.to_le_bytes());
    pe.extend_from_slice(&224u16.to_le_bytes());
    pe.extend_from_slice(&0x0102u16.to_le_bytes());

    pe.extend_from_slice(&0x10Bu16.to_le_bytes()); // magic: PE32
    pe.push(0);
    pe.push(0);
    pe.extend_from_slice(&0u32.to_le_bytes()); // size_of_code
    pe.extend_from_slice(&0u32.to_le_bytes()); // size_of_initialized_data
    pe.extend_from_slice(&0u32.to_le_bytes()); // size_of_uninitialized_data
    pe.extend_from_slice(&0x2000u32.to_le_bytes()); // address_of_entry_point
    pe.extend_from_slice(&0x2000u32.to_le_bytes()); // base_of_code
    pe.extend_from_slice(&0u32.to_le_bytes()); // base_of_data
    pe.extend_from_slice(&0x4000_0000u32.to_le_bytes()); // image_base
    pe.extend_from_slice(&0x1000u32.to_le_bytes()); // section_alignment
    pe.extend_from_slice(&0x200u32.to_le_bytes()); // file_alignment
    pe.extend_from_slice(&[0u8; 8]); // os version
    pe.extend_from_slice(&[0u8; 4]); // image version
    pe.extend_from_slice(&0u32.to_le_bytes()); // subsystem version
    pe.extend_from_slice(&0x3000u32.to_le_bytes()); // size_of_image
    let size_of_headers = 0x200u32;
    pe.extend_from_slice(&size_of_headers.to_le_bytes());
    pe.extend_from_slice(&0u32.to_le_bytes()); // checksum
    pe.extend_from_slice(&3u16.to_le_bytes()); // subsystem: console
    pe.extend_from_slice(&0u16.to_le_bytes()); // dll characteristics
    pe.extend_from_slice(&[0u8; 16]); // stack/heap reserve/commit
    pe.extend_from_slice(&0u32.to_le_bytes()); // loader flags
    pe.extend_from_slice(&16u32.to_le_bytes()); // number_of_rva_and_sizes

    for idx in 0..16u32 {
        if idx == 14 {
            push_dir(&mut pe, clr_header_rva, 72);
        } else {
            push_dir(&mut pe, 0, 0);
        }
    }

    let mut name = [0u8; 8];
    name[..5].copy_from_slice(b".text");
    pe.extend_from_slice(&name);
    pe.extend_from_slice(&(section_data.len() as u32).to_le_bytes()); // virtual_size
    pe.extend_from_slice(&section_va.to_le_bytes());
    pe.extend_from_slice(&(section_data.len() as u32).to_le_bytes()); // size_of_raw_data
    pe.extend_from_slice(&0x200u32.to_le_bytes()); // pointer_to_raw_data
    pe.extend_from_slice(&[0u8; 8]);
    pe.extend_from_slice(&[0u8; 4]);
    pe.extend_from_slice(&0x6000_0020u32.to_le_bytes()); // characteristics

    let mut file = dos;
    file.extend_from_slice(&pe);
    file.resize(0x200, 0);
    file.extend_from_slice(&section_data);
    file
}

#[test]
fn parses_hello_world_managed_executable() {
    let bytes = minimal_managed_pe(0, 0);
    let pe = PEFile::parse(&bytes).unwrap();
    assert_eq!(pe.sections.len(), 1);
    assert!(pe.is_managed());

    let metadata = Metadata::parse(&pe, &bytes).unwrap();
    assert_eq!(metadata.tables.row_count(TableId::Module), 1);
    assert_eq!(metadata.tables.row_count(TableId::TypeDef), 1);
    assert_eq!(metadata.tables.row_count(TableId::MethodDef), 1);
    assert!(metadata.net_directory.is_il_only());

    let entry_token = metadata.net_directory.entry_point_token().unwrap();
    assert_eq!(entry_token, 0x0600_0001);

    let resolver = metadata.resolver();
    let resolved = resolver
        .resolve(imagecore::metadata::MetadataToken::from_u32(entry_token))
        .unwrap()
        .unwrap();
    assert_eq!(resolved.len(), 6);
}

#[test]
fn widens_field_list_index_when_field_table_crosses_sixteen_bits() {
    let bytes = minimal_managed_pe((1 << 16) + 1, 0);
    let pe = PEFile::parse(&bytes).unwrap();
    let metadata = Metadata::parse(&pe, &bytes).unwrap();
    assert_eq!(metadata.tables.row_count(TableId::TypeDef), 1);
    assert_eq!(metadata.tables.row_count(TableId::Field), (1 << 16) + 1);
}
