//! Whole-binary PE parse/rebuild scenarios.

use imagecore::pe::PEFile;

fn push_dir(buf: &mut Vec<u8>, rva: u32, size: u32) {
    buf.extend_from_slice(&rva.to_le_bytes());
    buf.extend_from_slice(&size.to_le_bytes());
}

/// Builds a minimal, valid-shaped 32-bit PE with `section_count` `.text`-style sections, each
/// `section_size` bytes, no data directories set.
fn minimal_multi_section_pe(section_count: u16, section_size: u32) -> Vec<u8> {
    let mut dos = vec![0u8; 0x80];
    dos[0..2].copy_from_slice(b"MZ");
    dos[0x3C..0x40].copy_from_slice(&0x80u32.to_le_bytes());

    let mut pe = Vec::new();
    pe.extend_from_slice(&0x0000_4550u32.to_le_bytes());
    pe.extend_from_slice(&0x014Cu16.to_le_bytes());
    pe.extend_from_slice(&section_count.to_le_bytes());
    pe.extend_from_slice(&0u32.to_le_bytes());
    pe.extend_from_slice(&0u32.to_le_bytes());
    pe.extend_from_slice(&0u32.to_le_bytes());
    pe.extend_from_slice(&224u16.to_le_bytes());
    pe.extend_from_slice(&0x0102u16.to_le_bytes());

    pe.extend_from_slice(&0x10Bu16.to_le_bytes());
    pe.push(0);
    pe.push(0);
    pe.extend_from_slice(&0u32.to_le_bytes());
    pe.extend_from_slice(&0u32.to_le_bytes());
    pe.extend_from_slice(&0u32.to_le_bytes());
    pe.extend_from_slice(&0x1000u32.to_le_bytes());
    pe.extend_from_slice(&0x1000u32.to_le_bytes());
    pe.extend_from_slice(&0u32.to_le_bytes());
    pe.extend_from_slice(&0x4000_0000u32.to_le_bytes());
    pe.extend_from_slice(&0x1000u32.to_le_bytes());
    pe.extend_from_slice(&0x200u32.to_le_bytes());
    pe.extend_from_slice(&[0u8; 8]);
    pe.extend_from_slice(&[0u8; 4]);
    pe.extend_from_slice(&0u32.to_le_bytes());
    pe.extend_from_slice(&0x1000u32.to_le_bytes());
    let size_of_headers = 0x200u32;
    pe.extend_from_slice(&size_of_headers.to_le_bytes());
    pe.extend_from_slice(&0u32.to_le_bytes());
    pe.extend_from_slice(&3u16.to_le_bytes());
    pe.extend_from_slice(&0u16.to_le_bytes());
    pe.extend_from_slice(&[0u8; 16]);
    pe.extend_from_slice(&0u32.to_le_bytes());
    pe.extend_from_slice(&16u32.to_le_bytes());
    for _ in 0..16 {
        push_dir(&mut pe, 0, 0);
    }

    let mut pointer = 0x200u32;
    let mut va = 0x1000u32;
    for i in 0..section_count {
        let mut name = [0u8; 8];
        let label = format!(".s{i}");
        name[..label.len()].copy_from_slice(label.as_bytes());
        pe.extend_from_slice(&name);
        pe.extend_from_slice(&section_size.to_le_bytes());
        pe.extend_from_slice(&va.to_le_bytes());
        pe.extend_from_slice(&section_size.to_le_bytes());
        pe.extend_from_slice(&pointer.to_le_bytes());
        pe.extend_from_slice(&[0u8; 8]);
        pe.extend_from_slice(&[0u8; 4]);
        pe.extend_from_slice(&0x6000_0020u32.to_le_bytes());
        pointer += section_size;
        va += 0x1000;
    }

    let mut file = dos;
    file.extend_from_slice(&pe);
    file.resize(0x200, 0);
    for i in 0..section_count {
        file.extend_from_slice(&vec![0xCC_u8.wrapping_add(i as u8); section_size as usize]);
    }
    file
}

#[test]
fn parses_multiple_sections_in_rva_order() {
    let bytes = minimal_multi_section_pe(3, 0x200);
    let pe = PEFile::parse(&bytes).unwrap();
    assert_eq!(pe.sections.len(), 3);
    assert_eq!(pe.sections[0].header.name().unwrap(), ".s0");
    assert_eq!(pe.sections[2].header.name().unwrap(), ".s2");
    assert!(!pe.is_managed());
}

#[test]
fn structural_round_trip_preserves_section_count_and_names() {
    let bytes = minimal_multi_section_pe(2, 0x400);
    let pe = PEFile::parse(&bytes).unwrap();
    let rebuilt = pe.rebuild().unwrap();
    let reparsed = PEFile::parse(&rebuilt).unwrap();
    assert_eq!(reparsed.sections.len(), pe.sections.len());
    for (a, b) in pe.sections.iter().zip(reparsed.sections.iter()) {
        assert_eq!(a.header.name().unwrap(), b.header.name().unwrap());
        assert_eq!(a.header.virtual_size, b.header.virtual_size);
    }
}
