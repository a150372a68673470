//! The closed ECMA-335 §II.22 table schema: the 45 table identifiers, their column layouts, and
//! the coded-index tag/target-table definitions column widths are derived from.

/// One of the 45 ECMA-335 metadata table identifiers. Unlisted ids (the gaps between these
/// values) are reserved and never valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum TableId {
    Module = 0x00,
    TypeRef = 0x01,
    TypeDef = 0x02,
    Field = 0x04,
    MethodDef = 0x06,
    Param = 0x08,
    InterfaceImpl = 0x09,
    MemberRef = 0x0A,
    Constant = 0x0B,
    CustomAttribute = 0x0C,
    FieldMarshal = 0x0D,
    DeclSecurity = 0x0E,
    ClassLayout = 0x0F,
    FieldLayout = 0x10,
    StandAloneSig = 0x11,
    EventMap = 0x12,
    Event = 0x14,
    PropertyMap = 0x15,
    Property = 0x17,
    MethodSemantics = 0x18,
    MethodImpl = 0x19,
    ModuleRef = 0x1A,
    TypeSpec = 0x1B,
    ImplMap = 0x1C,
    FieldRVA = 0x1D,
    Assembly = 0x20,
    AssemblyProcessor = 0x21,
    AssemblyOS = 0x22,
    AssemblyRef = 0x23,
    AssemblyRefProcessor = 0x24,
    AssemblyRefOS = 0x25,
    File = 0x26,
    ExportedType = 0x27,
    ManifestResource = 0x28,
    NestedClass = 0x29,
    GenericParam = 0x2A,
    MethodSpec = 0x2B,
    GenericParamConstraint = 0x2C,
}

/// The highest table id this schema knows about; `valid_mask` bits beyond this are never set by
/// a well-formed assembly but are tolerated (just ignored) rather than rejected.
pub const MAX_TABLE_ID: u8 = 0x2C;

impl TableId {
    pub const ALL: [TableId; 38] = [
        TableId::Module,
        TableId::TypeRef,
        TableId::TypeDef,
        TableId::Field,
        TableId::MethodDef,
        TableId::Param,
        TableId::InterfaceImpl,
        TableId::MemberRef,
        TableId::Constant,
        TableId::CustomAttribute,
        TableId::FieldMarshal,
        TableId::DeclSecurity,
        TableId::ClassLayout,
        TableId::FieldLayout,
        TableId::StandAloneSig,
        TableId::EventMap,
        TableId::Event,
        TableId::PropertyMap,
        TableId::Property,
        TableId::MethodSemantics,
        TableId::MethodImpl,
        TableId::ModuleRef,
        TableId::TypeSpec,
        TableId::ImplMap,
        TableId::FieldRVA,
        TableId::Assembly,
        TableId::AssemblyProcessor,
        TableId::AssemblyOS,
        TableId::AssemblyRef,
        TableId::AssemblyRefProcessor,
        TableId::AssemblyRefOS,
        TableId::File,
        TableId::ExportedType,
        TableId::ManifestResource,
        TableId::NestedClass,
        TableId::GenericParam,
        TableId::MethodSpec,
        TableId::GenericParamConstraint,
    ];

    pub fn from_u8(id: u8) -> Option<TableId> {
        Self::ALL.into_iter().find(|t| *t as u8 == id)
    }

    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

/// One of the 14 ECMA-335 §II.24.2.6 coded-index kinds used by table columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodedIndexKind {
    TypeDefOrRef,
    HasConstant,
    HasCustomAttribute,
    HasFieldMarshal,
    HasDeclSecurity,
    MemberRefParent,
    HasSemantics,
    MethodDefOrRef,
    MemberForwarded,
    Implementation,
    CustomAttributeType,
    ResolutionScope,
    TypeOrMethodDef,
}

use TableId::*;

impl CodedIndexKind {
    /// The number of low bits reserved for the table-selector tag.
    pub fn tag_bits(self) -> u32 {
        match self {
            CodedIndexKind::TypeDefOrRef
            | CodedIndexKind::HasConstant
            | CodedIndexKind::HasDeclSecurity
            | CodedIndexKind::Implementation
            | CodedIndexKind::ResolutionScope => 2,
            CodedIndexKind::HasCustomAttribute => 5,
            CodedIndexKind::HasFieldMarshal
            | CodedIndexKind::HasSemantics
            | CodedIndexKind::MethodDefOrRef
            | CodedIndexKind::MemberForwarded
            | CodedIndexKind::TypeOrMethodDef => 1,
            CodedIndexKind::MemberRefParent | CodedIndexKind::CustomAttributeType => 3,
        }
    }

    /// The target table for each possible tag value, in tag order. `None` marks a tag value
    /// ECMA-335 reserves but never assigns (e.g. `CustomAttributeType` tags 0, 1, 4).
    pub fn tables(self) -> &'static [Option<TableId>] {
        match self {
            CodedIndexKind::TypeDefOrRef => &[Some(TypeDef), Some(TypeRef), Some(TypeSpec)],
            CodedIndexKind::HasConstant => &[Some(Field), Some(Param), Some(Property)],
            CodedIndexKind::HasCustomAttribute => &[
                Some(MethodDef),
                Some(Field),
                Some(TypeRef),
                Some(TypeDef),
                Some(Param),
                Some(InterfaceImpl),
                Some(MemberRef),
                Some(Module),
                Some(DeclSecurity),
                Some(Property),
                Some(Event),
                Some(StandAloneSig),
                Some(ModuleRef),
                Some(TypeSpec),
                Some(Assembly),
                Some(AssemblyRef),
                Some(File),
                Some(ExportedType),
                Some(ManifestResource),
                Some(GenericParam),
                Some(GenericParamConstraint),
                Some(MethodSpec),
            ],
            CodedIndexKind::HasFieldMarshal => &[Some(Field), Some(Param)],
            CodedIndexKind::HasDeclSecurity => &[Some(TypeDef), Some(MethodDef), Some(Assembly)],
            CodedIndexKind::MemberRefParent => &[
                Some(TypeDef),
                Some(TypeRef),
                Some(ModuleRef),
                Some(MethodDef),
                Some(TypeSpec),
            ],
            CodedIndexKind::HasSemantics => &[Some(Event), Some(Property)],
            CodedIndexKind::MethodDefOrRef => &[Some(MethodDef), Some(MemberRef)],
            CodedIndexKind::MemberForwarded => &[Some(Field), Some(MethodDef)],
            CodedIndexKind::Implementation => {
                &[Some(File), Some(AssemblyRef), Some(ExportedType)]
            }
            CodedIndexKind::CustomAttributeType => {
                &[None, None, Some(MethodDef), Some(MemberRef), None]
            }
            CodedIndexKind::ResolutionScope => {
                &[Some(Module), Some(ModuleRef), Some(AssemblyRef), Some(TypeRef)]
            }
            CodedIndexKind::TypeOrMethodDef => &[Some(TypeDef), Some(MethodDef)],
        }
    }
}

/// One column's storage kind within a [`TableId`]'s row layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Fixed1,
    Fixed2,
    Fixed4,
    StringIndex,
    GuidIndex,
    BlobIndex,
    SimpleIndex(TableId),
    CodedIndex(CodedIndexKind),
}

/// The column layout for `table`, in on-disk order. This is the closed schema ECMA-335 §II.22
/// defines; there is no extensibility point here by design.
pub fn columns(table: TableId) -> &'static [ColumnKind] {
    use ColumnKind::*;
    match table {
        Module => &[Fixed2, StringIndex, GuidIndex, GuidIndex, GuidIndex],
        TypeRef => &[
            CodedIndex(CodedIndexKind::ResolutionScope),
            StringIndex,
            StringIndex,
        ],
        TypeDef => &[
            Fixed4,
            StringIndex,
            StringIndex,
            CodedIndex(CodedIndexKind::TypeDefOrRef),
            SimpleIndex(Field),
            SimpleIndex(MethodDef),
        ],
        Field => &[Fixed2, StringIndex, BlobIndex],
        MethodDef => &[
            Fixed4,
            Fixed2,
            Fixed2,
            StringIndex,
            BlobIndex,
            SimpleIndex(Param),
        ],
        Param => &[Fixed2, Fixed2, StringIndex],
        InterfaceImpl => &[
            SimpleIndex(TypeDef),
            CodedIndex(CodedIndexKind::TypeDefOrRef),
        ],
        MemberRef => &[
            CodedIndex(CodedIndexKind::MemberRefParent),
            StringIndex,
            BlobIndex,
        ],
        Constant => &[
            Fixed2,
            CodedIndex(CodedIndexKind::HasConstant),
            BlobIndex,
        ],
        CustomAttribute => &[
            CodedIndex(CodedIndexKind::HasCustomAttribute),
            CodedIndex(CodedIndexKind::CustomAttributeType),
            BlobIndex,
        ],
        FieldMarshal => &[CodedIndex(CodedIndexKind::HasFieldMarshal), BlobIndex],
        DeclSecurity => &[
            Fixed2,
            CodedIndex(CodedIndexKind::HasDeclSecurity),
            BlobIndex,
        ],
        ClassLayout => &[Fixed2, Fixed4, SimpleIndex(TypeDef)],
        FieldLayout => &[Fixed4, SimpleIndex(Field)],
        StandAloneSig => &[BlobIndex],
        EventMap => &[SimpleIndex(TypeDef), SimpleIndex(Event)],
        Event => &[
            Fixed2,
            StringIndex,
            CodedIndex(CodedIndexKind::TypeDefOrRef),
        ],
        PropertyMap => &[SimpleIndex(TypeDef), SimpleIndex(Property)],
        Property => &[Fixed2, StringIndex, BlobIndex],
        MethodSemantics => &[
            Fixed2,
            SimpleIndex(MethodDef),
            CodedIndex(CodedIndexKind::HasSemantics),
        ],
        MethodImpl => &[
            SimpleIndex(TypeDef),
            CodedIndex(CodedIndexKind::MethodDefOrRef),
            CodedIndex(CodedIndexKind::MethodDefOrRef),
        ],
        ModuleRef => &[StringIndex],
        TypeSpec => &[BlobIndex],
        ImplMap => &[
            Fixed2,
            CodedIndex(CodedIndexKind::MemberForwarded),
            StringIndex,
            SimpleIndex(ModuleRef),
        ],
        FieldRVA => &[Fixed4, SimpleIndex(Field)],
        Assembly => &[
            Fixed4,
            Fixed2,
            Fixed2,
            Fixed2,
            Fixed2,
            Fixed4,
            BlobIndex,
            StringIndex,
            StringIndex,
        ],
        AssemblyProcessor => &[Fixed4],
        AssemblyOS => &[Fixed4, Fixed4, Fixed4],
        AssemblyRef => &[
            Fixed2,
            Fixed2,
            Fixed2,
            Fixed2,
            Fixed4,
            BlobIndex,
            StringIndex,
            StringIndex,
            BlobIndex,
        ],
        AssemblyRefProcessor => &[Fixed4, SimpleIndex(AssemblyRef)],
        AssemblyRefOS => &[Fixed4, Fixed4, Fixed4, SimpleIndex(AssemblyRef)],
        File => &[Fixed4, StringIndex, BlobIndex],
        ExportedType => &[
            Fixed4,
            Fixed4,
            StringIndex,
            StringIndex,
            CodedIndex(CodedIndexKind::Implementation),
        ],
        ManifestResource => &[
            Fixed4,
            Fixed4,
            StringIndex,
            CodedIndex(CodedIndexKind::Implementation),
        ],
        NestedClass => &[SimpleIndex(TypeDef), SimpleIndex(TypeDef)],
        GenericParam => &[
            Fixed2,
            Fixed2,
            CodedIndex(CodedIndexKind::TypeOrMethodDef),
            StringIndex,
        ],
        MethodSpec => &[
            CodedIndex(CodedIndexKind::MethodDefOrRef),
            BlobIndex,
        ],
        GenericParamConstraint => &[
            SimpleIndex(GenericParam),
            CodedIndex(CodedIndexKind::TypeDefOrRef),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_id_round_trips() {
        for id in TableId::ALL {
            assert_eq!(TableId::from_u8(id.to_u8()), Some(id));
        }
    }

    #[test]
    fn reserved_ids_are_not_valid() {
        assert_eq!(TableId::from_u8(0x03), None);
        assert_eq!(TableId::from_u8(0x1F), None);
    }

    #[test]
    fn type_def_or_ref_has_three_targets() {
        assert_eq!(CodedIndexKind::TypeDefOrRef.tables().len(), 3);
        assert_eq!(CodedIndexKind::TypeDefOrRef.tag_bits(), 2);
    }

    #[test]
    fn type_def_has_six_columns() {
        assert_eq!(columns(TableId::TypeDef).len(), 6);
    }
}
