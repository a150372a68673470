//! ECMA-335 §II.23 signature decoding: fields, method def/ref, properties, local variables,
//! type specs, generic method instantiations, and custom modifier lists.
//!
//! Every decoder here is a recursive-descent parser over a [`BinaryReader`] already forked to
//! exactly the blob's bytes (via [`BlobHeap::get`](crate::metadata::streams::BlobHeap::get)); the
//! invariant each one upholds is that it consumes exactly those bytes, no more and no less.

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::io::BinaryReader;
use crate::metadata::tables::coded_index::CodedIndex;
use crate::metadata::tables::schema::CodedIndexKind;

const ELEMENT_TYPE_VOID: u8 = 0x01;
const ELEMENT_TYPE_BOOLEAN: u8 = 0x02;
const ELEMENT_TYPE_CHAR: u8 = 0x03;
const ELEMENT_TYPE_I1: u8 = 0x04;
const ELEMENT_TYPE_U1: u8 = 0x05;
const ELEMENT_TYPE_I2: u8 = 0x06;
const ELEMENT_TYPE_U2: u8 = 0x07;
const ELEMENT_TYPE_I4: u8 = 0x08;
const ELEMENT_TYPE_U4: u8 = 0x09;
const ELEMENT_TYPE_I8: u8 = 0x0A;
const ELEMENT_TYPE_U8: u8 = 0x0B;
const ELEMENT_TYPE_R4: u8 = 0x0C;
const ELEMENT_TYPE_R8: u8 = 0x0D;
const ELEMENT_TYPE_STRING: u8 = 0x0E;
const ELEMENT_TYPE_PTR: u8 = 0x0F;
const ELEMENT_TYPE_BYREF: u8 = 0x10;
const ELEMENT_TYPE_VALUETYPE: u8 = 0x11;
const ELEMENT_TYPE_CLASS: u8 = 0x12;
const ELEMENT_TYPE_VAR: u8 = 0x13;
const ELEMENT_TYPE_ARRAY: u8 = 0x14;
const ELEMENT_TYPE_GENERICINST: u8 = 0x15;
const ELEMENT_TYPE_TYPEDBYREF: u8 = 0x16;
const ELEMENT_TYPE_I: u8 = 0x18;
const ELEMENT_TYPE_U: u8 = 0x19;
const ELEMENT_TYPE_FNPTR: u8 = 0x1B;
const ELEMENT_TYPE_OBJECT: u8 = 0x1C;
const ELEMENT_TYPE_SZARRAY: u8 = 0x1D;
const ELEMENT_TYPE_MVAR: u8 = 0x1E;
const ELEMENT_TYPE_CMOD_REQD: u8 = 0x1F;
const ELEMENT_TYPE_CMOD_OPT: u8 = 0x20;
const ELEMENT_TYPE_PINNED: u8 = 0x45;

const SIG_FIELD: u8 = 0x06;
const SIG_LOCAL_SIG: u8 = 0x07;
const SIG_PROPERTY: u8 = 0x08;
const SIG_GENERICINST: u8 = 0x0A;

const CALLCONV_MASK: u8 = 0x0F;
const CALLCONV_GENERIC: u8 = 0x10;
const CALLCONV_HASTHIS: u8 = 0x20;
const CALLCONV_EXPLICITTHIS: u8 = 0x40;

/// The calling-convention low nibble of a method signature's leading byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallingConvention {
    Default,
    C,
    StdCall,
    ThisCall,
    FastCall,
    Vararg,
}

impl CallingConvention {
    fn from_nibble(nibble: u8) -> Result<Self> {
        match nibble {
            0x0 => Ok(CallingConvention::Default),
            0x1 => Ok(CallingConvention::C),
            0x2 => Ok(CallingConvention::StdCall),
            0x3 => Ok(CallingConvention::ThisCall),
            0x4 => Ok(CallingConvention::FastCall),
            0x5 => Ok(CallingConvention::Vararg),
            _ => Err(Error::malformed_metadata(
                "signature has an unrecognized calling convention",
            )),
        }
    }
}

/// A `CMOD_REQD`/`CMOD_OPT` custom modifier: a required or optional type attached to a
/// parameter, field, or return type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomMod {
    pub required: bool,
    pub type_ref: CodedIndex,
}

/// A decoded element type, recursively describing a CLI type as it appears in a signature blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementType {
    Void,
    Boolean,
    Char,
    I1,
    U1,
    I2,
    U2,
    I4,
    U4,
    I8,
    U8,
    R4,
    R8,
    String,
    Object,
    TypedByRef,
    IntPtr,
    UIntPtr,
    Class(CodedIndex),
    ValueType(CodedIndex),
    SzArray(Box<ElementType>),
    Ptr(Box<ElementType>),
    ByRef(Box<ElementType>),
    Array {
        element: Box<ElementType>,
        rank: u32,
        sizes: Vec<u32>,
        lower_bounds: Vec<i32>,
    },
    GenericInst {
        is_class: bool,
        generic_type: CodedIndex,
        args: Vec<ElementType>,
    },
    Var(u32),
    MVar(u32),
    FnPtr(Box<MethodSignature>),
}

fn read_type_def_or_ref(reader: &mut BinaryReader) -> Result<CodedIndex> {
    let raw = reader.read_compressed_u32()?;
    CodedIndex::decode(CodedIndexKind::TypeDefOrRef, raw)?
        .ok_or_else(|| Error::malformed_metadata("signature type token must not be null"))
}

/// Reads zero or more leading `CMOD_REQD`/`CMOD_OPT` bytes, stopping at the first byte that is
/// neither.
fn read_custom_mods(reader: &mut BinaryReader) -> Result<Vec<CustomMod>> {
    let mut mods = Vec::new();
    loop {
        let mark = reader.position();
        let tag = reader.read_u8()?;
        match tag {
            ELEMENT_TYPE_CMOD_REQD | ELEMENT_TYPE_CMOD_OPT => {
                let type_ref = read_type_def_or_ref(reader)?;
                mods.push(CustomMod {
                    required: tag == ELEMENT_TYPE_CMOD_REQD,
                    type_ref,
                });
            }
            _ => {
                reader.seek(mark)?;
                break;
            }
        }
    }
    Ok(mods)
}

/// Decodes one `Type` production (ECMA-335 §II.23.2.12), recursing through pointer/array/generic
/// wrappers down to a terminal.
pub fn read_element_type(reader: &mut BinaryReader) -> Result<ElementType> {
    let tag = reader.read_u8()?;
    match tag {
        ELEMENT_TYPE_VOID => Ok(ElementType::Void),
        ELEMENT_TYPE_BOOLEAN => Ok(ElementType::Boolean),
        ELEMENT_TYPE_CHAR => Ok(ElementType::Char),
        ELEMENT_TYPE_I1 => Ok(ElementType::I1),
        ELEMENT_TYPE_U1 => Ok(ElementType::U1),
        ELEMENT_TYPE_I2 => Ok(ElementType::I2),
        ELEMENT_TYPE_U2 => Ok(ElementType::U2),
        ELEMENT_TYPE_I4 => Ok(ElementType::I4),
        ELEMENT_TYPE_U4 => Ok(ElementType::U4),
        ELEMENT_TYPE_I8 => Ok(ElementType::I8),
        ELEMENT_TYPE_U8 => Ok(ElementType::U8),
        ELEMENT_TYPE_R4 => Ok(ElementType::R4),
        ELEMENT_TYPE_R8 => Ok(ElementType::R8),
        ELEMENT_TYPE_STRING => Ok(ElementType::String),
        ELEMENT_TYPE_OBJECT => Ok(ElementType::Object),
        ELEMENT_TYPE_TYPEDBYREF => Ok(ElementType::TypedByRef),
        ELEMENT_TYPE_I => Ok(ElementType::IntPtr),
        ELEMENT_TYPE_U => Ok(ElementType::UIntPtr),
        ELEMENT_TYPE_CLASS => Ok(ElementType::Class(read_type_def_or_ref(reader)?)),
        ELEMENT_TYPE_VALUETYPE => Ok(ElementType::ValueType(read_type_def_or_ref(reader)?)),
        ELEMENT_TYPE_SZARRAY => {
            let custom_mods = read_custom_mods(reader)?;
            let _ = custom_mods; // custom mods on array elements are not surfaced (no callers yet need them)
            Ok(ElementType::SzArray(Box::new(read_element_type(reader)?)))
        }
        ELEMENT_TYPE_PTR => {
            let custom_mods = read_custom_mods(reader)?;
            let _ = custom_mods;
            Ok(ElementType::Ptr(Box::new(read_element_type(reader)?)))
        }
        ELEMENT_TYPE_BYREF => Ok(ElementType::ByRef(Box::new(read_element_type(reader)?))),
        ELEMENT_TYPE_ARRAY => {
            let element = Box::new(read_element_type(reader)?);
            let rank = reader.read_compressed_u32()?;
            let num_sizes = reader.read_compressed_u32()?;
            let mut sizes = Vec::with_capacity(num_sizes as usize);
            for _ in 0..num_sizes {
                sizes.push(reader.read_compressed_u32()?);
            }
            let num_lower_bounds = reader.read_compressed_u32()?;
            let mut lower_bounds = Vec::with_capacity(num_lower_bounds as usize);
            for _ in 0..num_lower_bounds {
                lower_bounds.push(decode_signed_compressed(reader.read_compressed_u32()?));
            }
            Ok(ElementType::Array {
                element,
                rank,
                sizes,
                lower_bounds,
            })
        }
        ELEMENT_TYPE_GENERICINST => {
            let inner_tag = reader.read_u8()?;
            let is_class = match inner_tag {
                ELEMENT_TYPE_CLASS => true,
                ELEMENT_TYPE_VALUETYPE => false,
                _ => {
                    return Err(Error::malformed_metadata(
                        "GENERICINST must be followed by CLASS or VALUETYPE",
                    ))
                }
            };
            let generic_type = read_type_def_or_ref(reader)?;
            let arg_count = reader.read_compressed_u32()?;
            let mut args = Vec::with_capacity(arg_count as usize);
            for _ in 0..arg_count {
                args.push(read_element_type(reader)?);
            }
            Ok(ElementType::GenericInst {
                is_class,
                generic_type,
                args,
            })
        }
        ELEMENT_TYPE_VAR => Ok(ElementType::Var(reader.read_compressed_u32()?)),
        ELEMENT_TYPE_MVAR => Ok(ElementType::MVar(reader.read_compressed_u32()?)),
        ELEMENT_TYPE_FNPTR => Ok(ElementType::FnPtr(Box::new(read_method_signature(reader)?))),
        other => Err(Error::malformed_metadata(alloc::format!(
            "unrecognized element type byte {other:#x}"
        ))),
    }
}

/// ECMA-335 §II.23.2 compressed signed integers store the sign in bit 0 of the already-decoded
/// unsigned value, with the sign-extension mask depending on which of the three compressed
/// widths (1/2/4 byte) produced it — distinguishable after the fact from the low two bits of the
/// shifted-left encoding. Used only for array lower bounds, which are rarely non-zero in
/// practice but still need to round-trip correctly when they are.
fn decode_signed_compressed(raw: u32) -> i32 {
    if raw & 0x1 == 0 {
        return (raw >> 1) as i32;
    }
    (match raw & 0x3 {
        0x1 => 0xffff_ffc0u32 | (raw >> 2),
        0x3 => 0xffff_e000u32 | (raw >> 2),
        _ => 0xf000_0000u32 | (raw >> 1),
    }) as i32
}

/// A single parameter or return type: optional custom modifiers, an optional `BYREF` marker
/// applied at the top level (distinct from an `ElementType::ByRef` nested further in), and the
/// underlying type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSig {
    pub custom_mods: Vec<CustomMod>,
    pub by_ref: bool,
    pub ty: ElementType,
}

fn read_param(reader: &mut BinaryReader) -> Result<ParamSig> {
    let custom_mods = read_custom_mods(reader)?;
    let mark = reader.position();
    let by_ref = if reader.read_u8()? == ELEMENT_TYPE_BYREF {
        true
    } else {
        reader.seek(mark)?;
        false
    };
    let ty = read_element_type(reader)?;
    Ok(ParamSig {
        custom_mods,
        by_ref,
        ty,
    })
}

/// A field signature (ECMA-335 §II.23.2.4): `FIELD` tag, custom mods, then the field's type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSignature {
    pub custom_mods: Vec<CustomMod>,
    pub ty: ElementType,
}

pub fn read_field_signature(reader: &mut BinaryReader) -> Result<FieldSignature> {
    let tag = reader.read_u8()?;
    if tag != SIG_FIELD {
        return Err(Error::malformed_metadata("expected a FIELD signature tag"));
    }
    let custom_mods = read_custom_mods(reader)?;
    let ty = read_element_type(reader)?;
    Ok(FieldSignature { custom_mods, ty })
}

/// A method definition or reference signature (ECMA-335 §II.23.2.1/2.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    pub has_this: bool,
    pub explicit_this: bool,
    pub calling_convention: CallingConvention,
    pub generic_param_count: u32,
    pub ret: ParamSig,
    pub params: Vec<ParamSig>,
}

pub fn read_method_signature(reader: &mut BinaryReader) -> Result<MethodSignature> {
    let flags = reader.read_u8()?;
    let has_this = flags & CALLCONV_HASTHIS != 0;
    let explicit_this = flags & CALLCONV_EXPLICITTHIS != 0;
    let is_generic = flags & CALLCONV_GENERIC != 0;
    let calling_convention = CallingConvention::from_nibble(flags & CALLCONV_MASK)?;
    let generic_param_count = if is_generic {
        reader.read_compressed_u32()?
    } else {
        0
    };
    let param_count = reader.read_compressed_u32()?;
    let ret = read_param(reader)?;
    let mut params = Vec::with_capacity(param_count as usize);
    for _ in 0..param_count {
        params.push(read_param(reader)?);
    }
    Ok(MethodSignature {
        has_this,
        explicit_this,
        calling_convention,
        generic_param_count,
        ret,
        params,
    })
}

/// A property signature (ECMA-335 §II.23.2.5): `PROPERTY` tag (optionally `| HASTHIS`), custom
/// mods, param count, type, then that many parameter types (indexers).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertySignature {
    pub has_this: bool,
    pub ty: ElementType,
    pub params: Vec<ParamSig>,
}

pub fn read_property_signature(reader: &mut BinaryReader) -> Result<PropertySignature> {
    let tag = reader.read_u8()?;
    if tag & !CALLCONV_HASTHIS != SIG_PROPERTY {
        return Err(Error::malformed_metadata(
            "expected a PROPERTY signature tag",
        ));
    }
    let has_this = tag & CALLCONV_HASTHIS != 0;
    let param_count = reader.read_compressed_u32()?;
    let custom_mods = read_custom_mods(reader)?;
    let _ = custom_mods;
    let ty = read_element_type(reader)?;
    let mut params = Vec::with_capacity(param_count as usize);
    for _ in 0..param_count {
        params.push(read_param(reader)?);
    }
    Ok(PropertySignature {
        has_this,
        ty,
        params,
    })
}

/// One local variable slot: custom mods, `PINNED` marker, `BYREF` marker, and the type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVar {
    pub custom_mods: Vec<CustomMod>,
    pub pinned: bool,
    pub by_ref: bool,
    pub ty: ElementType,
}

/// A local variable signature (ECMA-335 §II.23.2.6): `LOCAL_SIG` tag, count, then that many
/// locals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVarSignature {
    pub locals: Vec<LocalVar>,
}

pub fn read_local_var_signature(reader: &mut BinaryReader) -> Result<LocalVarSignature> {
    let tag = reader.read_u8()?;
    if tag != SIG_LOCAL_SIG {
        return Err(Error::malformed_metadata(
            "expected a LOCAL_SIG signature tag",
        ));
    }
    let count = reader.read_compressed_u32()?;
    let mut locals = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let custom_mods = read_custom_mods(reader)?;
        let mark = reader.position();
        let pinned = if reader.read_u8()? == ELEMENT_TYPE_PINNED {
            true
        } else {
            reader.seek(mark)?;
            false
        };
        let mark = reader.position();
        let by_ref = if reader.read_u8()? == ELEMENT_TYPE_BYREF {
            true
        } else {
            reader.seek(mark)?;
            false
        };
        let ty = read_element_type(reader)?;
        locals.push(LocalVar {
            custom_mods,
            pinned,
            by_ref,
            ty,
        });
    }
    Ok(LocalVarSignature { locals })
}

/// A `TypeSpec` signature: just one `Type` production, no leading tag byte.
pub fn read_type_spec_signature(reader: &mut BinaryReader) -> Result<ElementType> {
    read_element_type(reader)
}

/// A `MethodSpec` signature (ECMA-335 §II.23.2.15): `GENERICINST` tag, arg count, then that many
/// generic argument types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSpecSignature {
    pub generic_args: Vec<ElementType>,
}

pub fn read_method_spec_signature(reader: &mut BinaryReader) -> Result<MethodSpecSignature> {
    let tag = reader.read_u8()?;
    if tag != SIG_GENERICINST {
        return Err(Error::malformed_metadata(
            "expected a GENERICINST (MethodSpec) signature tag",
        ));
    }
    let count = reader.read_compressed_u32()?;
    let mut generic_args = Vec::with_capacity(count as usize);
    for _ in 0..count {
        generic_args.push(read_element_type(reader)?);
    }
    Ok(MethodSpecSignature { generic_args })
}
