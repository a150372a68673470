//! The type system: a lazily-built table of the CLI's built-in primitive element types, shared
//! across every signature a given process decodes rather than reconstructed per call.

use crate::metadata::signature::ElementType;

/// The primitive element types every CLI signature bottoms out at. Grounded on ECMA-335
/// §II.23.1.16's terminal element-type bytes; compound types (arrays, generics, classes) are
/// always built fresh by [`crate::metadata::signature`] since they carry their own data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSystem {
    pub void: ElementType,
    pub boolean: ElementType,
    pub char: ElementType,
    pub i1: ElementType,
    pub u1: ElementType,
    pub i2: ElementType,
    pub u2: ElementType,
    pub i4: ElementType,
    pub u4: ElementType,
    pub i8: ElementType,
    pub u8: ElementType,
    pub r4: ElementType,
    pub r8: ElementType,
    pub string: ElementType,
    pub object: ElementType,
    pub typed_by_ref: ElementType,
    pub int_ptr: ElementType,
    pub uint_ptr: ElementType,
}

impl TypeSystem {
    fn build() -> TypeSystem {
        TypeSystem {
            void: ElementType::Void,
            boolean: ElementType::Boolean,
            char: ElementType::Char,
            i1: ElementType::I1,
            u1: ElementType::U1,
            i2: ElementType::I2,
            u2: ElementType::U2,
            i4: ElementType::I4,
            u4: ElementType::U4,
            i8: ElementType::I8,
            u8: ElementType::U8,
            r4: ElementType::R4,
            r8: ElementType::R8,
            string: ElementType::String,
            object: ElementType::Object,
            typed_by_ref: ElementType::TypedByRef,
            int_ptr: ElementType::IntPtr,
            uint_ptr: ElementType::UIntPtr,
        }
    }

    /// The process-wide instance, built on first access. Under `std`, this is a genuine
    /// `OnceLock`-backed singleton so every caller in the process shares one instance; without
    /// `std` there is no portable one-shot primitive available, so this falls back to building a
    /// fresh (but value-identical) instance per call, consistent with this crate's
    /// always-idempotent-initialization invariant.
    #[cfg(feature = "std")]
    pub fn instance() -> &'static TypeSystem {
        static INSTANCE: std::sync::OnceLock<TypeSystem> = std::sync::OnceLock::new();
        INSTANCE.get_or_init(TypeSystem::build)
    }

    #[cfg(not(feature = "std"))]
    pub fn instance() -> TypeSystem {
        TypeSystem::build()
    }
}
