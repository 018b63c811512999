//! # Primitive Types
//!
//! The C primitive types the index knows how to resolve, their spellings,
//! and the process-wide table of built-in fallback descriptors.
//!
//! The built-in table assumes an LP64 target: `long` and `unsigned long` are
//! eight bytes. [`default_primitive`] hands out the dedicated four-byte
//! variants when asked for a 32-bit word size.

use std::sync::Arc;

use once_cell::sync::Lazy;

use super::{Type, TypeKind};

/// A C primitive type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveType
{
    Void,
    Char,
    SignedChar,
    UnsignedChar,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    Long,
    UnsignedLong,
    LongLong,
    UnsignedLongLong,
    Bool,
    Float,
    Double,
    LongDouble,
    SizeT,
    PtrdiffT,
}

impl PrimitiveType
{
    /// Number of primitive types
    pub const COUNT: usize = 18;

    /// Every primitive type, in slot order
    pub const ALL: [PrimitiveType; Self::COUNT] = [
        PrimitiveType::Void,
        PrimitiveType::Char,
        PrimitiveType::SignedChar,
        PrimitiveType::UnsignedChar,
        PrimitiveType::Short,
        PrimitiveType::UnsignedShort,
        PrimitiveType::Int,
        PrimitiveType::UnsignedInt,
        PrimitiveType::Long,
        PrimitiveType::UnsignedLong,
        PrimitiveType::LongLong,
        PrimitiveType::UnsignedLongLong,
        PrimitiveType::Bool,
        PrimitiveType::Float,
        PrimitiveType::Double,
        PrimitiveType::LongDouble,
        PrimitiveType::SizeT,
        PrimitiveType::PtrdiffT,
    ];

    /// Slot of this primitive in per-index caches
    pub const fn index(self) -> usize
    {
        self as usize
    }

    /// Kind of descriptor this primitive resolves to
    pub const fn kind(self) -> TypeKind
    {
        match self {
            PrimitiveType::Void => TypeKind::Void,
            PrimitiveType::Bool => TypeKind::Bool,
            PrimitiveType::Float | PrimitiveType::Double | PrimitiveType::LongDouble => TypeKind::Float,
            PrimitiveType::SizeT | PrimitiveType::PtrdiffT => TypeKind::Typedef,
            _ => TypeKind::Int,
        }
    }

    /// Known spellings, canonical one first
    ///
    /// The extra spellings are the ones compilers emit in debug information
    /// (`long unsigned int` from GCC, `unsigned long` from Clang).
    pub const fn spellings(self) -> &'static [&'static str]
    {
        match self {
            PrimitiveType::Void => &["void"],
            PrimitiveType::Char => &["char"],
            PrimitiveType::SignedChar => &["signed char", "char signed"],
            PrimitiveType::UnsignedChar => &["unsigned char", "char unsigned"],
            PrimitiveType::Short => &["short", "short int", "signed short", "short signed int", "signed short int"],
            PrimitiveType::UnsignedShort => &["unsigned short", "short unsigned int", "unsigned short int", "short unsigned"],
            PrimitiveType::Int => &["int", "signed int", "signed", "int signed"],
            PrimitiveType::UnsignedInt => &["unsigned int", "unsigned", "int unsigned"],
            PrimitiveType::Long => &["long", "long int", "signed long", "long signed int", "signed long int"],
            PrimitiveType::UnsignedLong => &["unsigned long", "long unsigned int", "unsigned long int", "long unsigned"],
            PrimitiveType::LongLong => &[
                "long long",
                "long long int",
                "signed long long",
                "long long signed int",
                "signed long long int",
            ],
            PrimitiveType::UnsignedLongLong => &[
                "unsigned long long",
                "long long unsigned int",
                "unsigned long long int",
                "long long unsigned",
            ],
            PrimitiveType::Bool => &["_Bool"],
            PrimitiveType::Float => &["float"],
            PrimitiveType::Double => &["double"],
            PrimitiveType::LongDouble => &["long double", "double long"],
            PrimitiveType::SizeT => &["size_t"],
            PrimitiveType::PtrdiffT => &["ptrdiff_t"],
        }
    }

    /// Canonical spelling
    pub const fn name(self) -> &'static str
    {
        self.spellings()[0]
    }

    /// Classify a descriptor of the given kind by its spelling.
    ///
    /// Word order and redundant `int`/`signed` specifiers do not matter:
    /// `"long unsigned int"` and `"unsigned long"` both classify as
    /// [`PrimitiveType::UnsignedLong`]. The result must agree with `kind`.
    ///
    /// ```rust
    /// use kscope_core::types::{PrimitiveType, TypeKind};
    ///
    /// assert_eq!(PrimitiveType::classify(TypeKind::Int, "long int"), Some(PrimitiveType::Long));
    /// assert_eq!(PrimitiveType::classify(TypeKind::Int, "__u64"), None);
    /// assert_eq!(PrimitiveType::classify(TypeKind::Float, "long int"), None);
    /// ```
    pub fn classify(kind: TypeKind, name: &str) -> Option<PrimitiveType>
    {
        let primitive = match kind {
            TypeKind::Void => (name == "void").then_some(PrimitiveType::Void),
            TypeKind::Typedef => match name {
                "size_t" => Some(PrimitiveType::SizeT),
                "ptrdiff_t" => Some(PrimitiveType::PtrdiffT),
                _ => None,
            },
            TypeKind::Int | TypeKind::Bool | TypeKind::Float => classify_specifiers(name),
            _ => None,
        }?;
        (primitive.kind() == kind).then_some(primitive)
    }
}

/// Count C type specifiers in `name` and map the combination to a primitive.
fn classify_specifiers(name: &str) -> Option<PrimitiveType>
{
    #[derive(Default)]
    struct Specifiers
    {
        signed: u8,
        unsigned: u8,
        char: u8,
        short: u8,
        int: u8,
        long: u8,
        bool: u8,
        float: u8,
        double: u8,
    }

    let mut spec = Specifiers::default();
    for word in name.split_whitespace() {
        let slot = match word {
            "signed" => &mut spec.signed,
            "unsigned" => &mut spec.unsigned,
            "char" => &mut spec.char,
            "short" => &mut spec.short,
            "int" => &mut spec.int,
            "long" => &mut spec.long,
            "_Bool" => &mut spec.bool,
            "float" => &mut spec.float,
            "double" => &mut spec.double,
            _ => return None,
        };
        *slot += 1;
    }

    let sign_words = spec.signed + spec.unsigned;
    if spec.signed > 1 || spec.unsigned > 1 || sign_words > 1 || spec.int > 1 || spec.short > 1 || spec.long > 2 {
        return None;
    }

    let others = |allowed: u8| {
        u32::from(spec.char)
            + u32::from(spec.short)
            + u32::from(spec.int)
            + u32::from(spec.long)
            + u32::from(spec.bool)
            + u32::from(spec.float)
            + u32::from(spec.double)
            + u32::from(sign_words)
            == u32::from(allowed)
    };

    if spec.bool == 1 {
        return others(1).then_some(PrimitiveType::Bool);
    }
    if spec.float == 1 {
        return others(1).then_some(PrimitiveType::Float);
    }
    if spec.double == 1 {
        return match spec.long {
            0 if others(1) => Some(PrimitiveType::Double),
            1 if others(2) => Some(PrimitiveType::LongDouble),
            _ => None,
        };
    }
    if spec.char == 1 {
        if spec.short + spec.int + spec.long > 0 {
            return None;
        }
        return Some(if spec.signed == 1 {
            PrimitiveType::SignedChar
        } else if spec.unsigned == 1 {
            PrimitiveType::UnsignedChar
        } else {
            PrimitiveType::Char
        });
    }
    if spec.char > 1 || (spec.short == 1 && spec.long > 0) {
        return None;
    }

    let unsigned = spec.unsigned == 1;
    let primitive = match (spec.short, spec.long) {
        (1, 0) if unsigned => PrimitiveType::UnsignedShort,
        (1, 0) => PrimitiveType::Short,
        (0, 1) if unsigned => PrimitiveType::UnsignedLong,
        (0, 1) => PrimitiveType::Long,
        (0, 2) if unsigned => PrimitiveType::UnsignedLongLong,
        (0, 2) => PrimitiveType::LongLong,
        (0, 0) if spec.int == 1 || sign_words == 1 => {
            if unsigned {
                PrimitiveType::UnsignedInt
            } else {
                PrimitiveType::Int
            }
        }
        _ => return None,
    };
    Some(primitive)
}

struct DefaultPrimitives
{
    by_slot: Vec<Option<Arc<Type>>>,
    long_32bit: Arc<Type>,
    unsigned_long_32bit: Arc<Type>,
}

static VOID_TYPE: Lazy<Arc<Type>> = Lazy::new(|| Arc::new(Type::void()));

static DEFAULT_PRIMITIVES: Lazy<DefaultPrimitives> = Lazy::new(|| {
    let by_slot = PrimitiveType::ALL
        .iter()
        .map(|&primitive| {
            let name = primitive.name();
            let ty = match primitive {
                PrimitiveType::Char | PrimitiveType::SignedChar => Type::int(name, 1, true),
                PrimitiveType::UnsignedChar => Type::int(name, 1, false),
                PrimitiveType::Short => Type::int(name, 2, true),
                PrimitiveType::UnsignedShort => Type::int(name, 2, false),
                PrimitiveType::Int => Type::int(name, 4, true),
                PrimitiveType::UnsignedInt => Type::int(name, 4, false),
                PrimitiveType::Long | PrimitiveType::LongLong => Type::int(name, 8, true),
                PrimitiveType::UnsignedLong | PrimitiveType::UnsignedLongLong => Type::int(name, 8, false),
                PrimitiveType::Bool => Type::bool(name, 1),
                PrimitiveType::Float => Type::float(name, 4),
                PrimitiveType::Double => Type::float(name, 8),
                PrimitiveType::LongDouble => Type::float(name, 16),
                // void is served from VOID_TYPE; size_t and ptrdiff_t are
                // synthesized per index.
                PrimitiveType::Void | PrimitiveType::SizeT | PrimitiveType::PtrdiffT => return None,
            };
            Some(Arc::new(ty))
        })
        .collect();

    DefaultPrimitives {
        by_slot,
        long_32bit: Arc::new(Type::int(PrimitiveType::Long.name(), 4, true)),
        unsigned_long_32bit: Arc::new(Type::int(PrimitiveType::UnsignedLong.name(), 4, false)),
    }
});

/// The shared built-in `void` descriptor
pub fn void_type() -> Arc<Type>
{
    VOID_TYPE.clone()
}

/// Built-in fallback descriptor for a primitive
///
/// `word_size` only matters for `long` and `unsigned long`: a word size of 4
/// selects the 32-bit variants, anything else the 64-bit defaults. Returns
/// `None` for `size_t` and `ptrdiff_t`, which have no fixed default.
pub fn default_primitive(primitive: PrimitiveType, word_size: Option<u8>) -> Option<Arc<Type>>
{
    let defaults = &*DEFAULT_PRIMITIVES;
    match (primitive, word_size) {
        (PrimitiveType::Void, _) => Some(void_type()),
        (PrimitiveType::Long, Some(4)) => Some(defaults.long_32bit.clone()),
        (PrimitiveType::UnsignedLong, Some(4)) => Some(defaults.unsigned_long_32bit.clone()),
        _ => defaults.by_slot[primitive.index()].clone(),
    }
}
