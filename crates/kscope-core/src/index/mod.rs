//! # Type Index
//!
//! Per-session owner of everything derived from type descriptors:
//!
//! - the [`FinderChain`] used to resolve types by name
//! - a cache of resolved primitive types, one slot per [`PrimitiveType`]
//! - interned pointer and array types, unique per (referenced type identity,
//!   qualifiers[, completeness, length])
//! - the structure member cache (see [`TypeIndex::find_member`])
//!
//! ## Word size
//!
//! Pointer sizes and the defaults for `long`, `unsigned long`, `size_t` and
//! `ptrdiff_t` depend on the target ABI. Until [`TypeIndex::set_word_size`] is
//! called, those requests fail with `InvalidArgument`.
//!
//! ## Thread Safety
//!
//! The index is plain mutable state without locking; every resolving
//! operation takes `&mut self`. Wrap it in a `Mutex` to share it.

pub mod finder;
pub mod members;

use std::collections::HashMap;
use std::sync::Arc;

use gimli::RunTimeEndian;
use tracing::debug;

pub use finder::{FinderChain, TypeFinder};
pub use members::MemberValue;

use crate::config::TargetConfig;
use crate::error::{KscopeError, KscopeResult};
use crate::types::{
    default_primitive, void_type, PrimitiveType, QualifiedType, Qualifiers, Type, TypeIdentity, TypeKind,
};

/// Key of an interned pointer type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PointerKey
{
    referenced: TypeIdentity,
    qualifiers: Qualifiers,
}

/// Key of an interned array type; `length` is `None` for incomplete arrays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ArrayKey
{
    element: TypeIdentity,
    qualifiers: Qualifiers,
    length: Option<u64>,
}

/// Integer candidates for `size_t` (unsigned) and `ptrdiff_t` (signed), in
/// order of preference.
const SIZE_T_CANDIDATES: [PrimitiveType; 3] = [
    PrimitiveType::UnsignedLong,
    PrimitiveType::UnsignedLongLong,
    PrimitiveType::UnsignedInt,
];
const PTRDIFF_T_CANDIDATES: [PrimitiveType; 3] = [PrimitiveType::Long, PrimitiveType::LongLong, PrimitiveType::Int];

fn word_size_not_set() -> KscopeError
{
    KscopeError::InvalidArgument("word size has not been set".to_string())
}

/// Canonical store of types for one introspection session
#[derive(Debug, Default)]
pub struct TypeIndex
{
    finders: FinderChain,
    primitive_types: [Option<Arc<Type>>; PrimitiveType::COUNT],
    pointer_types: HashMap<PointerKey, Arc<Type>>,
    array_types: HashMap<ArrayKey, Arc<Type>>,
    members: HashMap<TypeIdentity, HashMap<String, MemberValue>>,
    // Aggregates whose members are fully in `members`. Holding the Arc keeps
    // the identity key from being reused by another descriptor.
    members_cached: HashMap<TypeIdentity, Arc<Type>>,
    word_size: Option<u8>,
    byte_order: RunTimeEndian,
}

impl TypeIndex
{
    /// Create an empty index with no finders, no word size and
    /// little-endian byte order.
    #[must_use]
    pub fn new() -> Self
    {
        Self {
            byte_order: RunTimeEndian::Little,
            ..Self::default()
        }
    }

    /// Create an index for the target described by `config`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if the configured word size is not 4 or 8.
    pub fn with_config(config: &TargetConfig) -> KscopeResult<Self>
    {
        let mut index = Self::new();
        index.byte_order = config.byte_order;
        if let Some(word_size) = config.word_size {
            index.set_word_size(word_size)?;
        }
        Ok(index)
    }

    /// Target address width in bytes, if known
    pub fn word_size(&self) -> Option<u8>
    {
        self.word_size
    }

    /// Byte order of target memory
    pub fn byte_order(&self) -> RunTimeEndian
    {
        self.byte_order
    }

    /// Declare the byte order of target memory.
    pub fn set_byte_order(&mut self, byte_order: RunTimeEndian)
    {
        self.byte_order = byte_order;
    }

    /// Declare the target address width in bytes.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` unless `word_size` is 4 or 8.
    pub fn set_word_size(&mut self, word_size: u8) -> KscopeResult<()>
    {
        if !matches!(word_size, 4 | 8) {
            return Err(KscopeError::InvalidArgument(format!(
                "unsupported word size {word_size}; expected 4 or 8"
            )));
        }
        self.word_size = Some(word_size);
        Ok(())
    }

    /// Register a type finder ahead of the existing ones.
    ///
    /// # Errors
    ///
    /// `ResourceExhausted` if the finder chain cannot grow.
    pub fn add_finder(&mut self, finder: impl TypeFinder + 'static) -> KscopeResult<()>
    {
        self.finders.add(finder)
    }

    /// Remove the most recently registered type finder.
    pub fn remove_finder(&mut self) -> bool
    {
        self.finders.remove_most_recent()
    }

    /// The registered type finders, most recent first
    pub fn finders(&self) -> &FinderChain
    {
        &self.finders
    }

    /// Find a type by kind and name through the finder chain.
    ///
    /// # Errors
    ///
    /// - `Lookup` if no finder knows the type
    /// - `Type` if a finder returned the wrong kind of type
    /// - Any error a finder reports
    pub fn find_parsed(&self, kind: TypeKind, name: &str, filename: Option<&str>) -> KscopeResult<QualifiedType>
    {
        if let Some(found) = self.finders.resolve(kind, name, filename)? {
            return Ok(found);
        }
        Err(KscopeError::Lookup(match filename {
            Some(filename) => format!("could not find '{kind} {name}' in '{filename}'"),
            None => format!("could not find '{kind} {name}'"),
        }))
    }

    /// Resolve a primitive type.
    ///
    /// The finder chain is asked for every spelling of the primitive; the
    /// first answer that classifies as the same primitive wins. Otherwise a
    /// default is used: a word-size dependent built-in for `long` and
    /// `unsigned long`, a typedef of the first integer type of word size for
    /// `size_t` and `ptrdiff_t`, and the fixed built-in for everything else.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if a word-size dependent default is needed but the
    ///   word size is not set, or no integer type matches the word size
    /// - Any error from the finder chain
    pub fn find_primitive(&mut self, primitive: PrimitiveType) -> KscopeResult<Arc<Type>>
    {
        if let Some(cached) = &self.primitive_types[primitive.index()] {
            return Ok(cached.clone());
        }

        let resolved = self.resolve_primitive(primitive)?;
        self.primitive_types[primitive.index()] = Some(resolved.clone());
        Ok(resolved)
    }

    fn resolve_primitive(&mut self, primitive: PrimitiveType) -> KscopeResult<Arc<Type>>
    {
        let kind = primitive.kind();
        if kind == TypeKind::Void {
            return Ok(void_type());
        }

        for spelling in primitive.spellings() {
            if let Some(found) = self.finders.resolve(kind, spelling, None)? {
                if found.ty.primitive() == Some(primitive) {
                    return Ok(found.ty);
                }
                debug!(
                    "'{spelling}' resolved to '{}', which is not {}; ignoring",
                    found.ty,
                    primitive.name()
                );
            }
        }

        match primitive {
            PrimitiveType::Long | PrimitiveType::UnsignedLong => {
                let word_size = self.word_size.ok_or_else(word_size_not_set)?;
                default_primitive(primitive, Some(word_size))
                    .ok_or_else(|| KscopeError::InvalidArgument(format!("no default for {}", primitive.name())))
            }
            PrimitiveType::SizeT | PrimitiveType::PtrdiffT => self.synthesize_word_typedef(primitive),
            _ => default_primitive(primitive, self.word_size)
                .ok_or_else(|| KscopeError::InvalidArgument(format!("no default for {}", primitive.name()))),
        }
    }

    /// Build `size_t` or `ptrdiff_t` as a typedef of the first candidate
    /// integer whose size equals the word size.
    fn synthesize_word_typedef(&mut self, primitive: PrimitiveType) -> KscopeResult<Arc<Type>>
    {
        let word_size = self.word_size.ok_or_else(word_size_not_set)?;
        let candidates = if primitive == PrimitiveType::SizeT {
            &SIZE_T_CANDIDATES
        } else {
            &PTRDIFF_T_CANDIDATES
        };

        for &candidate in candidates {
            let integer = self.find_primitive(candidate)?;
            if integer.size() == Some(u64::from(word_size)) {
                debug!("synthesized {} as a typedef of '{integer}'", primitive.name());
                return Ok(Arc::new(Type::typedef(
                    primitive.name(),
                    QualifiedType::unqualified(integer),
                )));
            }
        }

        Err(KscopeError::InvalidArgument(format!(
            "no suitable integer type for {}",
            primitive.name()
        )))
    }

    /// Get the pointer type to `referenced`, creating it on first request.
    ///
    /// Repeated requests with the same descriptor instance and qualifiers
    /// return the same `Arc`.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if the word size is not set
    /// - `ResourceExhausted` if the pointer table cannot grow
    pub fn pointer_type(&mut self, referenced: QualifiedType) -> KscopeResult<Arc<Type>>
    {
        let word_size = self.word_size.ok_or_else(word_size_not_set)?;
        let key = PointerKey {
            referenced: TypeIdentity::of(&referenced.ty),
            qualifiers: referenced.qualifiers,
        };
        if let Some(existing) = self.pointer_types.get(&key) {
            return Ok(existing.clone());
        }

        self.pointer_types.try_reserve(1)?;
        let pointer = Arc::new(Type::pointer(u64::from(word_size), referenced));
        self.pointer_types.insert(key, pointer.clone());
        Ok(pointer)
    }

    /// Get the array type of `length` elements of `element`.
    ///
    /// # Errors
    ///
    /// `ResourceExhausted` if the array table cannot grow.
    pub fn array_type(&mut self, length: u64, element: QualifiedType) -> KscopeResult<Arc<Type>>
    {
        self.intern_array(Some(length), element)
    }

    /// Get the array type of unknown length of `element`.
    ///
    /// # Errors
    ///
    /// `ResourceExhausted` if the array table cannot grow.
    pub fn incomplete_array_type(&mut self, element: QualifiedType) -> KscopeResult<Arc<Type>>
    {
        self.intern_array(None, element)
    }

    fn intern_array(&mut self, length: Option<u64>, element: QualifiedType) -> KscopeResult<Arc<Type>>
    {
        let key = ArrayKey {
            element: TypeIdentity::of(&element.ty),
            qualifiers: element.qualifiers,
            length,
        };
        if let Some(existing) = self.array_types.get(&key) {
            return Ok(existing.clone());
        }

        self.array_types.try_reserve(1)?;
        let array = Arc::new(match length {
            Some(length) => Type::array(length, element),
            None => Type::incomplete_array(element),
        });
        self.array_types.insert(key, array.clone());
        Ok(array)
    }

    /// Number of interned pointer types
    pub fn pointer_type_count(&self) -> usize
    {
        self.pointer_types.len()
    }

    /// Number of interned array types
    pub fn array_type_count(&self) -> usize
    {
        self.array_types.len()
    }
}
