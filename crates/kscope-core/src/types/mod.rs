//! # Types
//!
//! Type descriptors as produced from debug information.
//!
//! A [`Type`] is immutable once built and is always handled through an
//! `Arc`. Identity matters: derived-type interning and the member cache key
//! on *which* descriptor they were given, not on its shape. Use
//! [`TypeIdentity`] when a descriptor has to act as a map key.
//!
//! Aggregate members carry a [`LazyType`] so that self-referential
//! structures (`struct hlist_node { struct hlist_node *next; }`) can be
//! described without building the whole graph up front.

pub mod address;
pub mod primitive;
pub mod qualifiers;

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;

pub use address::Address;
pub use primitive::{default_primitive, void_type, PrimitiveType};
pub use qualifiers::{QualifiedType, Qualifiers};

use crate::error::{KscopeError, KscopeResult};

/// Kind of a type descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind
{
    Void,
    Int,
    Bool,
    Float,
    Struct,
    Union,
    Enum,
    Typedef,
    Pointer,
    Array,
    Function,
}

impl TypeKind
{
    /// Keyword used when naming a type of this kind in diagnostics
    pub const fn spelling(self) -> &'static str
    {
        match self {
            TypeKind::Void => "void",
            TypeKind::Int => "int",
            TypeKind::Bool => "bool",
            TypeKind::Float => "float",
            TypeKind::Struct => "struct",
            TypeKind::Union => "union",
            TypeKind::Enum => "enum",
            TypeKind::Typedef => "typedef",
            TypeKind::Pointer => "pointer",
            TypeKind::Array => "array",
            TypeKind::Function => "function",
        }
    }
}

impl fmt::Display for TypeKind
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(self.spelling())
    }
}

/// Identity of a descriptor instance, usable as a hash key
///
/// Only meaningful while the descriptor is alive; tables keyed by identity
/// keep an `Arc` to the descriptor for as long as the key is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeIdentity(usize);

impl TypeIdentity
{
    /// Identity of the descriptor behind `ty`
    pub fn of(ty: &Type) -> Self
    {
        TypeIdentity(std::ptr::from_ref(ty) as usize)
    }
}

type TypeThunk = Box<dyn Fn() -> KscopeResult<QualifiedType> + Send + Sync>;

struct LazyInner
{
    value: OnceCell<QualifiedType>,
    thunk: Option<TypeThunk>,
}

/// A type that may be evaluated on first use
///
/// Evaluation runs at most once successfully; the result is shared by all
/// clones. A failed evaluation is returned to the caller and retried on the
/// next call.
#[derive(Clone)]
pub struct LazyType(Arc<LazyInner>);

impl LazyType
{
    /// An already-known type
    pub fn evaluated(ty: QualifiedType) -> Self
    {
        LazyType(Arc::new(LazyInner {
            value: OnceCell::with_value(ty),
            thunk: None,
        }))
    }

    /// A type produced by `thunk` when first needed
    pub fn deferred<F>(thunk: F) -> Self
    where
        F: Fn() -> KscopeResult<QualifiedType> + Send + Sync + 'static,
    {
        LazyType(Arc::new(LazyInner {
            value: OnceCell::new(),
            thunk: Some(Box::new(thunk)),
        }))
    }

    /// Whether the type has been evaluated
    pub fn is_evaluated(&self) -> bool
    {
        self.0.value.get().is_some()
    }

    /// Evaluate the type
    ///
    /// # Errors
    ///
    /// Propagates whatever error the deferred thunk reports.
    pub fn evaluate(&self) -> KscopeResult<QualifiedType>
    {
        self.0
            .value
            .get_or_try_init(|| match &self.0.thunk {
                Some(thunk) => thunk(),
                None => Err(KscopeError::type_error("lazy type has neither a value nor a thunk")),
            })
            .cloned()
    }
}

impl From<QualifiedType> for LazyType
{
    fn from(ty: QualifiedType) -> Self
    {
        LazyType::evaluated(ty)
    }
}

impl fmt::Debug for LazyType
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self.0.value.get() {
            Some(ty) => write!(f, "LazyType({ty})"),
            None => f.write_str("LazyType(<deferred>)"),
        }
    }
}

/// Member of a structure or union
#[derive(Debug, Clone)]
pub struct Member
{
    name: Option<String>,
    ty: LazyType,
    bit_offset: u64,
    bit_field_size: u64,
}

impl Member
{
    /// A member at `bit_offset` from the start of its aggregate.
    ///
    /// `name` is `None` for anonymous structures and unions. A
    /// `bit_field_size` of 0 means the member is not a bit field.
    pub fn new(name: Option<&str>, ty: impl Into<LazyType>, bit_offset: u64, bit_field_size: u64) -> Self
    {
        Self {
            name: name.map(str::to_owned),
            ty: ty.into(),
            bit_offset,
            bit_field_size,
        }
    }

    pub fn name(&self) -> Option<&str>
    {
        self.name.as_deref()
    }

    pub fn lazy_type(&self) -> &LazyType
    {
        &self.ty
    }

    /// Evaluate the member's type
    ///
    /// # Errors
    ///
    /// Propagates the lazy type's evaluation error.
    pub fn qualified_type(&self) -> KscopeResult<QualifiedType>
    {
        self.ty.evaluate()
    }

    pub fn bit_offset(&self) -> u64
    {
        self.bit_offset
    }

    pub fn bit_field_size(&self) -> u64
    {
        self.bit_field_size
    }
}

/// Enumerator of an enumerated type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enumerator
{
    pub name: String,
    pub value: i64,
}

/// Parameter of a function type
#[derive(Debug, Clone)]
pub struct Parameter
{
    pub name: Option<String>,
    pub ty: LazyType,
}

/// A type descriptor
///
/// Fields that do not apply to a kind are empty: only integers are signed,
/// only aggregates have members, and so on. Build descriptors with the
/// per-kind constructors.
#[derive(Debug)]
pub struct Type
{
    kind: TypeKind,
    name: Option<String>,
    size: Option<u64>,
    is_signed: bool,
    referenced: Option<QualifiedType>,
    length: Option<u64>,
    members: Vec<Member>,
    enumerators: Vec<Enumerator>,
    parameters: Vec<Parameter>,
    is_variadic: bool,
    is_complete: bool,
    primitive: Option<PrimitiveType>,
}

impl Type
{
    fn bare(kind: TypeKind) -> Self
    {
        Self {
            kind,
            name: None,
            size: None,
            is_signed: false,
            referenced: None,
            length: None,
            members: Vec::new(),
            enumerators: Vec::new(),
            parameters: Vec::new(),
            is_variadic: false,
            is_complete: true,
            primitive: None,
        }
    }

    fn classified(mut self) -> Self
    {
        self.primitive = self.name.as_deref().and_then(|name| PrimitiveType::classify(self.kind, name));
        self
    }

    /// `void`. Prefer the shared [`void_type`] instance.
    pub fn void() -> Self
    {
        Self {
            is_complete: false,
            primitive: Some(PrimitiveType::Void),
            ..Self::bare(TypeKind::Void)
        }
    }

    /// An integer type of `size` bytes
    pub fn int(name: &str, size: u64, is_signed: bool) -> Self
    {
        Self {
            name: Some(name.to_owned()),
            size: Some(size),
            is_signed,
            ..Self::bare(TypeKind::Int)
        }
        .classified()
    }

    /// A boolean type of `size` bytes
    pub fn bool(name: &str, size: u64) -> Self
    {
        Self {
            name: Some(name.to_owned()),
            size: Some(size),
            ..Self::bare(TypeKind::Bool)
        }
        .classified()
    }

    /// A floating-point type of `size` bytes
    pub fn float(name: &str, size: u64) -> Self
    {
        Self {
            name: Some(name.to_owned()),
            size: Some(size),
            ..Self::bare(TypeKind::Float)
        }
        .classified()
    }

    /// A structure; `size` of `None` makes it an incomplete declaration
    pub fn structure(tag: Option<&str>, size: Option<u64>, members: Vec<Member>) -> Self
    {
        Self::aggregate(TypeKind::Struct, tag, size, members)
    }

    /// A union; `size` of `None` makes it an incomplete declaration
    pub fn union(tag: Option<&str>, size: Option<u64>, members: Vec<Member>) -> Self
    {
        Self::aggregate(TypeKind::Union, tag, size, members)
    }

    fn aggregate(kind: TypeKind, tag: Option<&str>, size: Option<u64>, members: Vec<Member>) -> Self
    {
        Self {
            name: tag.map(str::to_owned),
            size,
            members,
            is_complete: size.is_some(),
            ..Self::bare(kind)
        }
    }

    /// An enumerated type backed by the integer type `compatible`
    pub fn enumeration(tag: Option<&str>, compatible: QualifiedType, enumerators: Vec<Enumerator>) -> Self
    {
        Self {
            name: tag.map(str::to_owned),
            size: compatible.ty.size(),
            is_signed: compatible.ty.is_signed(),
            referenced: Some(compatible),
            enumerators,
            ..Self::bare(TypeKind::Enum)
        }
    }

    /// A typedef named `name` for `aliased`
    pub fn typedef(name: &str, aliased: QualifiedType) -> Self
    {
        Self {
            name: Some(name.to_owned()),
            is_complete: aliased.ty.is_complete(),
            referenced: Some(aliased),
            ..Self::bare(TypeKind::Typedef)
        }
        .classified()
    }

    /// A pointer of `size` bytes to `referenced`
    pub fn pointer(size: u64, referenced: QualifiedType) -> Self
    {
        Self {
            size: Some(size),
            referenced: Some(referenced),
            ..Self::bare(TypeKind::Pointer)
        }
    }

    /// An array of `length` elements
    pub fn array(length: u64, element: QualifiedType) -> Self
    {
        Self {
            size: element.ty.size().map(|size| size.saturating_mul(length)),
            length: Some(length),
            referenced: Some(element),
            ..Self::bare(TypeKind::Array)
        }
    }

    /// An array of unknown length, such as a flexible array member
    pub fn incomplete_array(element: QualifiedType) -> Self
    {
        Self {
            referenced: Some(element),
            is_complete: false,
            ..Self::bare(TypeKind::Array)
        }
    }

    /// A function type
    pub fn function(return_type: QualifiedType, parameters: Vec<Parameter>, is_variadic: bool) -> Self
    {
        Self {
            referenced: Some(return_type),
            parameters,
            is_variadic,
            is_complete: false,
            ..Self::bare(TypeKind::Function)
        }
    }

    pub fn kind(&self) -> TypeKind
    {
        self.kind
    }

    /// Spelling of a primitive or typedef, or the tag of an aggregate or enum
    pub fn name(&self) -> Option<&str>
    {
        self.name.as_deref()
    }

    /// Size in bytes as recorded in the descriptor
    ///
    /// `None` for incomplete types and for kinds that carry no size of their
    /// own (typedefs, functions). See [`Type::sizeof`] for the size seen
    /// through typedefs.
    pub fn size(&self) -> Option<u64>
    {
        self.size
    }

    pub fn is_signed(&self) -> bool
    {
        self.is_signed
    }

    /// Whether the type is complete (arrays of known length, defined aggregates)
    pub fn is_complete(&self) -> bool
    {
        self.is_complete
    }

    /// Pointer target, array element, typedef target, enum compatible type or
    /// function return type
    pub fn referenced(&self) -> Option<&QualifiedType>
    {
        self.referenced.as_ref()
    }

    /// Element count of a complete array
    pub fn length(&self) -> Option<u64>
    {
        self.length
    }

    pub fn members(&self) -> &[Member]
    {
        &self.members
    }

    pub fn enumerators(&self) -> &[Enumerator]
    {
        &self.enumerators
    }

    pub fn parameters(&self) -> &[Parameter]
    {
        &self.parameters
    }

    pub fn is_variadic(&self) -> bool
    {
        self.is_variadic
    }

    /// Which primitive this descriptor is, judged by kind and spelling
    pub fn primitive(&self) -> Option<PrimitiveType>
    {
        self.primitive
    }

    /// Whether this is a structure or union
    pub fn has_members(&self) -> bool
    {
        matches!(self.kind, TypeKind::Struct | TypeKind::Union)
    }

    /// Strip typedef layers
    pub fn underlying(self: &Arc<Self>) -> Arc<Type>
    {
        let mut ty = self.clone();
        while ty.kind == TypeKind::Typedef {
            let Some(aliased) = ty.referenced.as_ref() else {
                break;
            };
            ty = aliased.ty.clone();
        }
        ty
    }

    /// Size in bytes, looking through typedefs
    ///
    /// # Errors
    ///
    /// Returns a type error for `void`, functions and incomplete types.
    pub fn sizeof(self: &Arc<Self>) -> KscopeResult<u64>
    {
        let underlying = self.underlying();
        match underlying.kind {
            TypeKind::Void | TypeKind::Function => Err(KscopeError::Type(format!(
                "cannot get size of {} type",
                underlying.kind
            ))),
            _ => underlying.size.ok_or_else(|| {
                KscopeError::Type(format!(
                    "cannot get size of incomplete {} type",
                    underlying.kind
                ))
            }),
        }
    }
}

impl fmt::Display for Type
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        format_base_name(f, self)
    }
}

fn format_base_name(f: &mut fmt::Formatter<'_>, ty: &Type) -> fmt::Result
{
    match ty.kind {
        TypeKind::Void => f.write_str("void"),
        TypeKind::Struct | TypeKind::Union | TypeKind::Enum => {
            write!(f, "{} {}", ty.kind, ty.name.as_deref().unwrap_or("<anonymous>"))
        }
        TypeKind::Pointer => match &ty.referenced {
            Some(referenced) => write!(f, "{referenced} *"),
            None => f.write_str("void *"),
        },
        TypeKind::Array => {
            if let Some(element) = &ty.referenced {
                write!(f, "{element} ")?;
            }
            match ty.length {
                Some(length) => write!(f, "[{length}]"),
                None => f.write_str("[]"),
            }
        }
        TypeKind::Function => {
            if let Some(return_type) = &ty.referenced {
                write!(f, "{return_type} ")?;
            }
            f.write_str("(")?;
            for (i, parameter) in ty.parameters.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                match parameter.ty.evaluate() {
                    Ok(param_type) => write!(f, "{param_type}")?,
                    Err(_) => f.write_str("?")?,
                }
            }
            if ty.is_variadic {
                f.write_str(if ty.parameters.is_empty() { "..." } else { ", ..." })?;
            }
            f.write_str(")")
        }
        TypeKind::Int | TypeKind::Bool | TypeKind::Float | TypeKind::Typedef => {
            f.write_str(ty.name.as_deref().unwrap_or("<anonymous>"))
        }
    }
}

/// Write the C spelling of `ty` with `qualifiers` applied.
///
/// Qualifiers of a pointer follow the `*` (`int * const`); all others come
/// first (`const int`).
pub(crate) fn format_type_name(f: &mut fmt::Formatter<'_>, ty: &Type, qualifiers: Qualifiers) -> fmt::Result
{
    if qualifiers.is_empty() {
        return format_base_name(f, ty);
    }
    if ty.kind == TypeKind::Pointer {
        format_base_name(f, ty)?;
        write!(f, " {qualifiers}")
    } else {
        write!(f, "{qualifiers} ")?;
        format_base_name(f, ty)
    }
}
