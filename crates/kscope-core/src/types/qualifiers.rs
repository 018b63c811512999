//! Type qualifiers and qualified type handles.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::sync::Arc;

use super::Type;

/// Set of C type qualifiers
///
/// ```rust
/// use kscope_core::types::Qualifiers;
///
/// let cv = Qualifiers::CONST | Qualifiers::VOLATILE;
/// assert!(cv.contains(Qualifiers::CONST));
/// assert!(!cv.contains(Qualifiers::ATOMIC));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Qualifiers(u8);

impl Qualifiers
{
    /// No qualifiers
    pub const NONE: Self = Qualifiers(0);
    /// `const`
    pub const CONST: Self = Qualifiers(1 << 0);
    /// `volatile`
    pub const VOLATILE: Self = Qualifiers(1 << 1);
    /// `restrict`
    pub const RESTRICT: Self = Qualifiers(1 << 2);
    /// `_Atomic`
    pub const ATOMIC: Self = Qualifiers(1 << 3);

    const SPELLINGS: [(Qualifiers, &'static str); 4] = [
        (Qualifiers::CONST, "const"),
        (Qualifiers::VOLATILE, "volatile"),
        (Qualifiers::RESTRICT, "restrict"),
        (Qualifiers::ATOMIC, "_Atomic"),
    ];

    /// Raw qualifier bits
    pub const fn bits(self) -> u8
    {
        self.0
    }

    /// Whether every qualifier in `other` is also set here
    pub const fn contains(self, other: Qualifiers) -> bool
    {
        self.0 & other.0 == other.0
    }

    /// Whether no qualifier is set
    pub const fn is_empty(self) -> bool
    {
        self.0 == 0
    }
}

impl BitOr for Qualifiers
{
    type Output = Qualifiers;

    fn bitor(self, rhs: Self) -> Self::Output
    {
        Qualifiers(self.0 | rhs.0)
    }
}

impl BitOrAssign for Qualifiers
{
    fn bitor_assign(&mut self, rhs: Self)
    {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for Qualifiers
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let mut first = true;
        for (qualifier, spelling) in Self::SPELLINGS {
            if self.contains(qualifier) {
                if !first {
                    f.write_str(" ")?;
                }
                f.write_str(spelling)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// A type descriptor paired with its qualifiers
///
/// Equality is by identity of the descriptor plus the qualifier bits: two
/// descriptors with the same shape are still different types unless they
/// are the same instance.
#[derive(Debug, Clone)]
pub struct QualifiedType
{
    /// The type descriptor
    pub ty: Arc<Type>,
    /// Qualifiers applied to it
    pub qualifiers: Qualifiers,
}

impl QualifiedType
{
    /// Pair a descriptor with qualifiers
    pub fn new(ty: Arc<Type>, qualifiers: Qualifiers) -> Self
    {
        Self { ty, qualifiers }
    }

    /// A descriptor without qualifiers
    pub fn unqualified(ty: Arc<Type>) -> Self
    {
        Self::new(ty, Qualifiers::NONE)
    }
}

impl PartialEq for QualifiedType
{
    fn eq(&self, other: &Self) -> bool
    {
        Arc::ptr_eq(&self.ty, &other.ty) && self.qualifiers == other.qualifiers
    }
}

impl Eq for QualifiedType {}

impl From<Arc<Type>> for QualifiedType
{
    fn from(ty: Arc<Type>) -> Self
    {
        Self::unqualified(ty)
    }
}

impl fmt::Display for QualifiedType
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        super::format_type_name(f, &self.ty, self.qualifiers)
    }
}
