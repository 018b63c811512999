//! # Type Finder Chain
//!
//! Pluggable callbacks that resolve a type by kind and name.
//!
//! Finders are consulted most-recently-added first. A finder answers with
//! `Ok(None)` when it does not know the name, which passes the request on to
//! the next finder. A finder that answers with a type of a different kind
//! than requested is broken, and the whole lookup fails with a type error
//! instead of moving on.

use smallvec::SmallVec;

use crate::error::{KscopeError, KscopeResult};
use crate::types::{QualifiedType, TypeKind};

/// Resolves a type by kind, name and optional source file
///
/// Closures with the matching signature implement this trait:
///
/// ```rust
/// use std::sync::Arc;
///
/// use kscope_core::error::KscopeResult;
/// use kscope_core::index::FinderChain;
/// use kscope_core::types::{QualifiedType, Type, TypeKind};
///
/// let mut chain = FinderChain::default();
/// chain
///     .add(|kind: TypeKind, name: &str, _file: Option<&str>| -> KscopeResult<Option<QualifiedType>> {
///         Ok((kind == TypeKind::Int && name == "int")
///             .then(|| QualifiedType::unqualified(Arc::new(Type::int("int", 4, true)))))
///     })
///     .unwrap();
/// assert!(chain.resolve(TypeKind::Int, "int", None).unwrap().is_some());
/// assert!(chain.resolve(TypeKind::Int, "long", None).unwrap().is_none());
/// ```
pub trait TypeFinder
{
    /// Look up a type.
    ///
    /// # Errors
    ///
    /// Any error aborts the whole chain lookup. Use `Ok(None)` for "not here".
    fn find(&self, kind: TypeKind, name: &str, filename: Option<&str>) -> KscopeResult<Option<QualifiedType>>;
}

impl<F> TypeFinder for F
where
    F: Fn(TypeKind, &str, Option<&str>) -> KscopeResult<Option<QualifiedType>>,
{
    fn find(&self, kind: TypeKind, name: &str, filename: Option<&str>) -> KscopeResult<Option<QualifiedType>>
    {
        self(kind, name, filename)
    }
}

/// Ordered set of type finders, most recent first
#[derive(Default)]
pub struct FinderChain
{
    // Stored oldest first; lookups walk it backwards.
    finders: SmallVec<[Box<dyn TypeFinder>; 4]>,
}

impl FinderChain
{
    /// Register a finder ahead of all existing ones.
    ///
    /// # Errors
    ///
    /// `ResourceExhausted` if the chain cannot grow.
    pub fn add(&mut self, finder: impl TypeFinder + 'static) -> KscopeResult<()>
    {
        self.finders
            .try_reserve(1)
            .map_err(|err| KscopeError::ResourceExhausted(format!("type finder chain: {err:?}")))?;
        self.finders.push(Box::new(finder));
        Ok(())
    }

    /// Remove the most recently added finder.
    ///
    /// Returns `false` if the chain was already empty.
    pub fn remove_most_recent(&mut self) -> bool
    {
        self.finders.pop().is_some()
    }

    /// Number of registered finders
    pub fn len(&self) -> usize
    {
        self.finders.len()
    }

    /// Whether no finder is registered
    pub fn is_empty(&self) -> bool
    {
        self.finders.is_empty()
    }

    /// Ask each finder in turn until one knows the type.
    ///
    /// Returns `Ok(None)` when no finder produced a type, so callers can
    /// apply their own defaults.
    ///
    /// # Errors
    ///
    /// - `Type` if a finder returns a type whose kind is not `kind`
    /// - Any error a finder reports
    pub fn resolve(&self, kind: TypeKind, name: &str, filename: Option<&str>) -> KscopeResult<Option<QualifiedType>>
    {
        for finder in self.finders.iter().rev() {
            if let Some(found) = finder.find(kind, name, filename)? {
                if found.ty.kind() != kind {
                    return Err(KscopeError::Type(
                        "type find callback returned wrong kind of type".to_string(),
                    ));
                }
                return Ok(Some(found));
            }
        }
        Ok(None)
    }
}

impl std::fmt::Debug for FinderChain
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("FinderChain").field("finders", &self.finders.len()).finish()
    }
}
