//! # Member Cache
//!
//! Name lookup of structure and union members.
//!
//! The first lookup on an aggregate flattens its whole member list into the
//! cache: named members are stored under the aggregate with their absolute
//! bit offset, and members of anonymous structures or unions are hoisted so
//! they are addressable directly from the outer type. The aggregate is then
//! marked as cached, so a later miss is known to mean "no such member"
//! without walking the members again.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::TypeIndex;
use crate::error::{KscopeError, KscopeResult};
use crate::types::{LazyType, QualifiedType, Type, TypeIdentity};

/// A cached member: its type, absolute bit offset and bit-field width
#[derive(Debug, Clone)]
pub struct MemberValue
{
    ty: LazyType,
    bit_offset: u64,
    bit_field_size: u64,
}

impl MemberValue
{
    /// The member's (possibly not yet evaluated) type
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

    /// Offset in bits from the start of the outermost aggregate
    pub fn bit_offset(&self) -> u64
    {
        self.bit_offset
    }

    /// Width of a bit field, or 0
    pub fn bit_field_size(&self) -> u64
    {
        self.bit_field_size
    }
}

impl TypeIndex
{
    /// Find a member of a structure or union by name.
    ///
    /// Typedefs are stripped from `ty` first. Members of anonymous nested
    /// structures and unions are found as if they were declared directly in
    /// `ty`.
    ///
    /// # Errors
    ///
    /// - `Type` if `ty` is not a structure or union
    /// - `MemberNotFound` if it has no such member
    /// - Errors from evaluating anonymous members' types while caching
    /// - `ResourceExhausted` if the cache cannot grow
    pub fn find_member(&mut self, ty: &Arc<Type>, name: &str) -> KscopeResult<MemberValue>
    {
        let underlying = ty.underlying();
        let identity = TypeIdentity::of(&underlying);
        if let Some(value) = self.cached_member(identity, name) {
            return Ok(value.clone());
        }

        // Cache miss: either not an aggregate, not cached yet, or cached and
        // the member does not exist.
        if !underlying.has_members() {
            return Err(KscopeError::Type(format!("'{ty}' is not a structure or union")));
        }
        if self.members_cached.contains_key(&identity) {
            return Err(member_not_found(ty, name));
        }

        self.cache_members(&underlying)?;

        self.cached_member(identity, name)
            .cloned()
            .ok_or_else(|| member_not_found(ty, name))
    }

    /// Whether the members of `ty` (after stripping typedefs) are cached
    pub fn is_members_cached(&self, ty: &Arc<Type>) -> bool
    {
        self.members_cached.contains_key(&TypeIdentity::of(&ty.underlying()))
    }

    /// Number of aggregates whose members are cached
    pub fn cached_aggregate_count(&self) -> usize
    {
        self.members_cached.len()
    }

    fn cached_member(&self, identity: TypeIdentity, name: &str) -> Option<&MemberValue>
    {
        self.members.get(&identity).and_then(|members| members.get(name))
    }

    fn cache_members(&mut self, aggregate: &Arc<Type>) -> KscopeResult<()>
    {
        let mut flattened = HashMap::new();
        flatten_members(aggregate, 0, &mut flattened)?;
        debug!("cached {} members of '{aggregate}'", flattened.len());

        // Reserve both tables before committing so a failure leaves neither
        // half-updated.
        let identity = TypeIdentity::of(aggregate);
        self.members.try_reserve(1)?;
        self.members_cached.try_reserve(1)?;
        self.members.insert(identity, flattened);
        self.members_cached.insert(identity, aggregate.clone());
        Ok(())
    }
}

fn flatten_members(ty: &Type, bit_offset: u64, out: &mut HashMap<String, MemberValue>) -> KscopeResult<()>
{
    if !ty.has_members() {
        return Ok(());
    }

    for member in ty.members() {
        let member_offset = bit_offset + member.bit_offset();
        if let Some(name) = member.name() {
            out.try_reserve(1)?;
            out.entry(name.to_owned()).or_insert_with(|| MemberValue {
                ty: member.lazy_type().clone(),
                bit_offset: member_offset,
                bit_field_size: member.bit_field_size(),
            });
        } else {
            let anonymous = member.qualified_type()?;
            flatten_members(&anonymous.ty.underlying(), member_offset, out)?;
        }
    }
    Ok(())
}

fn member_not_found(ty: &Arc<Type>, name: &str) -> KscopeError
{
    KscopeError::MemberNotFound {
        type_name: ty.to_string(),
        member: name.to_owned(),
    }
}
