//! Common module for library exports

pub use crate::config::TargetConfig;
pub use crate::error::{KscopeError, KscopeResult, Probe};
pub use crate::helpers::{find_pid, find_task, idr_find, pid_task, radix_tree_lookup};
pub use crate::index::{FinderChain, MemberValue, TypeFinder, TypeIndex};
pub use crate::object::{FindObjectFlags, IntegerValue, MemberInfo, ObjectSource, TargetObject};
pub use crate::types::{
    Address, Enumerator, LazyType, Member, Parameter, PrimitiveType, QualifiedType, Qualifiers, Type, TypeKind,
};
