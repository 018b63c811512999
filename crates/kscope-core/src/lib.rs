//! # kscope-core
//!
//! Type index and kernel structure walkers for kscope.
//!
//! This crate provides:
//! - Type descriptors for C programs ([`types`])
//! - A per-session type index: finder chain, primitive resolution, interned
//!   pointer and array types and a member offset cache ([`index`])
//! - Helpers that walk Linux kernel structures (radix trees, XArrays, IDRs,
//!   PIDs and tasks) through a host-provided object model ([`helpers`],
//!   [`object`])
//!
//! ## Memory access
//!
//! kscope never touches memory itself. Reading the target is the host's job,
//! done through the [`object::ObjectSource`] and [`object::TargetObject`]
//! traits.

pub mod config;
pub mod error;
pub mod helpers;
pub mod index;
pub mod object;
pub mod prelude;
pub mod types;

pub use config::TargetConfig;
// Re-export commonly used types
pub use error::{KscopeError, KscopeResult};
pub use index::TypeIndex;
pub use types::{Address, QualifiedType, Type, TypeKind};
