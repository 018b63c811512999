//! # Error Types
//!
//! General error handling for the type index and the structure helpers.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.

use thiserror::Error;

use crate::types::Address;

/// Main error type for kscope operations
///
/// ## Error Categories
///
/// 1. **Lookup errors**: `Lookup`, `MemberNotFound`. A named type, object or
///    member does not exist. Helpers also use these as a signal that a
///    layout variant is absent and another one should be tried.
/// 2. **Type errors**: `Type`. A value or type has the wrong shape.
/// 3. **Argument errors**: `InvalidArgument`. A precondition was violated,
///    such as resolving `long` before the word size is known.
/// 4. **Resource errors**: `ResourceExhausted`. Allocation failed. Never retried.
/// 5. **Memory errors**: `Fault`. The memory backend could not read an address.
/// 6. **I/O errors**: `Io`.
#[derive(Error, Debug)]
pub enum KscopeError
{
    /// A named type or object could not be found
    #[error("{0}")]
    Lookup(String),

    /// A structure or union has no member with the requested name
    ///
    /// This is a lookup-class error: [`KscopeError::is_lookup`] returns `true`.
    #[error("'{type_name}' has no member '{member}'")]
    MemberNotFound
    {
        /// C spelling of the type that was searched
        type_name: String,
        /// Requested member name
        member: String,
    },

    /// A value or type does not satisfy a required shape
    ///
    /// Examples:
    /// - Member access on something that is not a structure or union
    /// - A type finder returned a type of the wrong kind
    #[error("{0}")]
    Type(String),

    /// Invalid argument passed to an operation
    ///
    /// Examples:
    /// - Resolving `long` or a pointer type before the word size is set
    /// - No integer type matches the word size for `size_t`
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Memory allocation failed while growing an internal table
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// The memory backend could not read the given address
    #[error("Could not read memory at {address}")]
    Fault
    {
        /// Address of the failed access
        address: Address,
    },

    /// I/O error reported by a memory backend
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl KscopeError
{
    /// Create a type error from a message and the offending type's spelling.
    pub(crate) fn type_error(message: impl Into<String>) -> Self
    {
        KscopeError::Type(message.into())
    }

    /// Whether this error means "entity not found".
    ///
    /// Only lookup-class errors may be discarded in favour of a fallback
    /// layout; every other error must propagate.
    #[must_use]
    pub fn is_lookup(&self) -> bool
    {
        matches!(self, KscopeError::Lookup(_) | KscopeError::MemberNotFound { .. })
    }
}

impl From<std::collections::TryReserveError> for KscopeError
{
    fn from(err: std::collections::TryReserveError) -> Self
    {
        KscopeError::ResourceExhausted(err.to_string())
    }
}

/// Convenience type alias for `Result<T, KscopeError>`
///
/// ```rust
/// use kscope_core::error::KscopeResult;
/// fn foo() -> KscopeResult<()>
/// {
///     Ok(())
/// }
/// ```
pub type KscopeResult<T> = std::result::Result<T, KscopeError>;

/// Separates "absent" from real failures when probing optional layout fields.
///
/// `Ok(Some(value))` means found, `Ok(None)` means a lookup-class error was
/// discarded, and `Err` carries every other error unchanged.
///
/// ```rust
/// use kscope_core::error::{KscopeError, KscopeResult, Probe};
///
/// let missing: KscopeResult<u64> = Err(KscopeError::Lookup("could not find 'idr_base'".into()));
/// assert!(missing.probe().unwrap().is_none());
///
/// let broken: KscopeResult<u64> = Err(KscopeError::Type("not a pointer".into()));
/// assert!(broken.probe().is_err());
/// ```
pub trait Probe<T>
{
    /// Convert a lookup-class error into `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns any error that is not lookup-class.
    fn probe(self) -> KscopeResult<Option<T>>;
}

impl<T> Probe<T> for KscopeResult<T>
{
    fn probe(self) -> KscopeResult<Option<T>>
    {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_lookup() => {
                tracing::trace!("probe absent: {err}");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}
