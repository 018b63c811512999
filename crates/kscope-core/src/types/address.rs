//! Target address type.

use std::fmt;
use std::ops::{Add, Sub};

/// Strongly typed address in the inspected target
///
/// Wraps a `u64` so that target addresses are not mixed up with ids, shifts
/// or byte counts while walking kernel data structures.
///
/// ## Example
///
/// ```rust
/// use kscope_core::types::Address;
///
/// let node = Address::from(0x1000);
/// assert_eq!((node + 0x10).value(), 0x1010);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(u64);

impl Address
{
    /// Create a new address from a `u64` value
    pub const fn new(value: u64) -> Self
    {
        Address(value)
    }

    /// Get the raw `u64` value of this address
    pub const fn value(self) -> u64
    {
        self.0
    }

    /// Address of a member that starts `bit_offset` bits into the object at
    /// this address.
    ///
    /// Only whole bytes are applied; a bit-field's residual bits are the
    /// caller's concern.
    ///
    /// ```rust
    /// use kscope_core::types::Address;
    ///
    /// let upid = Address::from(0x2000);
    /// assert_eq!(upid.member(64), Address::from(0x2008));
    /// ```
    #[must_use]
    pub const fn member(self, bit_offset: u64) -> Self
    {
        Address(self.0.wrapping_add(bit_offset / 8))
    }

    /// Address of the enclosing object, given that this address points at a
    /// member `bit_offset` bits into it.
    ///
    /// ```rust
    /// use kscope_core::types::Address;
    ///
    /// let chain = Address::from(0x2010);
    /// assert_eq!(chain.container(128), Address::from(0x2000));
    /// ```
    #[must_use]
    pub const fn container(self, bit_offset: u64) -> Self
    {
        Address(self.0.wrapping_sub(bit_offset / 8))
    }
}

impl From<u64> for Address
{
    fn from(value: u64) -> Self
    {
        Address(value)
    }
}

impl From<Address> for u64
{
    fn from(address: Address) -> Self
    {
        address.0
    }
}

impl fmt::Display for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "0x{:016x}", self.0)
    }
}

impl Add<u64> for Address
{
    type Output = Address;

    fn add(self, rhs: u64) -> Self::Output
    {
        Address(self.0.wrapping_add(rhs))
    }
}

impl Sub<u64> for Address
{
    type Output = Address;

    fn sub(self, rhs: u64) -> Self::Output
    {
        Address(self.0.wrapping_sub(rhs))
    }
}
