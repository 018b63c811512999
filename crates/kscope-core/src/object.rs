//! # Typed Memory Objects
//!
//! The interface the structure helpers use to read the target.
//!
//! kscope does not implement objects itself. A host (a live-process backend,
//! a crash dump reader) provides an [`ObjectSource`] and its
//! [`TargetObject`] type; the helpers in [`crate::helpers`] are generic over
//! both.
//!
//! Every lookup-style failure (unknown member, unknown type, unknown global)
//! must be reported as a lookup-class [`KscopeError`]. Helpers rely on that
//! to detect which layout a kernel uses.

use std::ops::BitOr;
use std::sync::Arc;

use gimli::RunTimeEndian;

use crate::error::KscopeResult;
use crate::index::TypeIndex;
use crate::types::{Address, QualifiedType, Type};

/// Value of an integer object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegerValue
{
    Signed(i64),
    Unsigned(u64),
}

impl IntegerValue
{
    /// The value's bits as an unsigned integer
    #[allow(clippy::cast_sign_loss)]
    pub const fn as_u64(self) -> u64
    {
        match self {
            IntegerValue::Signed(value) => value as u64,
            IntegerValue::Unsigned(value) => value,
        }
    }
}

/// Which kinds of global object [`ObjectSource::find_object`] may return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FindObjectFlags(u8);

impl FindObjectFlags
{
    /// Enumerators and other compile-time constants
    pub const CONSTANT: Self = FindObjectFlags(1 << 0);
    /// Functions
    pub const FUNCTION: Self = FindObjectFlags(1 << 1);
    /// Variables
    pub const VARIABLE: Self = FindObjectFlags(1 << 2);
    /// Anything
    pub const ANY: Self = FindObjectFlags(0b111);

    pub const fn contains(self, other: FindObjectFlags) -> bool
    {
        self.0 & other.0 == other.0
    }
}

impl BitOr for FindObjectFlags
{
    type Output = FindObjectFlags;

    fn bitor(self, rhs: Self) -> Self::Output
    {
        FindObjectFlags(self.0 | rhs.0)
    }
}

/// Type, bit offset and bit-field width of a member
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo
{
    pub qualified_type: QualifiedType,
    pub bit_offset: u64,
    pub bit_field_size: u64,
}

/// A value of a known type, in target memory or held immediately
///
/// All operations return a new object and leave `self` untouched.
pub trait TargetObject: Sized + Clone
{
    /// Type of the object
    fn qualified_type(&self) -> QualifiedType;

    /// Read the object from target memory into an immediate value.
    ///
    /// # Errors
    ///
    /// Fails if the memory cannot be read.
    fn read(&self) -> KscopeResult<Self>;

    /// Read an integer or pointer as unsigned.
    ///
    /// # Errors
    ///
    /// `Type` for non-scalar objects; memory errors.
    fn read_unsigned(&self) -> KscopeResult<u64>;

    /// Read an integer as signed.
    ///
    /// # Errors
    ///
    /// `Type` for non-scalar objects; memory errors.
    fn read_signed(&self) -> KscopeResult<i64>;

    /// Read an integer with the signedness of its type.
    ///
    /// # Errors
    ///
    /// `Type` for non-integer objects; memory errors.
    fn read_integer(&self) -> KscopeResult<IntegerValue>;

    /// `self.name` on a structure or union.
    ///
    /// # Errors
    ///
    /// Lookup-class error if there is no such member.
    fn member(&self, name: &str) -> KscopeResult<Self>;

    /// `self->name` on a pointer to a structure or union.
    ///
    /// # Errors
    ///
    /// Lookup-class error if there is no such member; memory errors.
    fn member_dereference(&self, name: &str) -> KscopeResult<Self>;

    /// `self[index]` on an array or pointer.
    ///
    /// # Errors
    ///
    /// `Type` if `self` cannot be subscripted; memory errors.
    fn subscript(&self, index: u64) -> KscopeResult<Self>;

    /// `&self`.
    ///
    /// # Errors
    ///
    /// Fails if `self` is not in memory.
    fn address_of(&self) -> KscopeResult<Self>;

    /// `(ty)self`.
    ///
    /// # Errors
    ///
    /// `Type` if the conversion is not allowed.
    fn cast(&self, ty: QualifiedType) -> KscopeResult<Self>;

    /// Whether the value is non-zero (non-null for pointers).
    ///
    /// # Errors
    ///
    /// `Type` for objects without a truth value; memory errors.
    fn is_truthy(&self) -> KscopeResult<bool>;

    /// Treat `self` as a pointer to the member `member_path` of a `container`
    /// and return a pointer to the enclosing `container`.
    ///
    /// `member_path` uses C designator syntax, for example
    /// `"numbers[2].pid_chain"`.
    ///
    /// # Errors
    ///
    /// Lookup-class error if the path does not exist in `container`.
    fn container_of(&self, container: &QualifiedType, member_path: &str) -> KscopeResult<Self>;
}

/// Program-level oracle: type and global lookup plus object construction
pub trait ObjectSource
{
    /// Object type produced by this source
    type Object: TargetObject;

    /// The session's type index
    fn type_index(&mut self) -> &mut TypeIndex;

    /// Find a type by its C spelling, such as `"struct pid *"`.
    ///
    /// # Errors
    ///
    /// Lookup-class error if the type is unknown.
    fn find_type(&mut self, name: &str, filename: Option<&str>) -> KscopeResult<QualifiedType>;

    /// Find a global object by name.
    ///
    /// # Errors
    ///
    /// Lookup-class error if no object of the allowed kinds has this name.
    fn find_object(&mut self, name: &str, filename: Option<&str>, flags: FindObjectFlags)
        -> KscopeResult<Self::Object>;

    /// An immediate object of type `ty` holding `value`.
    ///
    /// # Errors
    ///
    /// `Type` if `ty` cannot hold an unsigned value.
    fn object_from_unsigned(&mut self, ty: QualifiedType, value: u64) -> KscopeResult<Self::Object>;

    /// An object of type `ty` located at `address` in target memory.
    ///
    /// `byte_order` of `None` uses the program's byte order. Nothing is read
    /// until the object is.
    ///
    /// # Errors
    ///
    /// `Type` if `ty` cannot be placed in memory.
    fn object_from_reference(
        &mut self,
        ty: QualifiedType,
        address: Address,
        bit_offset: u64,
        bit_field_size: u64,
        byte_order: Option<RunTimeEndian>,
    ) -> KscopeResult<Self::Object>;

    /// Byte order of the program's memory
    fn byte_order(&mut self) -> RunTimeEndian
    {
        self.type_index().byte_order()
    }

    /// Type, absolute bit offset and bit-field width of member `name` of `ty`.
    ///
    /// # Errors
    ///
    /// See [`TypeIndex::find_member`].
    fn member_info(&mut self, ty: &Arc<Type>, name: &str) -> KscopeResult<MemberInfo>
    {
        let member = self.type_index().find_member(ty, name)?;
        Ok(MemberInfo {
            qualified_type: member.qualified_type()?,
            bit_offset: member.bit_offset(),
            bit_field_size: member.bit_field_size(),
        })
    }
}
