//! Simulated 64-bit target for integration tests.
//!
//! `SimProgram` answers type lookups through a real `TypeIndex` whose finder
//! chain is backed by the types a test defines. `SimObject` is a small
//! object model over sparse byte memory.

#![allow(dead_code)]

use std::cell::{RefCell, RefMut};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::{Arc, Weak};

use gimli::RunTimeEndian;
use kscope_core::error::{KscopeError, KscopeResult};
use kscope_core::index::TypeIndex;
use kscope_core::object::{FindObjectFlags, IntegerValue, ObjectSource, TargetObject};
use kscope_core::types::{Address, Enumerator, LazyType, Member, PrimitiveType, QualifiedType, Type, TypeKind};
use kscope_core::TargetConfig;

pub const WORD_SIZE: u64 = 8;

/// Sparse byte-addressed memory; reading an unwritten byte faults
#[derive(Debug)]
pub struct Memory
{
    bytes: HashMap<u64, u8>,
    byte_order: RunTimeEndian,
}

impl Memory
{
    fn new(byte_order: RunTimeEndian) -> Self
    {
        Self {
            bytes: HashMap::new(),
            byte_order,
        }
    }

    pub fn write(&mut self, address: u64, data: &[u8])
    {
        for (i, byte) in data.iter().enumerate() {
            self.bytes.insert(address + i as u64, *byte);
        }
    }

    pub fn zero(&mut self, address: u64, len: u64)
    {
        for i in 0..len {
            self.bytes.insert(address + i, 0);
        }
    }

    pub fn write_u8(&mut self, address: u64, value: u8)
    {
        self.write(address, &[value]);
    }

    pub fn write_u32(&mut self, address: u64, value: u32)
    {
        match self.byte_order {
            RunTimeEndian::Little => self.write(address, &value.to_le_bytes()),
            RunTimeEndian::Big => self.write(address, &value.to_be_bytes()),
        }
    }

    pub fn write_u64(&mut self, address: u64, value: u64)
    {
        match self.byte_order {
            RunTimeEndian::Little => self.write(address, &value.to_le_bytes()),
            RunTimeEndian::Big => self.write(address, &value.to_be_bytes()),
        }
    }

    pub fn read(&self, address: u64, len: u64) -> KscopeResult<Vec<u8>>
    {
        (0..len)
            .map(|i| {
                self.bytes.get(&(address + i)).copied().ok_or(KscopeError::Fault {
                    address: Address::new(address + i),
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value
{
    /// Lives in memory at this address
    Reference(u64),
    /// Immediate scalar
    Unsigned(u64),
}

#[derive(Clone)]
pub struct SimObject
{
    memory: Rc<RefCell<Memory>>,
    ty: QualifiedType,
    value: Value,
    byte_order: RunTimeEndian,
}

impl std::fmt::Debug for SimObject
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        write!(f, "({}) {:?}", self.ty, self.value)
    }
}

impl SimObject
{
    pub fn value(&self) -> Value
    {
        self.value
    }

    /// Numeric value of a pointer or integer object
    pub fn pointer_value(&self) -> u64
    {
        self.read_unsigned().unwrap()
    }

    fn with(&self, ty: QualifiedType, value: Value) -> Self
    {
        Self {
            memory: self.memory.clone(),
            ty,
            value,
            byte_order: self.byte_order,
        }
    }

    fn scalar_size(&self) -> KscopeResult<u64>
    {
        let underlying = self.ty.ty.underlying();
        match underlying.kind() {
            TypeKind::Int | TypeKind::Bool | TypeKind::Enum | TypeKind::Pointer => underlying.sizeof(),
            _ => Err(KscopeError::Type(format!("'{}' is not a scalar type", self.ty))),
        }
    }

    fn raw(&self) -> KscopeResult<u64>
    {
        let size = self.scalar_size()?;
        match self.value {
            Value::Unsigned(value) => Ok(value),
            Value::Reference(address) => {
                let bytes = self.memory.borrow().read(address, size)?;
                let fold = |value: u64, byte: &u8| (value << 8) | u64::from(*byte);
                Ok(match self.byte_order {
                    RunTimeEndian::Little => bytes.iter().rev().fold(0, fold),
                    RunTimeEndian::Big => bytes.iter().fold(0, fold),
                })
            }
        }
    }

    fn pointee(&self) -> KscopeResult<QualifiedType>
    {
        let underlying = self.ty.ty.underlying();
        match (underlying.kind(), underlying.referenced()) {
            (TypeKind::Pointer, Some(referenced)) => Ok(referenced.clone()),
            _ => Err(KscopeError::Type(format!("'{}' is not a pointer", self.ty))),
        }
    }
}

/// Find `name` in `ty`, looking into anonymous members. Returns the member
/// type and its bit offset from the start of `ty`.
fn member_location(ty: &Arc<Type>, name: &str) -> KscopeResult<(QualifiedType, u64)>
{
    let underlying = ty.underlying();
    if !underlying.has_members() {
        return Err(KscopeError::Type(format!("'{ty}' is not a structure or union")));
    }
    search_members(&underlying, name)?.ok_or_else(|| KscopeError::MemberNotFound {
        type_name: ty.to_string(),
        member: name.to_string(),
    })
}

fn search_members(ty: &Type, name: &str) -> KscopeResult<Option<(QualifiedType, u64)>>
{
    for member in ty.members() {
        match member.name() {
            Some(member_name) if member_name == name => {
                return Ok(Some((member.qualified_type()?, member.bit_offset())));
            }
            None => {
                let anonymous = member.qualified_type()?.ty.underlying();
                if let Some((found, offset)) = search_members(&anonymous, name)? {
                    return Ok(Some((found, offset + member.bit_offset())));
                }
            }
            Some(_) => {}
        }
    }
    Ok(None)
}

/// Bit offset of a designator such as `numbers[2].pid_chain` inside `ty`
fn designator_offset(ty: &Arc<Type>, designator: &str) -> KscopeResult<u64>
{
    let mut current = ty.clone();
    let mut offset = 0;
    let mut rest = designator;
    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix('[') {
            let end = after
                .find(']')
                .ok_or_else(|| KscopeError::InvalidArgument(format!("bad designator '{designator}'")))?;
            let index: u64 = after[..end]
                .parse()
                .map_err(|_| KscopeError::InvalidArgument(format!("bad designator '{designator}'")))?;
            let array = current.underlying();
            let element = match (array.kind(), array.referenced()) {
                (TypeKind::Array, Some(element)) => element.clone(),
                _ => return Err(KscopeError::Type(format!("'{current}' is not an array"))),
            };
            offset += index * element.ty.sizeof()? * 8;
            current = element.ty;
            rest = &after[end + 1..];
        } else {
            let named = rest.strip_prefix('.').unwrap_or(rest);
            let end = named.find(|c: char| c == '.' || c == '[').unwrap_or(named.len());
            let (member_type, bit_offset) = member_location(&current, &named[..end])?;
            offset += bit_offset;
            current = member_type.ty;
            rest = &named[end..];
        }
    }
    Ok(offset)
}

impl TargetObject for SimObject
{
    fn qualified_type(&self) -> QualifiedType
    {
        self.ty.clone()
    }

    fn read(&self) -> KscopeResult<Self>
    {
        match self.scalar_size() {
            Ok(_) => Ok(self.with(self.ty.clone(), Value::Unsigned(self.raw()?))),
            Err(_) => Ok(self.clone()),
        }
    }

    fn read_unsigned(&self) -> KscopeResult<u64>
    {
        self.raw()
    }

    #[allow(clippy::cast_possible_wrap)]
    fn read_signed(&self) -> KscopeResult<i64>
    {
        let shift = 64 - self.scalar_size()? * 8;
        Ok(((self.raw()? << shift) as i64) >> shift)
    }

    fn read_integer(&self) -> KscopeResult<IntegerValue>
    {
        let underlying = self.ty.ty.underlying();
        match underlying.kind() {
            TypeKind::Int | TypeKind::Bool | TypeKind::Enum if underlying.is_signed() => {
                Ok(IntegerValue::Signed(self.read_signed()?))
            }
            TypeKind::Int | TypeKind::Bool | TypeKind::Enum => Ok(IntegerValue::Unsigned(self.raw()?)),
            _ => Err(KscopeError::Type(format!("'{}' is not an integer", self.ty))),
        }
    }

    fn member(&self, name: &str) -> KscopeResult<Self>
    {
        let (member_type, bit_offset) = member_location(&self.ty.ty, name)?;
        let Value::Reference(address) = self.value else {
            return Err(KscopeError::Type("member of an immediate value".to_string()));
        };
        Ok(self.with(member_type, Value::Reference(address + bit_offset / 8)))
    }

    fn member_dereference(&self, name: &str) -> KscopeResult<Self>
    {
        let target = self.pointee()?;
        let (member_type, bit_offset) = member_location(&target.ty, name)?;
        let address = self.raw()?;
        Ok(self.with(member_type, Value::Reference(address + bit_offset / 8)))
    }

    fn subscript(&self, index: u64) -> KscopeResult<Self>
    {
        let underlying = self.ty.ty.underlying();
        let Some(element) = underlying.referenced().cloned() else {
            return Err(KscopeError::Type(format!("'{}' cannot be subscripted", self.ty)));
        };
        let base = match (underlying.kind(), self.value) {
            (TypeKind::Array, Value::Reference(address)) => address,
            (TypeKind::Pointer, _) => self.raw()?,
            _ => return Err(KscopeError::Type(format!("'{}' cannot be subscripted", self.ty))),
        };
        let stride = element.ty.sizeof()?;
        Ok(self.with(element, Value::Reference(base + index * stride)))
    }

    fn address_of(&self) -> KscopeResult<Self>
    {
        let Value::Reference(address) = self.value else {
            return Err(KscopeError::Type("cannot take address of a value".to_string()));
        };
        let pointer = Arc::new(Type::pointer(WORD_SIZE, self.ty.clone()));
        Ok(self.with(QualifiedType::unqualified(pointer), Value::Unsigned(address)))
    }

    fn cast(&self, ty: QualifiedType) -> KscopeResult<Self>
    {
        let value = self.raw()?;
        Ok(self.with(ty, Value::Unsigned(value)))
    }

    fn is_truthy(&self) -> KscopeResult<bool>
    {
        Ok(self.raw()? != 0)
    }

    fn container_of(&self, container: &QualifiedType, member_path: &str) -> KscopeResult<Self>
    {
        self.pointee()?;
        let bit_offset = designator_offset(&container.ty, member_path)?;
        let address = self.raw()?;
        let pointer = Arc::new(Type::pointer(WORD_SIZE, container.clone()));
        Ok(self.with(
            QualifiedType::unqualified(pointer),
            Value::Unsigned(address.wrapping_sub(bit_offset / 8)),
        ))
    }
}

type Registry = Rc<RefCell<HashMap<(TypeKind, String), Arc<Type>>>>;

/// In-memory program: registered types, globals and memory
pub struct SimProgram
{
    pub index: TypeIndex,
    memory: Rc<RefCell<Memory>>,
    registry: Registry,
    objects: HashMap<String, (FindObjectFlags, SimObject)>,
}

impl SimProgram
{
    pub fn new() -> Self
    {
        Self::with_byte_order(RunTimeEndian::Little)
    }

    pub fn with_byte_order(byte_order: RunTimeEndian) -> Self
    {
        kscope_utils::init_test_logging();

        let config = TargetConfig::new().with_word_size(8).with_byte_order(byte_order);
        let mut index = TypeIndex::with_config(&config).unwrap();
        let registry: Registry = Rc::default();
        let lookup = registry.clone();
        index
            .add_finder(
                move |kind: TypeKind, name: &str, _filename: Option<&str>| -> KscopeResult<Option<QualifiedType>> {
                    Ok(lookup
                        .borrow()
                        .get(&(kind, name.to_string()))
                        .cloned()
                        .map(QualifiedType::unqualified))
                },
            )
            .unwrap();

        Self {
            index,
            memory: Rc::new(RefCell::new(Memory::new(byte_order))),
            registry,
            objects: HashMap::new(),
        }
    }

    pub fn memory(&self) -> RefMut<'_, Memory>
    {
        self.memory.borrow_mut()
    }

    /// Make a named type findable
    pub fn define(&mut self, ty: Arc<Type>) -> QualifiedType
    {
        let name = ty.name().unwrap().to_string();
        self.registry.borrow_mut().insert((ty.kind(), name), ty.clone());
        QualifiedType::unqualified(ty)
    }

    pub fn primitive(&mut self, primitive: PrimitiveType) -> QualifiedType
    {
        QualifiedType::unqualified(self.index.find_primitive(primitive).unwrap())
    }

    pub fn pointer_to(&mut self, ty: &QualifiedType) -> QualifiedType
    {
        QualifiedType::unqualified(self.index.pointer_type(ty.clone()).unwrap())
    }

    pub fn array_of(&mut self, length: u64, ty: &QualifiedType) -> QualifiedType
    {
        QualifiedType::unqualified(self.index.array_type(length, ty.clone()).unwrap())
    }

    /// Define `struct tag` with members at the given byte offsets
    pub fn structure(&mut self, tag: &str, size: u64, members: &[(&str, QualifiedType, u64)]) -> QualifiedType
    {
        let members = members
            .iter()
            .map(|(name, ty, byte_offset)| Member::new(Some(*name), ty.clone(), byte_offset * 8, 0))
            .collect();
        self.define(Arc::new(Type::structure(Some(tag), Some(size), members)))
    }

    pub fn add_variable(&mut self, name: &str, ty: QualifiedType, address: u64)
    {
        let object = self.reference(ty, address);
        self.objects.insert(name.to_string(), (FindObjectFlags::VARIABLE, object));
    }

    pub fn add_constant(&mut self, name: &str, ty: QualifiedType, value: u64)
    {
        let object = self.value(ty, value);
        self.objects.insert(name.to_string(), (FindObjectFlags::CONSTANT, object));
    }

    /// Object in memory at `address`
    pub fn reference(&self, ty: QualifiedType, address: u64) -> SimObject
    {
        self.reference_in(ty, address, self.index.byte_order())
    }

    fn reference_in(&self, ty: QualifiedType, address: u64, byte_order: RunTimeEndian) -> SimObject
    {
        SimObject {
            memory: self.memory.clone(),
            ty,
            value: Value::Reference(address),
            byte_order,
        }
    }

    /// Immediate value
    pub fn value(&self, ty: QualifiedType, value: u64) -> SimObject
    {
        SimObject {
            memory: self.memory.clone(),
            ty,
            value: Value::Unsigned(value),
            byte_order: self.index.byte_order(),
        }
    }
}

impl ObjectSource for SimProgram
{
    type Object = SimObject;

    fn type_index(&mut self) -> &mut TypeIndex
    {
        &mut self.index
    }

    fn find_type(&mut self, name: &str, filename: Option<&str>) -> KscopeResult<QualifiedType>
    {
        let name = name.trim();
        if let Some(base) = name.strip_suffix('*') {
            let base = self.find_type(base, filename)?;
            return Ok(QualifiedType::unqualified(self.index.pointer_type(base)?));
        }
        for (keyword, kind) in [
            ("struct ", TypeKind::Struct),
            ("union ", TypeKind::Union),
            ("enum ", TypeKind::Enum),
        ] {
            if let Some(tag) = name.strip_prefix(keyword) {
                return self.index.find_parsed(kind, tag.trim(), filename);
            }
        }
        if let Some(primitive) = PrimitiveType::ALL
            .iter()
            .find(|primitive| primitive.spellings().iter().any(|spelling| *spelling == name))
        {
            return Ok(QualifiedType::unqualified(self.index.find_primitive(*primitive)?));
        }
        self.index.find_parsed(TypeKind::Typedef, name, filename)
    }

    fn find_object(&mut self, name: &str, _filename: Option<&str>, flags: FindObjectFlags) -> KscopeResult<SimObject>
    {
        match self.objects.get(name) {
            Some((kind, object)) if flags.contains(*kind) => Ok(object.clone()),
            _ => Err(KscopeError::Lookup(format!("could not find '{name}'"))),
        }
    }

    fn object_from_unsigned(&mut self, ty: QualifiedType, value: u64) -> KscopeResult<SimObject>
    {
        Ok(self.value(ty, value))
    }

    fn object_from_reference(
        &mut self,
        ty: QualifiedType,
        address: Address,
        bit_offset: u64,
        _bit_field_size: u64,
        byte_order: Option<RunTimeEndian>,
    ) -> KscopeResult<SimObject>
    {
        let byte_order = byte_order.unwrap_or(self.index.byte_order());
        Ok(self.reference_in(ty, address.member(bit_offset).value(), byte_order))
    }
}

/// `struct hlist_node`, which points at itself
pub fn hlist_node(prog: &mut SimProgram) -> QualifiedType
{
    let node = Arc::new_cyclic(|weak: &Weak<Type>| {
        let next = weak.clone();
        let pprev = weak.clone();
        Type::structure(
            Some("hlist_node"),
            Some(16),
            vec![
                Member::new(Some("next"), LazyType::deferred(move || Ok(pointer_to_weak(&next))), 0, 0),
                Member::new(
                    Some("pprev"),
                    LazyType::deferred(move || {
                        let inner = pointer_to_weak(&pprev);
                        Ok(QualifiedType::unqualified(Arc::new(Type::pointer(WORD_SIZE, inner))))
                    }),
                    64,
                    0,
                ),
            ],
        )
    });
    prog.define(node)
}

fn pointer_to_weak(weak: &Weak<Type>) -> QualifiedType
{
    let target = weak.upgrade().unwrap_or_else(|| Arc::new(Type::structure(Some("hlist_node"), None, Vec::new())));
    QualifiedType::unqualified(Arc::new(Type::pointer(WORD_SIZE, QualifiedType::unqualified(target))))
}

/// `struct hlist_head { struct hlist_node *first; }`
pub fn hlist_head(prog: &mut SimProgram, node: &QualifiedType) -> QualifiedType
{
    let first = prog.pointer_to(node);
    prog.structure("hlist_head", 8, &[("first", first, 0)])
}

/// Radix tree node types, 64 slots each, `shift` at byte 0 and `slots` at 8
pub fn tree_node(prog: &mut SimProgram, tag: &str) -> QualifiedType
{
    let uchar = prog.primitive(PrimitiveType::UnsignedChar);
    let void = prog.primitive(PrimitiveType::Void);
    let void_pointer = prog.pointer_to(&void);
    let slots = prog.array_of(64, &void_pointer);
    prog.structure(tag, 8 + 64 * 8, &[("shift", uchar, 0), ("slots", slots, 8)])
}

/// `struct xarray { int xa_lock; void *xa_head; }` plus `struct xa_node`
pub fn xarray_types(prog: &mut SimProgram) -> QualifiedType
{
    tree_node(prog, "xa_node");
    let int = prog.primitive(PrimitiveType::Int);
    let void = prog.primitive(PrimitiveType::Void);
    let void_pointer = prog.pointer_to(&void);
    prog.structure("xarray", 16, &[("xa_lock", int, 0), ("xa_head", void_pointer, 8)])
}

/// `struct radix_tree_root { int gfp_mask; struct radix_tree_node *rnode; }`
pub fn radix_tree_types(prog: &mut SimProgram) -> QualifiedType
{
    let node = tree_node(prog, "radix_tree_node");
    let node_pointer = prog.pointer_to(&node);
    let int = prog.primitive(PrimitiveType::Int);
    prog.structure("radix_tree_root", 16, &[("gfp_mask", int, 0), ("rnode", node_pointer, 8)])
}

/// Write a zeroed tree node at `address`
pub fn write_node(prog: &SimProgram, address: u64, shift: u8)
{
    let mut memory = prog.memory();
    memory.zero(address, 8 + 64 * 8);
    memory.write_u8(address, shift);
}

/// Store `entry` in slot `slot` of the node at `node`
pub fn write_slot(prog: &SimProgram, node: u64, slot: u64, entry: u64)
{
    prog.memory().write_u64(node + 8 + slot * 8, entry);
}

/// `enum pid_type` and its `PIDTYPE_PID` constant
pub fn pid_type_enum(prog: &mut SimProgram)
{
    let uint = prog.primitive(PrimitiveType::UnsignedInt);
    let pid_type = prog.define(Arc::new(Type::enumeration(
        Some("pid_type"),
        uint,
        vec![
            Enumerator {
                name: "PIDTYPE_PID".to_string(),
                value: 0,
            },
            Enumerator {
                name: "PIDTYPE_TGID".to_string(),
                value: 1,
            },
        ],
    )));
    prog.add_constant("PIDTYPE_PID", pid_type, 0);
}
