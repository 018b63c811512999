//! Tests for IDR lookup

mod common;

use common::{write_node, write_slot, xarray_types, SimObject, SimProgram};
use kscope_core::helpers::idr_find;
use kscope_core::types::PrimitiveType;

const IDR_ADDRESS: u64 = 0x3000;
const NODE: u64 = 0x31_000;

/// An IDR whose single radix tree node maps slot `i` to `0x1000 * (i + 1)`
fn idr(with_base: Option<u32>) -> (SimProgram, SimObject)
{
    let mut prog = SimProgram::new();
    let xarray = xarray_types(&mut prog);
    let uint = prog.primitive(PrimitiveType::UnsignedInt);

    let idr_type = match with_base {
        Some(_) => prog.structure(
            "idr",
            24,
            &[("idr_rt", xarray, 0), ("idr_base", uint.clone(), 16), ("idr_next", uint, 20)],
        ),
        None => prog.structure("idr", 24, &[("idr_rt", xarray, 0), ("idr_next", uint, 16)]),
    };

    write_node(&prog, NODE, 0);
    for slot in 0..8 {
        write_slot(&prog, NODE, slot, 0x1000 * (slot + 1));
    }
    {
        let mut memory = prog.memory();
        memory.write_u64(IDR_ADDRESS, 0);
        memory.write_u64(IDR_ADDRESS + 8, NODE | 2);
        memory.write_u32(IDR_ADDRESS + 16, with_base.unwrap_or(0));
        memory.write_u32(IDR_ADDRESS + 20, 0);
    }

    let pointer = prog.pointer_to(&idr_type);
    let object = prog.value(pointer, IDR_ADDRESS);
    (prog, object)
}

#[test]
fn test_idr_find_subtracts_base()
{
    let (mut prog, idr) = idr(Some(100));
    assert_eq!(idr_find(&mut prog, &idr, 100).unwrap().pointer_value(), 0x1000);
    assert_eq!(idr_find(&mut prog, &idr, 105).unwrap().pointer_value(), 0x6000);
}

#[test]
fn test_idr_find_zero_base()
{
    let (mut prog, idr) = idr(Some(0));
    assert_eq!(idr_find(&mut prog, &idr, 3).unwrap().pointer_value(), 0x4000);
}

#[test]
fn test_same_tree_different_base()
{
    let (mut based_prog, based) = idr(Some(100));
    let (mut zero_prog, zero) = idr(Some(0));
    // Both reach slot 5 of the same node layout.
    let via_base = idr_find(&mut based_prog, &based, 105).unwrap().pointer_value();
    let direct = idr_find(&mut zero_prog, &zero, 5).unwrap().pointer_value();
    assert_eq!(via_base, direct);
    assert_eq!(idr_find(&mut zero_prog, &zero, 105).unwrap().pointer_value(), 0);
}

#[test]
fn test_idr_find_without_base_member()
{
    let (mut prog, idr) = idr(None);
    assert_eq!(idr_find(&mut prog, &idr, 3).unwrap().pointer_value(), 0x4000);
    // Unused slot
    assert_eq!(idr_find(&mut prog, &idr, 40).unwrap().pointer_value(), 0);
}

#[test]
fn test_idr_find_requires_idr_rt()
{
    let mut prog = SimProgram::new();
    let uint = prog.primitive(PrimitiveType::UnsignedInt);
    let broken = prog.structure("idr", 8, &[("idr_base", uint, 0)]);
    prog.memory().write_u64(IDR_ADDRESS, 0);

    let pointer = prog.pointer_to(&broken);
    let idr = prog.value(pointer, IDR_ADDRESS);
    let err = idr_find(&mut prog, &idr, 1).unwrap_err();
    assert!(err.is_lookup());
    assert_eq!(err.to_string(), "'struct idr' has no member 'idr_rt'");
}
