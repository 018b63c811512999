//! PID and task lookup.

use tracing::debug;

use super::idr_find;
use crate::error::{KscopeError, KscopeResult, Probe};
use crate::object::{FindObjectFlags, MemberInfo, ObjectSource, TargetObject};
use crate::types::{Address, QualifiedType};

/// Find the `struct pid` for `pid` in the PID namespace `ns`.
///
/// `ns` is a pointer to a `struct pid_namespace`. Returns a
/// `struct pid *`, which is null if the namespace has no such PID.
///
/// # Errors
///
/// Lookup errors if the needed types or globals are missing; memory errors.
pub fn find_pid<S: ObjectSource>(prog: &mut S, ns: &S::Object, pid: u64) -> KscopeResult<S::Object>
{
    if let Some(idr) = ns.member_dereference("idr").probe()? {
        let idr = idr.address_of()?;
        let entry = idr_find(prog, &idr, pid)?;
        let pid_pointer = prog.find_type("struct pid *", None)?;
        return entry.cast(pid_pointer);
    }

    // Before v4.15 PIDs live in the global pid_hash table.
    debug!("pid namespace has no idr; scanning pid_hash for {pid}");
    let pid_hash = prog.find_object("pid_hash", None, FindObjectFlags::ANY)?;
    find_pid_in_pid_hash(prog, ns, &pid_hash, pid)
}

/// Member layout of `struct upid` needed to test a hash chain entry
struct UpidLayout
{
    pid_chain: MemberInfo,
    nr: MemberInfo,
    ns: MemberInfo,
}

/// Scan every bucket of `pid_hash` for a `struct upid` with number `pid` in
/// namespace `ns`.
///
/// The hash function changed between kernel versions and word sizes, so the
/// whole table is searched instead of recomputing the bucket.
fn find_pid_in_pid_hash<S: ObjectSource>(
    prog: &mut S,
    ns: &S::Object,
    pid_hash: &S::Object,
    pid: u64,
) -> KscopeResult<S::Object>
{
    let pid_pointer = prog.find_type("struct pid *", None)?;
    let upid_type = prog.find_type("struct upid", None)?;
    let upid = UpidLayout {
        pid_chain: prog.member_info(&upid_type.ty, "pid_chain")?,
        nr: prog.member_info(&upid_type.ty, "nr")?,
        ns: prog.member_info(&upid_type.ty, "ns")?,
    };
    let Some(pid_struct) = pid_pointer.ty.referenced().cloned() else {
        return Err(KscopeError::type_error(format!("'{pid_pointer}' is not a pointer type")));
    };

    let ns = ns.read()?;
    let ns_address = ns.read_unsigned()?;
    let ns_level = ns.member_dereference("level")?.read_integer()?.as_u64();

    let shift = prog
        .find_object("pidhash_shift", None, FindObjectFlags::ANY)?
        .read_integer()?
        .as_u64();
    let buckets = if shift >= 64 { 0 } else { 1_u64 << shift };

    for bucket in (0..buckets).rev() {
        let mut node = pid_hash.subscript(bucket)?.member("first")?;
        loop {
            node = node.read()?;
            let node_address = node.read_unsigned()?;
            if node_address == 0 {
                break;
            }

            let upid_address = Address::new(node_address).container(upid.pid_chain.bit_offset);
            if chain_entry_matches(prog, &upid, upid_address, pid, ns_address)? {
                debug!("pid {pid} found in pid_hash bucket {bucket}");
                return pid_from_chain_node(&node, &pid_struct, ns_level);
            }

            node = node.member_dereference("next")?;
        }
    }

    prog.object_from_unsigned(pid_pointer, 0)
}

/// Read `nr` and `ns` of the `struct upid` at `upid_address` straight from
/// memory and compare them with the wanted PID and namespace.
fn chain_entry_matches<S: ObjectSource>(
    prog: &mut S,
    upid: &UpidLayout,
    upid_address: Address,
    pid: u64,
    ns_address: u64,
) -> KscopeResult<bool>
{
    let byte_order = Some(prog.byte_order());
    let nr = prog.object_from_reference(
        upid.nr.qualified_type.clone(),
        upid_address.member(upid.nr.bit_offset),
        0,
        0,
        byte_order,
    )?;
    if nr.read_integer()?.as_u64() != pid {
        return Ok(false);
    }

    let ns = prog.object_from_reference(
        upid.ns.qualified_type.clone(),
        upid_address.member(upid.ns.bit_offset),
        0,
        0,
        byte_order,
    )?;
    Ok(ns.read_unsigned()? == ns_address)
}

/// Recover the `struct pid` that embeds the matching hash chain node.
fn pid_from_chain_node<O: TargetObject>(node: &O, pid_struct: &QualifiedType, ns_level: u64) -> KscopeResult<O>
{
    if let Some(pid) = node
        .container_of(pid_struct, &format!("numbers[{ns_level}].pid_chain"))
        .probe()?
    {
        return Ok(pid);
    }
    // Kernels without PID namespaces chain struct pid directly.
    node.container_of(pid_struct, "pid_chain")
}

/// Get the task using `pid` as its PID of type `pid_type`.
///
/// `pid` is a `struct pid *`; `pid_type` is a value of `enum pid_type`.
/// Returns a `struct task_struct *`, which is null if `pid` is null or no
/// task uses it.
///
/// # Errors
///
/// Lookup errors if `struct task_struct` or the task list members are
/// missing; memory errors.
pub fn pid_task<S: ObjectSource>(prog: &mut S, pid: &S::Object, pid_type: u64) -> KscopeResult<S::Object>
{
    let task_pointer = prog.find_type("struct task_struct *", None)?;
    let Some(task_struct) = task_pointer.ty.referenced().cloned() else {
        return Err(KscopeError::type_error(format!("'{task_pointer}' is not a pointer type")));
    };

    if !pid.is_truthy()? {
        return prog.object_from_unsigned(task_pointer, 0);
    }

    let first = pid.member_dereference("tasks")?.subscript(pid_type)?.member("first")?;
    if !first.is_truthy()? {
        return prog.object_from_unsigned(task_pointer, 0);
    }

    if let Some(task) = first
        .container_of(&task_struct, &format!("pid_links[{pid_type}]"))
        .probe()?
    {
        return Ok(task);
    }
    // Before v4.19 tasks link through struct pid_link.
    first.container_of(&task_struct, &format!("pids[{pid_type}].node"))
}

/// Find the task with PID `pid` in the PID namespace `ns`.
///
/// Returns a `struct task_struct *`, null if there is no such task.
///
/// # Errors
///
/// Everything [`find_pid`] and [`pid_task`] can return, and a lookup error if
/// the `PIDTYPE_PID` constant is unknown.
pub fn find_task<S: ObjectSource>(prog: &mut S, ns: &S::Object, pid: u64) -> KscopeResult<S::Object>
{
    let pid_object = find_pid(prog, ns, pid)?;
    let pid_type = prog
        .find_object("PIDTYPE_PID", None, FindObjectFlags::CONSTANT)?
        .read_integer()?
        .as_u64();
    pid_task(prog, &pid_object, pid_type)
}
