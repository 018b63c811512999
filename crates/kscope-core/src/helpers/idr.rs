//! ID allocator lookup.

use tracing::debug;

use super::radix_tree_lookup;
use crate::error::{KscopeResult, Probe};
use crate::object::{ObjectSource, TargetObject};

/// Look up the pointer registered under `id` in an IDR.
///
/// `idr` is a pointer to a `struct idr`. Kernels since v4.16 number IDs from
/// `idr_base`; older ones have no base and `id` is used as is.
///
/// # Errors
///
/// Lookup errors if `idr_rt` is missing, plus everything
/// [`radix_tree_lookup`] can return.
pub fn idr_find<S: ObjectSource>(prog: &mut S, idr: &S::Object, id: u64) -> KscopeResult<S::Object>
{
    let mut index = id;
    if let Some(base) = idr.member_dereference("idr_base").probe()? {
        let base = base.read_integer()?.as_u64();
        index = id.wrapping_sub(base);
        debug!("idr base {base}: id {id} is index {index}");
    }

    let root = idr.member_dereference("idr_rt")?.address_of()?;
    radix_tree_lookup(prog, &root, index)
}
