//! Radix tree and XArray lookup.

use tracing::{debug, trace};

use crate::error::{KscopeError, KscopeResult, Probe};
use crate::object::{ObjectSource, TargetObject};
use crate::types::TypeKind;

/// Low pointer bits that tag a slot entry
const RADIX_TREE_ENTRY_MASK: u64 = 3;

/// Node encoding used by the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TreeLayout
{
    /// `struct xarray` with `xa_head`
    XArray,
    /// `struct radix_tree_root` with `rnode`
    RadixTree,
}

impl TreeLayout
{
    /// Tag value marking an entry as a pointer to an internal node
    const fn internal_node_tag(self) -> u64
    {
        match self {
            TreeLayout::XArray => 2,
            TreeLayout::RadixTree => 1,
        }
    }

    const fn node_pointer_type(self) -> &'static str
    {
        match self {
            TreeLayout::XArray => "struct xa_node *",
            TreeLayout::RadixTree => "struct radix_tree_node *",
        }
    }
}

/// Look up the entry stored at `index` in a radix tree or XArray.
///
/// `root` is a pointer to a `struct xarray` or `struct radix_tree_root`.
/// Returns the slot entry (typed as the slot element, usually `void *`),
/// which is a null pointer when nothing is stored at `index`.
///
/// # Errors
///
/// - Lookup errors if neither layout's head member exists, or if the node
///   types cannot be found
/// - `Type` if the node's `slots` member is not an array of known length
/// - Memory errors from the object source
pub fn radix_tree_lookup<S: ObjectSource>(prog: &mut S, root: &S::Object, index: u64) -> KscopeResult<S::Object>
{
    let (mut node, layout) = match root.member_dereference("xa_head").probe()? {
        Some(head) => (head, TreeLayout::XArray),
        None => {
            let rnode = root.member_dereference("rnode")?;
            let void_pointer = prog.find_type("void *", None)?;
            (rnode.cast(void_pointer)?, TreeLayout::RadixTree)
        }
    };
    debug!("radix tree lookup of index {index} using {layout:?} layout");

    let internal_node = layout.internal_node_tag();
    let node_type = prog.find_type(layout.node_pointer_type(), None)?;
    let node_struct = node_type
        .ty
        .referenced()
        .ok_or_else(|| KscopeError::Type(format!("'{node_type}' is not a pointer type")))?
        .ty
        .clone();

    let slots = prog.member_info(&node_struct, "slots")?;
    let slots_type = &slots.qualified_type.ty;
    let slot_count = match (slots_type.kind(), slots_type.length()) {
        (TypeKind::Array, Some(length)) if length > 0 => length,
        _ => {
            return Err(KscopeError::Type(format!(
                "{node_struct} slots member is not an array"
            )))
        }
    };
    let map_mask = slot_count - 1;

    loop {
        node = node.read()?;
        let entry = node.read_unsigned()?;
        if entry & RADIX_TREE_ENTRY_MASK != internal_node {
            break;
        }

        node = prog.object_from_unsigned(node_type.clone(), entry & !internal_node)?;
        let shift = node.member_dereference("shift")?.read_integer()?.as_u64();
        let offset = if shift >= 64 { 0 } else { (index >> shift) & map_mask };
        trace!("node 0x{:x}: shift {shift}, slot {offset}", entry & !internal_node);
        node = node.member_dereference("slots")?.subscript(offset)?;
    }

    Ok(node)
}
