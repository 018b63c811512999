//! # Kernel Structure Helpers
//!
//! Walk Linux kernel data structures through an [`ObjectSource`].
//!
//! Each helper supports more than one kernel layout. The newer layout is
//! tried first; when one of its members or types does not exist (a
//! lookup-class error), the helper falls back to the older layout. Any other
//! error aborts the walk.
//!
//! | Helper | Newer layout | Older layout |
//! |--------|--------------|--------------|
//! | [`radix_tree_lookup`] | XArray (`xa_head`, v4.20) | radix tree (`rnode`) |
//! | [`idr_find`] | `idr_base` (v4.16) | no base |
//! | [`find_pid`] | `pid_namespace.idr` (v4.15) | `pid_hash` scan |
//! | [`pid_task`] | `pid_links[]` (v4.19) | `pids[].node` |
//!
//! [`ObjectSource`]: crate::object::ObjectSource

mod idr;
mod pid;
mod radix_tree;

pub use idr::idr_find;
pub use pid::{find_pid, find_task, pid_task};
pub use radix_tree::radix_tree_lookup;
