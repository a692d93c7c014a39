//! Kernel operation wrappers.
//!
//! Each `execute_*` validates its parameters, calls the kernel, and returns
//! an [`OpResult`] carrying the new solid plus lineage: the kernel's own
//! history when it reports one, otherwise a history derived by diffing
//! topology snapshots taken before and after the call.

pub mod boolean;
pub mod chamfer;
pub mod diff;
pub mod extrude;
pub mod fillet;
pub mod kernel_ext;
pub mod pattern;
pub mod primitive;
pub mod push_pull;
pub mod shell;
pub mod transform;
pub mod types;

pub use boolean::{execute_boolean, execute_combine, BooleanKind};
pub use chamfer::execute_chamfer;
pub use diff::{edge_similarity, face_similarity, snapshot, TopoSnapshot};
pub use extrude::{execute_extrude, execute_loft, execute_sweep};
pub use fillet::execute_fillet;
pub use kernel_ext::KernelBundle;
pub use pattern::execute_pattern;
pub use primitive::{execute_box, execute_cylinder};
pub use push_pull::execute_push_pull;
pub use shell::execute_shell;
pub use transform::{execute_split, execute_transform};
pub use types::*;
