//! Project files and mesh export.
//!
//! A project file stores only the parametric recipe: bodies and their
//! feature histories. Kernel handles and shape ids are session state, so
//! opening a project replays every body to rebuild them.

pub mod errors;
pub mod export;
pub mod load;
pub mod metadata;
pub mod migrate;
pub mod save;

pub use errors::{ExportError, LoadError, SaveError};
pub use export::{
    spawn_stl_export, spawn_stl_export_with_cancel, write_binary_stl, ExportEvent, ExportJob,
};
pub use load::{load_project, open_project, OpenedProject};
pub use metadata::ProjectMetadata;
pub use save::{save_project, BodyData, DocumentData, FORMAT_ID, FORMAT_VERSION};
