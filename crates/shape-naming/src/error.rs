use brep_kernel::{KernelError, KernelId};

use crate::registry::ShapeId;

/// Errors from naming and registration.
#[derive(Debug, Clone, thiserror::Error)]
pub enum NamingError {
    #[error("geometry of {id:?} unavailable: {source}")]
    Geometry {
        id: KernelId,
        #[source]
        source: KernelError,
    },

    #[error("unknown shape id {0:?}")]
    UnknownShape(ShapeId),
}
