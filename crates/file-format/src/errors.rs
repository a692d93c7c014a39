/// Errors during project file loading.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LoadError {
    #[error("failed to parse file: {0}")]
    ParseError(String),

    #[error("unknown file format: {0}")]
    UnknownFormat(String),

    #[error("file version {file_version} is newer than supported version {supported_version}")]
    FutureVersion {
        file_version: u32,
        supported_version: u32,
    },

    #[error("migration failed from version {from} to {to}: {reason}")]
    MigrationFailed { from: u32, to: u32, reason: String },

    #[error("invalid document: {0}")]
    InvalidDocument(String),
}

/// Errors during project file saving.
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("failed to serialize project: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors during mesh export.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExportError {
    #[error("mesh has no triangles")]
    EmptyMesh,

    #[error("index {index} out of range (vertex count = {vertex_count})")]
    IndexOutOfRange { index: u32, vertex_count: usize },

    #[error("export cancelled")]
    Cancelled,

    #[error("export failed: {0}")]
    Failed(String),

    #[error("export worker stopped unexpectedly")]
    WorkerLost,
}
