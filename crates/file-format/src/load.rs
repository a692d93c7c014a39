use std::collections::BTreeSet;

use feature_engine::{Document, EngineConfig, RebuildOutcome};
use modeling_ops::KernelBundle;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::LoadError;
use crate::metadata::ProjectMetadata;
use crate::save::{DocumentData, FORMAT_ID, FORMAT_VERSION};

/// The top-level file structure for deserialization.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectFileRaw {
    pub format: String,
    pub version: u32,
    pub project: ProjectMetadata,
    pub document: DocumentData,
}

/// Deserialize a project from a JSON string.
///
/// Validates the format identifier, the version and the document's ids.
/// Nothing is rebuilt; see [`open_project`].
pub fn load_project(json: &str) -> Result<(DocumentData, ProjectMetadata), LoadError> {
    let raw: ProjectFileRaw =
        serde_json::from_str(json).map_err(|e| LoadError::ParseError(e.to_string()))?;

    if raw.format != FORMAT_ID {
        return Err(LoadError::UnknownFormat(raw.format));
    }

    if raw.version > FORMAT_VERSION {
        return Err(LoadError::FutureVersion {
            file_version: raw.version,
            supported_version: FORMAT_VERSION,
        });
    }

    let document = if raw.version < FORMAT_VERSION {
        crate::migrate::migrate(raw.document, raw.version, FORMAT_VERSION)?
    } else {
        raw.document
    };
    validate(&document)?;

    Ok((document, raw.project))
}

fn validate(document: &DocumentData) -> Result<(), LoadError> {
    let mut body_ids = BTreeSet::new();
    let mut feature_ids = BTreeSet::new();
    for body in &document.bodies {
        if !body_ids.insert(body.id) {
            return Err(LoadError::InvalidDocument(format!("duplicate body id {}", body.id)));
        }
        for feature in &body.features {
            if !feature_ids.insert(feature.id) {
                return Err(LoadError::InvalidDocument(format!(
                    "duplicate feature id {}",
                    feature.id
                )));
            }
        }
    }
    if let Some(active) = document.active_body {
        if !body_ids.contains(&active) {
            return Err(LoadError::InvalidDocument(format!(
                "active body {active} does not exist"
            )));
        }
    }
    Ok(())
}

/// A loaded and rebuilt project.
#[derive(Debug)]
pub struct OpenedProject {
    pub document: Document,
    pub metadata: ProjectMetadata,
    /// Replay result per body, in document order.
    pub rebuilds: Vec<(Uuid, RebuildOutcome)>,
}

impl OpenedProject {
    /// Whether every feature of every body replayed cleanly.
    pub fn is_clean(&self) -> bool {
        self.rebuilds.iter().all(|(_, o)| o.failed.is_empty())
    }
}

/// Load a project and replay every body against `kb`. The naming
/// registry starts empty and is repopulated by the replay.
pub fn open_project(
    json: &str,
    kb: &mut dyn KernelBundle,
    config: EngineConfig,
) -> Result<OpenedProject, LoadError> {
    let (data, metadata) = load_project(json)?;
    let (bodies, active_body) = data.into_bodies();
    let mut document = Document::from_bodies(bodies, active_body, config);
    let rebuilds = document.rebuild_all(kb);

    let failed: usize = rebuilds.iter().map(|(_, o)| o.failed.len()).sum();
    if failed > 0 {
        warn!(project = %metadata.name, failed, "project replayed with failing features");
    } else {
        info!(project = %metadata.name, bodies = rebuilds.len(), "project opened");
    }

    Ok(OpenedProject {
        document,
        metadata,
        rebuilds,
    })
}
