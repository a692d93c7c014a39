use feature_engine::{Body, Document, Feature};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::SaveError;
use crate::metadata::ProjectMetadata;

/// Format identifier written to every project file.
pub const FORMAT_ID: &str = "tnp-cad";

/// Current file format version.
pub const FORMAT_VERSION: u32 = 1;

/// One body's persisted history. Solids and shape ids are never stored;
/// loading replays the features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyData {
    pub id: Uuid,
    pub name: String,
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentData {
    pub bodies: Vec<BodyData>,
    #[serde(default)]
    pub active_body: Option<Uuid>,
}

impl DocumentData {
    pub fn from_document(doc: &Document) -> Self {
        Self {
            bodies: doc
                .bodies
                .iter()
                .map(|b| BodyData {
                    id: b.id,
                    name: b.name.clone(),
                    features: b.features.clone(),
                })
                .collect(),
            active_body: doc.active_body,
        }
    }

    /// Unbuilt bodies, ready for [`Document::from_bodies`].
    pub fn into_bodies(self) -> (Vec<Body>, Option<Uuid>) {
        let bodies = self
            .bodies
            .into_iter()
            .map(|b| Body::with_features(b.id, b.name, b.features))
            .collect();
        (bodies, self.active_body)
    }
}

/// The top-level file structure.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectFile<'a> {
    /// Format identifier.
    pub format: &'static str,
    /// Format version number.
    pub version: u32,
    pub project: &'a ProjectMetadata,
    /// The parametric recipe.
    pub document: DocumentData,
}

/// Serialize a document to a pretty-printed JSON string.
pub fn save_project(doc: &Document, metadata: &ProjectMetadata) -> Result<String, SaveError> {
    let file = ProjectFile {
        format: FORMAT_ID,
        version: FORMAT_VERSION,
        project: metadata,
        document: DocumentData::from_document(doc),
    };
    Ok(serde_json::to_string_pretty(&file)?)
}
