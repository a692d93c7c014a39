use modeling_ops::{execute_transform, KernelBundle};
use shape_naming::ShapeRegistry;
use tnp_types::FeatureStatus;
use tracing::debug;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::document::{Body, Document};
use crate::rebuild::rebuild_body;
use crate::types::{EngineError, Feature, FeatureKind};

/// A reversible command recorded by the document.
#[derive(Debug, Clone)]
pub enum Command {
    AddFeature {
        body_id: Uuid,
        feature: Box<Feature>,
    },
    RemoveFeature {
        body_id: Uuid,
        feature: Box<Feature>,
    },
    EditFeature {
        body_id: Uuid,
        feature_id: Uuid,
        old_kind: Box<FeatureKind>,
        new_kind: Box<FeatureKind>,
    },
}

/// Two-stack undo/redo history.
#[derive(Debug)]
pub struct UndoStack {
    undo: Vec<Command>,
    redo: Vec<Command>,
}

impl UndoStack {
    pub fn new() -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
        }
    }

    /// Push a command onto the undo stack, clearing the redo stack.
    pub fn push(&mut self, cmd: Command) {
        self.undo.push(cmd);
        self.redo.clear();
    }

    /// Push a command onto the undo stack without clearing redo.
    /// Used by `redo()` to re-populate the undo stack.
    pub fn push_undo_only(&mut self, cmd: Command) {
        self.undo.push(cmd);
    }

    pub fn pop_undo(&mut self) -> Option<Command> {
        self.undo.pop()
    }

    pub fn push_redo(&mut self, cmd: Command) {
        self.redo.push(cmd);
    }

    pub fn pop_redo(&mut self) -> Option<Command> {
        self.redo.pop()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn can_undo(&self) -> bool {
        self.undo.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.undo.can_redo()
    }

    /// Revert the most recent command. A command that cannot be reverted
    /// stays on the undo stack.
    pub fn undo(&mut self, kb: &mut dyn KernelBundle) -> Result<(), EngineError> {
        let cmd = self.undo.pop_undo().ok_or(EngineError::NothingToUndo)?;
        let result = match &cmd {
            Command::AddFeature { body_id, feature } => {
                self.pop_feature(kb, *body_id, Some(feature.id)).map(|_| ())
            }
            Command::RemoveFeature { body_id, feature } => self
                .append_feature(kb, *body_id, (**feature).clone())
                .map(|_| ()),
            Command::EditFeature {
                body_id,
                feature_id,
                old_kind,
                ..
            } => self
                .replace_kind(kb, *body_id, *feature_id, (**old_kind).clone())
                .map(|_| ()),
        };
        match result {
            Ok(()) => {
                self.undo.push_redo(cmd);
                Ok(())
            }
            Err(err) => {
                self.undo.push_undo_only(cmd);
                Err(err)
            }
        }
    }

    /// Re-apply the most recently undone command.
    pub fn redo(&mut self, kb: &mut dyn KernelBundle) -> Result<(), EngineError> {
        let cmd = self.undo.pop_redo().ok_or(EngineError::NothingToRedo)?;
        let result = match &cmd {
            Command::AddFeature { body_id, feature } => self
                .append_feature(kb, *body_id, (**feature).clone())
                .map(|_| ()),
            Command::RemoveFeature { body_id, feature } => {
                self.pop_feature(kb, *body_id, Some(feature.id)).map(|_| ())
            }
            Command::EditFeature {
                body_id,
                feature_id,
                new_kind,
                ..
            } => self
                .replace_kind(kb, *body_id, *feature_id, (**new_kind).clone())
                .map(|_| ()),
        };
        match result {
            Ok(()) => {
                self.undo.push_undo_only(cmd);
                Ok(())
            }
            Err(err) => {
                self.undo.push_redo(cmd);
                Err(err)
            }
        }
    }

    /// Remove the last feature of a body. `expected` guards against the
    /// history having changed underneath an undo command.
    pub(crate) fn pop_feature(
        &mut self,
        kb: &mut dyn KernelBundle,
        body_id: Uuid,
        expected: Option<Uuid>,
    ) -> Result<Feature, EngineError> {
        let config: EngineConfig = self.config;
        let (body, registry) = self.parts(body_id)?;
        let last = body.features.last().ok_or(EngineError::EmptyBody { id: body_id })?;
        if let Some(id) = expected {
            if last.id != id {
                return Err(EngineError::FeatureNotFound { id });
            }
        }

        let feature = body
            .features
            .pop()
            .ok_or(EngineError::EmptyBody { id: body_id })?;
        registry.invalidate_feature(feature.id);
        if !invert_transform(kb, registry, body, &feature) {
            rebuild_body(kb, registry, body, &config);
        }
        Ok(feature)
    }
}

/// Undo a trailing transform by applying its inverse to the current solid
/// instead of replaying the history. `false` means a replay is needed.
fn invert_transform(
    kb: &mut dyn KernelBundle,
    registry: &mut ShapeRegistry,
    body: &mut Body,
    removed: &Feature,
) -> bool {
    let FeatureKind::Transform { transform } = &removed.kind else {
        return false;
    };
    if removed.status != FeatureStatus::Ok {
        return false;
    }
    let (Some(inverse), Some(solid)) = (transform.inverse(), body.solid.clone()) else {
        return false;
    };
    let Some(owner) = body
        .features
        .iter()
        .rev()
        .find(|f| f.status == FeatureStatus::Ok)
        .map(|f| f.id)
    else {
        return false;
    };

    let result = match execute_transform(kb, &solid, &inverse) {
        Ok(result) => result,
        Err(err) => {
            debug!(%err, "inverse transform failed, replaying");
            return false;
        }
    };
    match registry.register_solid(kb.as_introspect(), &result.handle, owner) {
        Ok(shape_map) => {
            body.solid = Some(result.handle);
            body.shape_map = shape_map;
            body.generation += 1;
            body.mesh_generation += 1;
            debug!(transform = inverse.kind_name(), "undid transform by inverse");
            true
        }
        Err(err) => {
            debug!(%err, "re-registering inverted solid failed, replaying");
            false
        }
    }
}
