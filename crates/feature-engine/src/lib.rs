//! Parametric feature histories over a BREP kernel.
//!
//! A [`Document`] holds bodies, each an ordered list of [`Feature`]s. Each
//! feature is applied in a transaction: its references are resolved
//! against the current solid, the modeling operation runs, the result is
//! health-checked, and only then are the new shapes registered. Undo,
//! edits and project loading replay histories with [`rebuild_body`].

pub mod config;
pub mod document;
pub mod feature;
pub mod health;
pub mod rebuild;
pub mod resolve;
pub mod transaction;
pub mod types;
pub mod undo;

pub use config::{EngineConfig, LocalModifierLimits};
pub use document::{Body, Document};
pub use feature::{Applied, ApplyContext, ModelingFeature};
pub use health::{
    check_local_modifier_scale, get_health_report, has_transaction_regression, FeatureHealth,
    HealthReport, HealthStatus, PreState, SolidSignature,
};
pub use rebuild::{rebuild_body, RebuildOutcome};
pub use resolve::{resolve_reference, ResolutionStats, ResolvedVia};
pub use transaction::{run_feature, BodySnapshot, TransactionState};
pub use types::*;
pub use undo::{Command, UndoStack};
