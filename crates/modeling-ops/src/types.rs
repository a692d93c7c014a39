use brep_kernel::{KernelError, KernelSolidHandle, ShapeHistory};
use serde::{Deserialize, Serialize};

/// Complete result of a modeling operation.
/// Contains everything feature-engine needs to update the body and keep
/// the naming registry's lineage current.
#[derive(Debug, Clone)]
pub struct OpResult {
    /// Handle to the produced solid. Runtime-only, not persisted.
    pub handle: KernelSolidHandle,
    /// Lineage from the input solid(s) to `handle`.
    pub history: ShapeHistory,
    /// Whether `history` came from the kernel or from a topology diff.
    pub history_source: HistorySource,
    /// Non-fatal warnings and timing information.
    pub diagnostics: Diagnostics,
}

impl OpResult {
    pub(crate) fn from_kernel(handle: KernelSolidHandle, history: ShapeHistory, ms: f64) -> Self {
        Self {
            handle,
            history,
            history_source: HistorySource::Kernel,
            diagnostics: Diagnostics::timed(ms),
        }
    }

    pub(crate) fn derived(handle: KernelSolidHandle, history: ShapeHistory, ms: f64) -> Self {
        Self {
            handle,
            history,
            history_source: HistorySource::Derived,
            diagnostics: Diagnostics::timed(ms),
        }
    }

    /// The kernel's own history, if it reported one.
    pub fn kernel_history(&self) -> Option<&ShapeHistory> {
        match self.history_source {
            HistorySource::Kernel => Some(&self.history),
            HistorySource::Derived => None,
        }
    }
}

/// Where an operation's lineage came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistorySource {
    /// Reported by the kernel alongside the result.
    Kernel,
    /// Reconstructed by diffing topology snapshots.
    Derived,
}

/// Non-fatal diagnostics from an operation.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    /// Warning messages.
    pub warnings: Vec<String>,
    /// Time taken for the kernel operation, in milliseconds.
    pub kernel_time_ms: f64,
}

impl Diagnostics {
    fn timed(ms: f64) -> Self {
        Self {
            warnings: Vec::new(),
            kernel_time_ms: ms,
        }
    }
}

/// Copy layout for pattern operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PatternSpec {
    /// `count` instances (the original included) spaced along `direction`.
    Linear {
        direction: [f64; 3],
        spacing: f64,
        count: u32,
    },
    /// `count` instances about an axis. A full turn (2π) spaces them evenly
    /// without doubling the first; a partial `angle` puts the last
    /// instance exactly at `angle`.
    Circular {
        axis_origin: [f64; 3],
        axis_dir: [f64; 3],
        count: u32,
        angle: f64,
    },
}

/// Errors from modeling operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OpError {
    #[error("kernel error: {0}")]
    Kernel(#[from] KernelError),

    #[error("invalid parameter: {reason}")]
    InvalidParameter { reason: String },

    #[error("no {what} selected")]
    EmptySelection { what: String },
}

impl OpError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        OpError::InvalidParameter {
            reason: reason.into(),
        }
    }

    pub(crate) fn empty(what: &str) -> Self {
        OpError::EmptySelection {
            what: what.to_string(),
        }
    }
}
