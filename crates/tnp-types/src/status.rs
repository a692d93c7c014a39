use serde::{Deserialize, Serialize};

/// Outcome of the last application of a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FeatureStatus {
    Ok,
    Error,
}

impl Default for FeatureStatus {
    fn default() -> Self {
        FeatureStatus::Ok
    }
}

/// Machine-readable reason attached to a feature status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusDetails {
    pub code: String,
    pub detail: String,
}

impl StatusDetails {
    pub fn new(code: &str, detail: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            detail: detail.into(),
        }
    }

    /// Whether the code names a geometry-drift rollback.
    pub fn is_drift(&self) -> bool {
        status_codes::DRIFT_CODES.contains(&self.code.as_str())
    }
}

/// Known `StatusDetails::code` values.
pub mod status_codes {
    pub const REFERENCE_UNRESOLVED: &str = "reference_unresolved";
    pub const KERNEL_OPERATION_FAILED: &str = "kernel_operation_failed";
    pub const INVALID_PARAMETER: &str = "invalid_parameter";
    pub const TRANSACTION_REGRESSION: &str = "transaction_regression";
    pub const LOCAL_MODIFIER_SCALE_DRIFT: &str = "local_modifier_scale_drift";
    pub const SELF_HEAL_ROLLBACK_GEOMETRY_DRIFT: &str = "self_heal_rollback_geometry_drift";

    /// Codes that always mark a feature as broken in a health report.
    pub const DRIFT_CODES: &[&str] = &[
        TRANSACTION_REGRESSION,
        LOCAL_MODIFIER_SCALE_DRIFT,
        SELF_HEAL_ROLLBACK_GEOMETRY_DRIFT,
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drift_codes_are_recognized() {
        let d = StatusDetails::new(status_codes::SELF_HEAL_ROLLBACK_GEOMETRY_DRIFT, "rolled back");
        assert!(d.is_drift());
        let d = StatusDetails::new(status_codes::KERNEL_OPERATION_FAILED, "boom");
        assert!(!d.is_drift());
    }

    #[test]
    fn status_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&FeatureStatus::Ok).unwrap(), "\"OK\"");
        assert_eq!(
            serde_json::to_string(&FeatureStatus::Error).unwrap(),
            "\"ERROR\""
        );
    }
}
