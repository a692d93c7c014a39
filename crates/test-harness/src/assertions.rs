//! Assertion helpers with diagnostic output.
//!
//! Failures carry expected vs actual and, where it helps, the body's
//! health so a broken reference shows up next to the number that moved.

use brep_kernel::{Kernel, KernelIntrospect};
use feature_engine::{HealthReport, HealthStatus, SolidSignature};

use crate::helpers::HarnessError;
use crate::oracle::OracleVerdict;
use crate::workflow::ModelBuilder;

fn describe_health(report: &HealthReport) -> String {
    report
        .features
        .iter()
        .map(|f| {
            let mark = match f.status {
                HealthStatus::Ok => "ok",
                HealthStatus::Broken => "BROKEN",
            };
            format!("{} ({}): {mark}", f.name, f.feature_type)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Turn failed verdicts into one error listing all of them.
pub fn assert_all_passed(verdicts: &[OracleVerdict], ctx: &str) -> Result<(), HarnessError> {
    let failed: Vec<String> = verdicts
        .iter()
        .filter(|v| !v.passed)
        .map(|v| format!("{}: {}", v.oracle_name, v.detail))
        .collect();
    if failed.is_empty() {
        Ok(())
    } else {
        Err(HarnessError::AssertionFailed {
            detail: format!("[{ctx}] {} checks failed: {}", failed.len(), failed.join("; ")),
        })
    }
}

/// Two signatures match within `tolerance`.
pub fn assert_signature_eq(
    expected: &SolidSignature,
    actual: &SolidSignature,
    tolerance: f64,
    ctx: &str,
) -> Result<(), HarnessError> {
    if expected.approx_eq(actual, tolerance) {
        Ok(())
    } else {
        Err(HarnessError::AssertionFailed {
            detail: format!("[{ctx}] expected {expected:?}, got {actual:?}"),
        })
    }
}

impl<K: Kernel + KernelIntrospect> ModelBuilder<K> {
    pub fn assert_volume(&self, expected: f64, tolerance: f64, ctx: &str) -> Result<(), HarnessError> {
        let actual = self.volume()?;
        if (actual - expected).abs() <= tolerance {
            Ok(())
        } else {
            Err(HarnessError::AssertionFailed {
                detail: format!(
                    "[{ctx}] volume: expected {expected:.4}, got {actual:.4} (tol={tolerance}). Health: {}",
                    describe_health(&self.health()?),
                ),
            })
        }
    }

    /// Exact face and edge counts of the body's solid.
    pub fn assert_counts(&self, faces: usize, edges: usize, ctx: &str) -> Result<(), HarnessError> {
        let sig = self.signature()?;
        if sig.face_count == faces && sig.edge_count == edges {
            Ok(())
        } else {
            Err(HarnessError::AssertionFailed {
                detail: format!(
                    "[{ctx}] expected F={faces} E={edges}, got F={} E={}",
                    sig.face_count, sig.edge_count,
                ),
            })
        }
    }

    /// No feature broken, no reference fell back to a positional index.
    pub fn assert_healthy(&self, ctx: &str) -> Result<(), HarnessError> {
        let report = self.health()?;
        if report.is_healthy() && report.broken_total() == 0 {
            Ok(())
        } else {
            Err(HarnessError::AssertionFailed {
                detail: format!("[{ctx}] unhealthy body: {}", describe_health(&report)),
            })
        }
    }

    /// Feature names and types in history order.
    pub fn assert_history(&self, expected: &[(&str, &str)], ctx: &str) -> Result<(), HarnessError> {
        let actual: Vec<(String, String)> = self
            .doc
            .body(self.body_id())
            .map(|b| {
                b.features
                    .iter()
                    .map(|f| (f.name.clone(), f.kind.type_name().to_string()))
                    .collect()
            })
            .unwrap_or_default();
        let matches = actual.len() == expected.len()
            && actual
                .iter()
                .zip(expected)
                .all(|((an, at), (en, et))| an == en && at == et);
        if matches {
            Ok(())
        } else {
            Err(HarnessError::AssertionFailed {
                detail: format!("[{ctx}] expected history {expected:?}, got {actual:?}"),
            })
        }
    }
}
