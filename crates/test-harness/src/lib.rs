//! Test harness for scripted modeling sessions.
//!
//! Drives a real document through named steps, checks the result after
//! each one and produces readable diagnostics.
//!
//! # Key Components
//!
//! - [`ModelBuilder`]: fluent API for building and verifying models
//! - [`oracle`]: verification functions returning pass/fail verdicts
//! - [`report`]: structured text model descriptions
//! - [`helpers`]: face and edge pickers, mesh math
//! - [`assertions`]: assertion helpers with diagnostics

pub mod assertions;
pub mod helpers;
pub mod oracle;
pub mod report;
pub mod workflow;

pub use helpers::HarnessError;
pub use oracle::OracleVerdict;
pub use report::ModelReport;
pub use workflow::ModelBuilder;
