//! Invariant validation for canonical register-space models.
//!
//! The validator never fails: it walks the whole model and returns every
//! violation it finds as data, so tooling can present all problems at once.

pub mod report;
pub mod validate;
pub mod violation;

pub use report::{ReportSummary, ValidationReport};
pub use validate::{overlapping_pairs, validate};
pub use violation::{Severity, Violation, ViolationKind};
