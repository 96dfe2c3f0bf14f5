//! Validation report with summary counts.

use std::fmt;

use regspace_model::CanonicalModel;
use serde::Serialize;

use crate::validate::validate;
use crate::violation::{Severity, Violation};

/// Summary counts for a validation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ReportSummary {
    pub memory_maps: usize,
    pub blocks: usize,
    pub registers: usize,
    pub fields: usize,
    pub errors: usize,
    pub warnings: usize,
}

/// The complete validation report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ValidationReport {
    pub valid: bool,
    pub summary: ReportSummary,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    /// Validate `model` and summarize the outcome.
    pub fn build(model: &CanonicalModel) -> Self {
        let (valid, violations) = validate(model);
        let count = |severity: Severity| violations.iter().filter(|v| v.severity == severity).count();
        let summary = ReportSummary {
            memory_maps: model.memory_maps().len(),
            blocks: model.blocks().count(),
            registers: model.registers().count(),
            fields: model.fields().count(),
            errors: count(Severity::Error),
            warnings: count(Severity::Warning),
        };
        Self {
            valid,
            summary,
            violations,
        }
    }

    pub fn has_warnings(&self) -> bool {
        self.summary.warnings > 0
    }

    /// Whether the report should fail a run, optionally treating warnings
    /// as errors.
    pub fn fails(&self, deny_warnings: bool) -> bool {
        !self.valid || (deny_warnings && self.has_warnings())
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Validation Report ===")?;
        writeln!(
            f,
            "Maps: {} | Blocks: {} | Registers: {} | Fields: {} | Errors: {} | Warnings: {}",
            self.summary.memory_maps,
            self.summary.blocks,
            self.summary.registers,
            self.summary.fields,
            self.summary.errors,
            self.summary.warnings,
        )?;

        if self.violations.is_empty() {
            writeln!(f, "No violations.")?;
        } else {
            writeln!(f, "--- Violations ---")?;
            for v in &self.violations {
                writeln!(f, "{v}")?;
                for related in &v.related {
                    writeln!(f, "  See: {related}")?;
                }
            }
        }
        Ok(())
    }
}
