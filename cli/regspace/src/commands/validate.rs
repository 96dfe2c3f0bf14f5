//! `regspace validate`: check a document's invariants.

use std::path::Path;

use anyhow::{bail, Result};
use regspace_schema::ResolveOptions;
use regspace_verify::ValidationReport;

use super::load_model;

/// Validate a document, printing the report. Fails on errors, and on
/// warnings when `deny_warnings` is set.
pub fn run(
    document: &Path,
    options: &ResolveOptions,
    report_format: Option<&str>,
    deny_warnings: bool,
) -> Result<()> {
    let model = load_model(document, options)?;
    let report = ValidationReport::build(&model);

    match report_format {
        Some("json") => println!("{}", serde_json::to_string_pretty(&report)?),
        Some("human") | None => print!("{report}"),
        Some(other) => bail!("unknown report format: '{other}'. Choose: human, json"),
    }

    if report.fails(deny_warnings) {
        bail!(
            "validation failed for {}: {} error(s), {} warning(s)",
            document.display(),
            report.summary.errors,
            report.summary.warnings
        );
    }
    Ok(())
}
