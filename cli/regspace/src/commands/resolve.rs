//! `regspace resolve`: dump the canonical model.

use std::path::Path;

use anyhow::{bail, Result};
use regspace_model::CanonicalModel;
use regspace_schema::ResolveOptions;

use super::load_model;

/// Serialize a model in the requested format (`json` or `yaml`).
pub fn render(model: &CanonicalModel, format: Option<&str>) -> Result<String> {
    match format {
        Some("json") | None => Ok(serde_json::to_string_pretty(model)? + "\n"),
        Some("yaml") => Ok(serde_yaml::to_string(model)?),
        Some(other) => bail!("unknown output format: '{other}'. Choose: json, yaml"),
    }
}

pub fn run(document: &Path, options: &ResolveOptions, format: Option<&str>) -> Result<()> {
    let model = load_model(document, options)?;
    print!("{}", render(&model, format)?);
    Ok(())
}
