//! The resolution pass: load, normalize, expand.

use std::path::Path;

use regspace_model::CanonicalModel;
use serde_yaml::Value;

use crate::document::parse_sections;
use crate::error::{ResolveError, Result};
use crate::expand::{expand_interface, ResolutionContext};
use crate::normalize::normalize;
use crate::options::ResolveOptions;

/// Read a document file into its YAML sections.
///
/// JSON documents go through the same parser, JSON being a YAML subset.
pub fn load_document(path: &Path) -> Result<Vec<Value>> {
    if !path.exists() {
        return Err(ResolveError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let text = std::fs::read_to_string(path)?;
    tracing::debug!(path = %path.display(), bytes = text.len(), "loaded document");
    parse_sections(&text)
}

/// Resolve already-parsed sections into a canonical model.
pub fn resolve_documents(sections: &[Value], options: &ResolveOptions) -> Result<CanonicalModel> {
    let doc = normalize(sections, options)?;
    let ctx = ResolutionContext::new(options, &doc.templates);

    let memory_maps = doc
        .maps
        .iter()
        .map(|map| ctx.expand_map(map))
        .collect::<Result<Vec<_>>>()?;
    let bus_interfaces = doc.interfaces.iter().flat_map(expand_interface).collect();

    let model = CanonicalModel::new(memory_maps, doc.clocks, doc.resets, bus_interfaces);
    tracing::debug!(
        maps = model.memory_maps().len(),
        registers = model.registers().count(),
        interfaces = model.bus_interfaces().len(),
        "resolved canonical model"
    );
    Ok(model)
}

/// Resolve a document held in memory.
pub fn resolve_str(text: &str, options: &ResolveOptions) -> Result<CanonicalModel> {
    resolve_documents(&parse_sections(text)?, options)
}

/// Resolve a document file.
pub fn resolve_file(path: &Path, options: &ResolveOptions) -> Result<CanonicalModel> {
    resolve_documents(&load_document(path)?, options)
}
