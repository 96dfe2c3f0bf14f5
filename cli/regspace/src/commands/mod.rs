//! CLI command implementations.

pub mod fingerprint;
pub mod inspect;
pub mod resolve;
pub mod validate;

use std::path::Path;

use anyhow::{Context, Result};
use regspace_model::CanonicalModel;
use regspace_schema::{resolve_file, ResolveOptions};

/// Resolve one document, attaching its path to any error.
pub fn load_model(path: &Path, options: &ResolveOptions) -> Result<CanonicalModel> {
    resolve_file(path, options).with_context(|| format!("resolving {}", path.display()))
}
