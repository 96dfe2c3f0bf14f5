//! `regspace.toml` manifest parsing and project configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use regspace_schema::ResolveOptions;
use serde::{Deserialize, Serialize};

pub const MANIFEST_FILE: &str = "regspace.toml";

/// The top-level manifest structure for a regspace project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegspaceManifest {
    /// Project metadata (required).
    pub project: ProjectConfig,
    /// Resolution defaults.
    #[serde(default)]
    pub resolve: ResolveOptions,
    /// Validation settings.
    #[serde(default)]
    pub validate: ValidateConfig,
}

/// Project metadata section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name (required).
    pub name: String,
    /// Documents to process when none is given on the command line,
    /// relative to the manifest directory.
    #[serde(default)]
    pub documents: Vec<String>,
}

/// Validation configuration section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ValidateConfig {
    /// Fail on warnings as well as errors.
    #[serde(default)]
    pub deny_warnings: bool,
}

impl RegspaceManifest {
    /// Search upward from `start_dir` for a `regspace.toml` file, parse and
    /// return it along with the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(MANIFEST_FILE);
            if candidate.is_file() {
                let content = std::fs::read_to_string(&candidate)
                    .with_context(|| format!("reading {}", candidate.display()))?;
                let manifest: RegspaceManifest = toml::from_str(&content)
                    .with_context(|| format!("parsing {}", candidate.display()))?;
                tracing::debug!(path = %candidate.display(), "loaded manifest");
                return Ok(Some((manifest, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    /// Parse a manifest from a TOML string.
    #[cfg(test)]
    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing regspace.toml")
    }

    /// Manifest documents as paths under `project_dir`.
    pub fn document_paths(&self, project_dir: &Path) -> Vec<PathBuf> {
        self.project
            .documents
            .iter()
            .map(|d| project_dir.join(d))
            .collect()
    }
}
