//! Error types for resolving register-space documents.

use std::path::PathBuf;

/// Structural errors that abort a resolution pass.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// Malformed or unrecognized document shape, or a missing required key.
    #[error("schema error at {path}: {detail}")]
    Schema { path: String, detail: String },

    /// Malformed bit-range notation or numeric literal.
    #[error("format error at {path}: {detail}")]
    Format { path: String, detail: String },

    /// YAML parse error.
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// I/O error reading a document.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Document file not found.
    #[error("document not found: {}", path.display())]
    NotFound { path: PathBuf },
}

impl ResolveError {
    pub(crate) fn schema(path: impl Into<String>, detail: impl Into<String>) -> Self {
        ResolveError::Schema {
            path: path.into(),
            detail: detail.into(),
        }
    }

    pub(crate) fn format(path: impl Into<String>, detail: impl Into<String>) -> Self {
        ResolveError::Format {
            path: path.into(),
            detail: detail.into(),
        }
    }

    /// Whether this is a schema-shape error.
    pub fn is_schema(&self) -> bool {
        matches!(self, ResolveError::Schema { .. })
    }

    /// Whether this is a bit-range or literal format error.
    pub fn is_format(&self) -> bool {
        matches!(self, ResolveError::Format { .. })
    }
}

/// Result type for resolution operations.
pub type Result<T> = std::result::Result<T, ResolveError>;
