//! Violation records produced by the validator.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Severity level for violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Warning => write!(f, "WARN"),
        }
    }
}

/// What invariant a violation breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViolationKind {
    /// Two fields of one register share bits.
    FieldOverlap,
    /// A field reaches past its register's width.
    FieldBounds,
    /// Two registers of one block share bytes.
    RegisterOverlap,
    /// Two blocks of one memory map share addresses.
    BlockOverlap,
    /// A reset value does not fit its field or register.
    ResetRange,
    /// A reference names nothing that is declared.
    DanglingReference,
    /// A reference names an entity of another kind.
    ReferenceKindMismatch,
    /// A register is not aligned to its own width.
    Alignment,
    /// Two siblings share a name.
    DuplicateName,
    /// An array's stride is smaller than one instance.
    ArrayStride,
}

impl ViolationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ViolationKind::FieldOverlap => "field-overlap",
            ViolationKind::FieldBounds => "field-bounds",
            ViolationKind::RegisterOverlap => "register-overlap",
            ViolationKind::BlockOverlap => "block-overlap",
            ViolationKind::ResetRange => "reset-range",
            ViolationKind::DanglingReference => "dangling-reference",
            ViolationKind::ReferenceKindMismatch => "reference-kind-mismatch",
            ViolationKind::Alignment => "alignment",
            ViolationKind::DuplicateName => "duplicate-name",
            ViolationKind::ArrayStride => "array-stride",
        }
    }

    /// Referential-integrity kinds.
    pub fn is_reference(self) -> bool {
        matches!(
            self,
            ViolationKind::DanglingReference | ViolationKind::ReferenceKindMismatch
        )
    }

    pub fn default_severity(self) -> Severity {
        match self {
            ViolationKind::Alignment => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One broken invariant, located by dotted path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Violation {
    pub kind: ViolationKind,
    pub severity: Severity,
    pub message: String,
    /// Path of the offending entity, e.g. `soc.uart.CTRL.MODE`.
    pub path: String,
    /// Paths of the other entities involved, if any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related: Vec<String>,
}

impl Violation {
    pub fn new(kind: ViolationKind, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            message: message.into(),
            path: path.into(),
            related: Vec::new(),
        }
    }

    pub fn with_related(mut self, related: impl Into<String>) -> Self {
        self.related.push(related.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} at {}: {}", self.severity, self.kind, self.path, self.message)
    }
}
