//! Runtime error types.

use std::fmt;

use regspace_model::AccessPolicy;

/// The kind of access an operation attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Write,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Read => write!(f, "read"),
            Operation::Write => write!(f, "write"),
        }
    }
}

/// Errors reported by a bus transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The transaction completed with an error response.
    #[error("bus fault at {address:#x}: {detail}")]
    Fault { address: u64, detail: String },

    /// The transport shut down before the transaction completed.
    #[error("transaction at {address:#x} was dropped before completion")]
    Disconnected { address: u64 },
}

/// Errors from register and field operations.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// The access policy forbids the operation. Raised before any bus
    /// transaction.
    #[error("{operation} of {} denied by {policy} access", target(path, field.as_deref()))]
    AccessViolation {
        path: String,
        field: Option<String>,
        policy: AccessPolicy,
        operation: Operation,
    },

    /// No register at this path.
    #[error("unknown register '{path}'")]
    UnknownRegister { path: String },

    /// No register array at this path.
    #[error("unknown register array '{path}'")]
    UnknownArray { path: String },

    /// The register has no field of this name.
    #[error("register '{path}' has no field '{field}'")]
    UnknownField { path: String, field: String },

    /// Array instance index past `count`.
    #[error("index {index} out of range for array '{path}' with {count} instances")]
    IndexOutOfRange { path: String, index: u64, count: u64 },

    /// A value wider than its field or register.
    #[error("value {value:#x} does not fit in {width} bits of {path}")]
    ValueOutOfRange { path: String, value: u64, width: u32 },

    /// Transport failure, passed through unchanged.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

fn target(path: &str, field: Option<&str>) -> String {
    match field {
        Some(field) => format!("field '{path}.{field}'"),
        None => format!("register '{path}'"),
    }
}

impl RuntimeError {
    pub fn is_access_violation(&self) -> bool {
        matches!(self, RuntimeError::AccessViolation { .. })
    }
}

/// Result type for runtime operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;
