//! Access policies for registers and bit fields.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The read/write contract of a register or bit field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessPolicy {
    ReadOnly,
    /// Write-only; writes act as a pulse and reads have no defined value.
    WriteOnly,
    ReadWrite,
    /// Writing a 1 clears the bit; reads are not defined.
    #[serde(rename = "write-1-to-clear")]
    WriteOneToClear,
    /// Readable status bits that are cleared by writing a 1.
    #[serde(rename = "read-write-1-to-clear")]
    ReadWriteOneToClear,
}

/// An access string that does not name any known policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAccessPolicy(pub String);

impl fmt::Display for UnknownAccessPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognized access policy '{}'", self.0)
    }
}

impl std::error::Error for UnknownAccessPolicy {}

impl AccessPolicy {
    /// All policies in declaration order.
    pub const ALL: [AccessPolicy; 5] = [
        AccessPolicy::ReadOnly,
        AccessPolicy::WriteOnly,
        AccessPolicy::ReadWrite,
        AccessPolicy::WriteOneToClear,
        AccessPolicy::ReadWriteOneToClear,
    ];

    /// Canonical spelling used in documents and diagnostics.
    pub fn as_str(self) -> &'static str {
        match self {
            AccessPolicy::ReadOnly => "read-only",
            AccessPolicy::WriteOnly => "write-only",
            AccessPolicy::ReadWrite => "read-write",
            AccessPolicy::WriteOneToClear => "write-1-to-clear",
            AccessPolicy::ReadWriteOneToClear => "read-write-1-to-clear",
        }
    }

    /// Whether a read has defined semantics under this policy.
    pub fn is_readable(self) -> bool {
        matches!(
            self,
            AccessPolicy::ReadOnly | AccessPolicy::ReadWrite | AccessPolicy::ReadWriteOneToClear
        )
    }

    /// Whether software may write under this policy.
    pub fn is_writable(self) -> bool {
        !matches!(self, AccessPolicy::ReadOnly)
    }

    /// Whether a written 1 clears the bit instead of setting it.
    pub fn clears_on_one(self) -> bool {
        matches!(
            self,
            AccessPolicy::WriteOneToClear | AccessPolicy::ReadWriteOneToClear
        )
    }
}

impl fmt::Display for AccessPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessPolicy {
    type Err = UnknownAccessPolicy;

    /// Case-insensitive; `_` and `-` are interchangeable.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace('_', "-");
        let policy = match key.as_str() {
            "read-only" | "readonly" | "ro" => AccessPolicy::ReadOnly,
            "write-only" | "writeonly" | "wo" => AccessPolicy::WriteOnly,
            "read-write" | "readwrite" | "rw" => AccessPolicy::ReadWrite,
            "write-1-to-clear" | "w1c" => AccessPolicy::WriteOneToClear,
            "read-write-1-to-clear" | "rw1c" => AccessPolicy::ReadWriteOneToClear,
            _ => return Err(UnknownAccessPolicy(s.to_string())),
        };
        Ok(policy)
    }
}
