//! Raw document access: section splitting, shape detection, typed lookups.
//!
//! Documents are read into untyped YAML values first so that both supported
//! shapes can be recognized before any structure is assumed. [`Node`] wraps
//! a value with the dotted path used in error messages.

use serde::Deserialize;
use serde_yaml::Value;

use crate::error::{ResolveError, Result};

/// The document layouts the normalizer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentShape {
    /// Root is a list of memory maps, or a mapping with `memoryMaps`.
    Current,
    /// One or more sections with `memoryMap` / `registerTemplates`.
    Legacy,
}

/// Split a YAML stream into its non-empty documents ("sections").
pub fn parse_sections(text: &str) -> Result<Vec<Value>> {
    let mut sections = Vec::new();
    for document in serde_yaml::Deserializer::from_str(text) {
        let value = Value::deserialize(document)?;
        if !value.is_null() {
            sections.push(value);
        }
    }
    Ok(sections)
}

const LEGACY_KEYS: [&str; 2] = ["memoryMap", "registerTemplates"];

/// Keys a legacy section may carry.
const SECTION_KEYS: [&str; 5] = [
    "memoryMap",
    "registerTemplates",
    "clocks",
    "resets",
    "busInterfaces",
];

/// Decide which shape a set of sections uses.
pub fn detect_shape(sections: &[Value]) -> Result<DocumentShape> {
    match sections {
        [] => Err(ResolveError::schema("<root>", "document is empty")),
        [Value::Sequence(_)] => Ok(DocumentShape::Current),
        [single @ Value::Mapping(_)] => {
            if single.get("memoryMaps").is_some() {
                Ok(DocumentShape::Current)
            } else if LEGACY_KEYS.iter().any(|k| single.get(*k).is_some()) {
                Ok(DocumentShape::Legacy)
            } else {
                Err(ResolveError::schema(
                    "<root>",
                    "unrecognized document shape: expected `memoryMaps`, `memoryMap` or `registerTemplates`",
                ))
            }
        }
        [_] => Err(ResolveError::schema(
            "<root>",
            "root must be a mapping or a sequence of memory maps",
        )),
        many => {
            for (i, section) in many.iter().enumerate() {
                let path = format!("<section {i}>");
                if !section.is_mapping() {
                    return Err(ResolveError::schema(
                        path,
                        "every section of a multi-section document must be a mapping",
                    ));
                }
                if section.get("memoryMaps").is_some() {
                    return Err(ResolveError::schema(
                        path,
                        "`memoryMaps` must be the only section; multi-section documents use `memoryMap`",
                    ));
                }
                if !SECTION_KEYS.iter().any(|k| section.get(*k).is_some()) {
                    return Err(ResolveError::schema(
                        path,
                        "section has none of `memoryMap`, `registerTemplates`, `clocks`, `resets`, `busInterfaces`",
                    ));
                }
            }
            if !many
                .iter()
                .any(|s| LEGACY_KEYS.iter().any(|k| s.get(*k).is_some()))
            {
                return Err(ResolveError::schema(
                    "<root>",
                    "no section declares `memoryMap` or `registerTemplates`",
                ));
            }
            Ok(DocumentShape::Legacy)
        }
    }
}

/// Parse an unsigned numeric literal: decimal, `0x` hex, `0o` octal or `0b`
/// binary, with optional `_` separators.
pub fn parse_literal(text: &str) -> std::result::Result<u64, String> {
    let cleaned: String = text.trim().chars().filter(|c| *c != '_').collect();
    if cleaned.is_empty() {
        return Err("empty numeric literal".into());
    }
    if cleaned.starts_with('-') {
        return Err(format!("negative value '{text}' is not allowed"));
    }
    let lower = cleaned.to_ascii_lowercase();
    let (digits, radix) = if let Some(hex) = lower.strip_prefix("0x") {
        (hex, 16)
    } else if let Some(bin) = lower.strip_prefix("0b") {
        (bin, 2)
    } else if let Some(oct) = lower.strip_prefix("0o") {
        (oct, 8)
    } else {
        (lower.as_str(), 10)
    };
    u64::from_str_radix(digits, radix).map_err(|_| format!("malformed numeric literal '{text}'"))
}

/// A YAML value plus its location in the document.
#[derive(Debug, Clone)]
pub struct Node<'a> {
    value: &'a Value,
    path: String,
}

impl<'a> Node<'a> {
    pub fn root(value: &'a Value, path: impl Into<String>) -> Self {
        Self {
            value,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn value(&self) -> &'a Value {
        self.value
    }

    /// The same value under a different path (e.g. once its name is known).
    pub fn renamed(&self, path: impl Into<String>) -> Self {
        Self {
            value: self.value,
            path: path.into(),
        }
    }

    pub fn is_mapping(&self) -> bool {
        self.value.is_mapping()
    }

    /// Fail unless this node is a mapping.
    pub fn expect_mapping(&self, what: &str) -> Result<()> {
        if self.value.is_mapping() {
            Ok(())
        } else {
            Err(ResolveError::schema(
                &self.path,
                format!("{what} must be a mapping"),
            ))
        }
    }

    /// A non-null child value.
    pub fn child(&self, key: &str) -> Option<Node<'a>> {
        match self.value.get(key) {
            Some(Value::Null) | None => None,
            Some(value) => Some(Node {
                value,
                path: format!("{}.{key}", self.path),
            }),
        }
    }

    /// The first present child among alias keys.
    pub fn child_any(&self, keys: &[&str]) -> Option<Node<'a>> {
        keys.iter().find_map(|k| self.child(k))
    }

    pub fn has(&self, key: &str) -> bool {
        self.child(key).is_some()
    }

    pub fn require(&self, key: &str) -> Result<Node<'a>> {
        self.child(key).ok_or_else(|| {
            ResolveError::schema(&self.path, format!("missing required key `{key}`"))
        })
    }

    /// String keys of a mapping, in document order.
    pub fn keys(&self) -> Vec<&'a str> {
        match self.value {
            Value::Mapping(mapping) => mapping.keys().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    pub fn as_str(&self) -> Result<&'a str> {
        self.value.as_str().ok_or_else(|| {
            ResolveError::schema(&self.path, "expected a string")
        })
    }

    pub fn as_u64(&self) -> Result<u64> {
        match self.value {
            Value::Number(n) => {
                if let Some(v) = n.as_u64() {
                    Ok(v)
                } else if n.as_i64().is_some() {
                    Err(ResolveError::format(
                        &self.path,
                        format!("negative value {n} is not allowed"),
                    ))
                } else {
                    Err(ResolveError::format(
                        &self.path,
                        format!("expected an integer, found {n}"),
                    ))
                }
            }
            Value::String(s) => {
                parse_literal(s).map_err(|detail| ResolveError::format(&self.path, detail))
            }
            _ => Err(ResolveError::schema(&self.path, "expected an integer")),
        }
    }

    pub fn as_u32(&self) -> Result<u32> {
        let value = self.as_u64()?;
        u32::try_from(value)
            .map_err(|_| ResolveError::format(&self.path, format!("value {value} is too large")))
    }

    /// Elements of a sequence, each with an indexed path.
    pub fn as_seq(&self) -> Result<Vec<Node<'a>>> {
        match self.value {
            Value::Sequence(items) => Ok(items
                .iter()
                .enumerate()
                .map(|(i, value)| Node {
                    value,
                    path: format!("{}[{i}]", self.path),
                })
                .collect()),
            _ => Err(ResolveError::schema(&self.path, "expected a sequence")),
        }
    }

    /// A sequence, or a single mapping treated as a one-element sequence.
    pub fn as_seq_or_one(&self) -> Result<Vec<Node<'a>>> {
        if self.value.is_mapping() {
            Ok(vec![self.clone()])
        } else {
            self.as_seq()
        }
    }

    /// Entries of a mapping with string keys.
    pub fn entries(&self) -> Result<Vec<(&'a str, Node<'a>)>> {
        let Value::Mapping(mapping) = self.value else {
            return Err(ResolveError::schema(&self.path, "expected a mapping"));
        };
        mapping
            .iter()
            .map(|(k, value)| {
                let key = k.as_str().ok_or_else(|| {
                    ResolveError::schema(&self.path, "mapping keys must be strings")
                })?;
                Ok((
                    key,
                    Node {
                        value,
                        path: format!("{}.{key}", self.path),
                    },
                ))
            })
            .collect()
    }

    /// The required `name` key.
    pub fn name(&self) -> Result<String> {
        Ok(self.require("name")?.as_str()?.to_string())
    }

    pub fn opt_str(&self, key: &str) -> Result<Option<String>> {
        self.child(key)
            .map(|n| n.as_str().map(str::to_string))
            .transpose()
    }

    pub fn opt_u64(&self, keys: &[&str]) -> Result<Option<u64>> {
        self.child_any(keys).map(|n| n.as_u64()).transpose()
    }

    pub fn opt_u32(&self, keys: &[&str]) -> Result<Option<u32>> {
        self.child_any(keys).map(|n| n.as_u32()).transpose()
    }
}
