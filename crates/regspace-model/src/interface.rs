//! Clocks, resets, bus interfaces and the named references between them.

use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::array::ArrayInstance;

/// Kinds of entity a [`NamedRef`] may point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    Clock,
    Reset,
    MemoryMap,
    BusInterface,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntityKind::Clock => "clock",
            EntityKind::Reset => "reset",
            EntityKind::MemoryMap => "memory map",
            EntityKind::BusInterface => "bus interface",
        };
        f.write_str(s)
    }
}

/// Outcome of resolving a [`NamedRef`] against a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved,
    /// No entity of any kind has this name.
    Missing,
    /// The name exists, but only as entities of other kinds.
    WrongKind(Vec<EntityKind>),
}

/// A weak, name-only reference to another entity in the model.
///
/// The referenced entity is never owned. Whether it exists is computed on
/// first use and cached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedRef {
    pub kind: EntityKind,
    pub name: String,
    #[serde(skip)]
    resolved: OnceLock<bool>,
}

impl NamedRef {
    pub fn new(kind: EntityKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            resolved: OnceLock::new(),
        }
    }

    /// Cached presence check; `resolve` is only called the first time.
    pub fn is_present_with(&self, resolve: impl FnOnce(&NamedRef) -> bool) -> bool {
        *self.resolved.get_or_init(|| resolve(self))
    }
}

impl PartialEq for NamedRef {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.name == other.name
    }
}

impl Eq for NamedRef {}

/// A clock source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Clock {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_hz: Option<u64>,
}

/// Polarity of a reset signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResetPolarity {
    ActiveHigh,
    #[default]
    ActiveLow,
}

/// A reset signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Reset {
    pub name: String,
    #[serde(default)]
    pub polarity: ResetPolarity,
}

/// Direction of a bus interface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InterfaceMode {
    #[default]
    Slave,
    Master,
}

/// A bus interface exposing a memory map, after array expansion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BusInterface {
    /// Logical interface name.
    pub name: String,
    /// Prefix used for the interface's physical signal names.
    pub physical_prefix: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(default)]
    pub mode: InterfaceMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_address: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<ArrayInstance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clock: Option<NamedRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset: Option<NamedRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_map: Option<NamedRef>,
}

impl BusInterface {
    /// The interface's cross-references, in clock, reset, memory-map order.
    pub fn references(&self) -> impl Iterator<Item = &NamedRef> {
        [&self.clock, &self.reset, &self.memory_map]
            .into_iter()
            .flatten()
    }
}
