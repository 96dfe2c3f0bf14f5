//! Memory maps and address blocks.

use serde::{Deserialize, Serialize};

use crate::array::RegisterArray;
use crate::register::Register;

/// Usage tag of an address block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Usage {
    #[default]
    Register,
    Memory,
    Reserved,
}

impl Usage {
    pub fn as_str(self) -> &'static str {
        match self {
            Usage::Register => "register",
            Usage::Memory => "memory",
            Usage::Reserved => "reserved",
        }
    }
}

/// A contiguous, named sub-region of a memory map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AddressBlock {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Base offset in bytes within the memory map.
    pub base_offset: u64,
    /// Size in bytes.
    pub size: u64,
    #[serde(default)]
    pub usage: Usage,
    /// Fully expanded registers, in resolution order.
    #[serde(default)]
    pub registers: Vec<Register>,
    /// Array templates the expanded registers were produced from.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arrays: Vec<RegisterArray>,
}

impl AddressBlock {
    /// Byte offset one past the block.
    pub fn end(&self) -> u64 {
        self.base_offset.saturating_add(self.size)
    }

    /// Look up a register by (expanded) name.
    pub fn register(&self, name: &str) -> Option<&Register> {
        self.registers.iter().find(|r| r.name == name)
    }

    /// Look up a register array template by name.
    pub fn array(&self, name: &str) -> Option<&RegisterArray> {
        self.arrays.iter().find(|a| a.name == name)
    }
}

/// A named address space made of address blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MemoryMap {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub blocks: Vec<AddressBlock>,
}

impl MemoryMap {
    /// Look up a block by name.
    pub fn block(&self, name: &str) -> Option<&AddressBlock> {
        self.blocks.iter().find(|b| b.name == name)
    }

    /// Total bytes covered by the map's blocks, ignoring gaps and overlaps.
    pub fn total_size(&self) -> u64 {
        self.blocks.iter().map(|b| b.size).sum()
    }
}
