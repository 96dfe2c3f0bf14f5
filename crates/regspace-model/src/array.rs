//! Array descriptors and on-demand instance computation.
//!
//! A [`RegisterArray`] keeps its template registers once. Instance `i` is a
//! pure function of the template and the index, so the resolver (which
//! expands every instance into the block) and the runtime (which computes a
//! single instance on demand) always agree on names and offsets.

use serde::{Deserialize, Serialize};

use crate::register::Register;

/// Placeholder substituted with the instance index in naming templates.
pub const INDEX_PLACEHOLDER: &str = "{index}";

/// Substitute `index` into `pattern`, appending it when the placeholder is absent.
pub fn expand_pattern(pattern: &str, index: u64) -> String {
    if pattern.contains(INDEX_PLACEHOLDER) {
        pattern.replace(INDEX_PLACEHOLDER, &index.to_string())
    } else {
        format!("{pattern}{index}")
    }
}

/// Replication parameters shared by register arrays and interface arrays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ArrayDescriptor {
    /// Number of instances, at least 1.
    pub count: u64,
    /// Bytes between consecutive instances.
    pub stride: u64,
    /// Index of the first instance as used in names.
    #[serde(default)]
    pub index_start: u64,
    /// Logical naming template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub naming: Option<String>,
    /// Physical prefix template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

impl ArrayDescriptor {
    /// Logical index of instance `i` (the value substituted into names).
    pub fn index_of(&self, i: u64) -> u64 {
        self.index_start.saturating_add(i)
    }

    /// Byte offset of instance `i` from the array base.
    pub fn offset_of(&self, i: u64) -> u64 {
        i.saturating_mul(self.stride)
    }

    /// Whether `i` names an existing instance.
    pub fn contains(&self, i: u64) -> bool {
        i < self.count
    }
}

/// Records which array instance a materialized entity came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ArrayInstance {
    pub array: String,
    /// Logical index (`index_start + i`).
    pub index: u64,
}

/// A register array: template registers replicated `count` times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RegisterArray {
    pub name: String,
    /// Byte offset of instance 0 within the block.
    pub offset: u64,
    pub descriptor: ArrayDescriptor,
    /// Template registers with offsets relative to an instance base.
    pub registers: Vec<Register>,
}

impl RegisterArray {
    /// Bytes covered by one instance of the template.
    pub fn span(&self) -> u64 {
        self.registers.iter().map(Register::end).max().unwrap_or(0)
    }

    /// Byte offset one past the last instance.
    pub fn end(&self) -> u64 {
        self.offset
            .saturating_add(self.descriptor.offset_of(self.descriptor.count))
    }

    /// Name prefix shared by the registers of instance `i`.
    pub fn instance_prefix(&self, i: u64) -> String {
        let index = self.descriptor.index_of(i);
        match &self.descriptor.naming {
            Some(pattern) => expand_pattern(pattern, index),
            None => format!("{}_{index}", self.name),
        }
    }

    /// Byte offset of instance `i` within the block.
    pub fn instance_offset(&self, i: u64) -> u64 {
        self.offset.saturating_add(self.descriptor.offset_of(i))
    }

    /// Materialize template register `template` for instance `i`.
    fn materialize(&self, i: u64, template: &Register) -> Register {
        let mut register = template.clone();
        register.name = format!("{}_{}", self.instance_prefix(i), template.name);
        register.offset = self.instance_offset(i).saturating_add(template.offset);
        register.instance = Some(ArrayInstance {
            array: self.name.clone(),
            index: self.descriptor.index_of(i),
        });
        register
    }

    /// All registers of instance `i`, in template declaration order.
    /// Returns `None` when `i >= count`.
    pub fn instance(&self, i: u64) -> Option<Vec<Register>> {
        if !self.descriptor.contains(i) {
            return None;
        }
        Some(
            self.registers
                .iter()
                .map(|template| self.materialize(i, template))
                .collect(),
        )
    }

    /// A single register of instance `i`, looked up by its template name.
    pub fn instance_register(&self, i: u64, name: &str) -> Option<Register> {
        if !self.descriptor.contains(i) {
            return None;
        }
        self.registers
            .iter()
            .find(|r| r.name == name)
            .map(|template| self.materialize(i, template))
    }

    /// Every instance, index-ascending then declaration order.
    pub fn expand(&self) -> Vec<Register> {
        (0..self.descriptor.count)
            .flat_map(|i| self.instance(i).unwrap_or_default())
            .collect()
    }
}
