//! Register handles and on-demand array instances.

use regspace_model::{BitField, CanonicalModel, Register, RegisterArray};

use crate::error::{Result, RuntimeError};

/// A resolved register: its definition plus absolute address.
///
/// Handles own their register, so instance registers computed from an
/// array template need no backing storage in the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterHandle {
    path: String,
    address: u64,
    register: Register,
}

impl RegisterHandle {
    /// Look up `map.block.register` or `block.register`.
    pub fn lookup(model: &CanonicalModel, path: &str) -> Result<Self> {
        let entry = model
            .find_register(path)
            .ok_or_else(|| RuntimeError::UnknownRegister {
                path: path.to_string(),
            })?;
        Ok(Self {
            path: entry.path(),
            address: entry.address(),
            register: entry.register.clone(),
        })
    }

    /// A handle for a register that is not looked up in a model.
    pub fn from_parts(path: impl Into<String>, address: u64, register: Register) -> Self {
        Self {
            path: path.into(),
            address,
            register,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn address(&self) -> u64 {
        self.address
    }

    pub fn register(&self) -> &Register {
        &self.register
    }

    pub(crate) fn field(&self, name: &str) -> Result<&BitField> {
        self.register
            .field(name)
            .ok_or_else(|| RuntimeError::UnknownField {
                path: self.path.clone(),
                field: name.to_string(),
            })
    }
}

/// One instance of a register array, bounds-checked on creation.
#[derive(Debug, Clone)]
pub struct ArrayInstanceRef<'m> {
    block_path: String,
    block_base: u64,
    array: &'m RegisterArray,
    index: u64,
}

impl<'m> ArrayInstanceRef<'m> {
    /// Find the array at `map.block.array` or `block.array` and select
    /// instance `index` (0-based, below `count`).
    pub fn lookup(model: &'m CanonicalModel, path: &str, index: u64) -> Result<Self> {
        let unknown = || RuntimeError::UnknownArray {
            path: path.to_string(),
        };
        let (block_path, name) = path.rsplit_once('.').ok_or_else(unknown)?;
        let entry = model.find_block(block_path).ok_or_else(unknown)?;
        let array = entry.block.array(name).ok_or_else(unknown)?;
        if !array.descriptor.contains(index) {
            return Err(RuntimeError::IndexOutOfRange {
                path: path.to_string(),
                index,
                count: array.descriptor.count,
            });
        }
        Ok(Self {
            block_path: entry.path(),
            block_base: entry.block.base_offset,
            array,
            index,
        })
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    /// Logical index, counting from the array's `indexStart`.
    pub fn logical_index(&self) -> u64 {
        self.array.descriptor.index_of(self.index)
    }

    /// Absolute base address of this instance.
    pub fn base_address(&self) -> u64 {
        self.block_base
            .saturating_add(self.array.instance_offset(self.index))
    }

    /// Compute the handle for template register `name` in this instance.
    pub fn register(&self, name: &str) -> Result<RegisterHandle> {
        let register = self
            .array
            .instance_register(self.index, name)
            .ok_or_else(|| RuntimeError::UnknownRegister {
                path: format!("{}.{}[{}].{name}", self.block_path, self.array.name, self.index),
            })?;
        Ok(RegisterHandle {
            path: format!("{}.{}", self.block_path, register.name),
            address: self.block_base.saturating_add(register.offset),
            register,
        })
    }

    /// Handles for every register of this instance, in declaration order.
    pub fn registers(&self) -> Vec<RegisterHandle> {
        self.array
            .instance(self.index)
            .unwrap_or_default()
            .into_iter()
            .map(|register| RegisterHandle {
                path: format!("{}.{}", self.block_path, register.name),
                address: self.block_base.saturating_add(register.offset),
                register,
            })
            .collect()
    }
}
