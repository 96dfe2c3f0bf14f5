//! Resolution defaults, loadable from the `[resolve]` manifest section.

use regspace_model::AccessPolicy;
use serde::{Deserialize, Serialize};

/// Defaults applied while normalizing a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ResolveOptions {
    /// Register width in bits when `size` is omitted.
    pub default_register_size: u32,
    /// Register access when `access` is omitted.
    pub default_access: AccessPolicy,
    /// Lower bound for an inferred block size when the block has registers.
    pub min_block_size: u64,
    /// Inferred size of a block without registers.
    pub empty_block_size: u64,
    /// Largest `count` accepted on a register or interface array.
    pub max_array_count: u64,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            default_register_size: 32,
            default_access: AccessPolicy::ReadWrite,
            min_block_size: 64,
            empty_block_size: 4096,
            max_array_count: 65_536,
        }
    }
}
