//! Canonical register-space model.
//!
//! The canonical model is the fully resolved, immutable tree produced by a
//! resolution pass:
//!
//! ```text
//! CanonicalModel
//! ├── memory_maps: Vec<MemoryMap>
//! │   └── blocks: Vec<AddressBlock>
//! │       ├── registers: Vec<Register>        # fully expanded
//! │       │   └── fields: Vec<BitField>
//! │       └── arrays: Vec<RegisterArray>      # templates, for indexed access
//! ├── clocks / resets: Vec<Clock> / Vec<Reset>
//! └── bus_interfaces: Vec<BusInterface>       # clock/reset/map by name only
//! ```
//!
//! Everything is owned by value. Cross-references between siblings are
//! [`NamedRef`] keys resolved through the model's symbol table.

pub mod access;
pub mod array;
pub mod block;
pub mod hash;
pub mod interface;
pub mod model;
pub mod register;

pub use access::{AccessPolicy, UnknownAccessPolicy};
pub use array::{expand_pattern, ArrayDescriptor, ArrayInstance, RegisterArray, INDEX_PLACEHOLDER};
pub use block::{AddressBlock, MemoryMap, Usage};
pub use hash::{content_hash, hash_hex, ContentHash};
pub use interface::{
    BusInterface, Clock, EntityKind, InterfaceMode, NamedRef, Reset, ResetPolarity, Resolution,
};
pub use model::{BlockEntry, CanonicalModel, FieldEntry, RegisterEntry};
pub use register::{low_mask, BitField, Register};
