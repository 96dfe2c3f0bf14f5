//! Register-space document resolution.
//!
//! A resolution pass runs three stages, each on the output of the last:
//! - **Normalization:** both document shapes into one intermediate tree
//! - **Bit-field resolution:** `[msb:lsb]` ranges and auto-placed fields
//! - **Array expansion:** register and interface arrays into instances
//!
//! Structural problems abort the pass with a [`ResolveError`]. Semantic
//! problems (overlaps, dangling references) are left for the validator.

pub mod bits;
pub mod document;
pub mod error;
pub mod expand;
pub mod normalize;
pub mod options;
pub mod resolve;

pub use bits::{parse_bit_range, BitRangeError, FieldPlacer};
pub use document::{detect_shape, parse_literal, parse_sections, DocumentShape};
pub use error::{ResolveError, Result};
pub use expand::ResolutionContext;
pub use normalize::{normalize, NormalizedDocument};
pub use options::ResolveOptions;
pub use resolve::{load_document, resolve_documents, resolve_file, resolve_str};
