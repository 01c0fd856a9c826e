//! YAML DSL schema types with serde deserialization.
//!
//! - `CommonMetadata`: id, name, tags, enabled flag
//! - `ThresholdRule`: threshold detection rules grouped on one or more fields
//! - `ThresholdSpec`: the normalized grouping spec used at execution time

mod kind;
mod metadata;
mod threshold;

pub use kind::*;
pub use metadata::*;
pub use threshold::*;
