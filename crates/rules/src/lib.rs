//! Threshold rule signal generation.
//!
//! This crate provides:
//! - YAML-based threshold rule definitions and a filesystem loader
//! - Flattening of nested threshold aggregations into leaf combinations
//! - Deterministic, content-derived signal ids and ECS-style signal sources
//! - Bulk creation of signals through a pluggable sink

pub mod aggregation;
pub mod bulk;
pub mod error;
pub mod flatten;
pub mod loader;
pub mod schema;
pub mod signal;
pub mod transform;

pub use error::{Result, ThresholdError};
pub use flatten::{BucketFlattener, CardinalityTerm, CombinationRecord};
pub use signal::{SignalBuilder, SignalEnvelope, SignalHit};
pub use transform::transform_threshold_results_to_ecs;
