//! Threshold signal construction: deterministic ids, ECS-style source
//! merge with reserved-namespace protection, and the `threshold_result`
//! summary block.

mod builder;
mod envelope;
mod id;

pub use builder::SignalBuilder;
pub use envelope::{
    is_mergeable_field, SignalEnvelope, SignalHit, SignalSource, ThresholdResult,
    RESERVED_PREFIXES, THRESHOLD_RESULT_FIELD, TIMESTAMP_FIELD,
};
pub use id::{calculate_threshold_signal_id, combination_key};
