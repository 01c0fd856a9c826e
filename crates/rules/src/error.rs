//! Errors raised while flattening aggregations and building signals.

use tripwire_core::TripwireError;

/// Errors that abort a threshold transformation.
///
/// None of these yield a partial signal set: the whole call fails.
#[derive(Debug, thiserror::Error)]
pub enum ThresholdError {
    /// A nested aggregation expected below a non-leaf bucket is absent.
    #[error("Unable to parse aggregation: missing '{name}' at depth {depth}")]
    AggregationShape { depth: usize, name: String },

    /// An aggregation node exists but does not have the bucket shape.
    #[error("Malformed aggregation '{name}': {source}")]
    MalformedAggregation {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    /// A leaf bucket lacks a metric the rule requires.
    #[error("Leaf bucket '{key}' is missing the '{metric}' metric")]
    MissingMetric { metric: &'static str, key: String },

    /// A bucket key is not a scalar value.
    #[error("Invalid bucket key: {0}")]
    BucketKey(#[from] TripwireError),
}

/// Result alias for threshold operations.
pub type Result<T> = std::result::Result<T, ThresholdError>;
