//! Rewrites a threshold search response into a response of signal hits.
//!
//! The engine's `aggregations` block is consumed and not carried forward;
//! the hit list becomes the flattened signals and the total becomes their
//! count.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::flatten::BucketFlattener;
use crate::schema::ThresholdSpec;
use crate::signal::{SignalBuilder, SignalHit};

/// Raw search response as returned by the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub took: u64,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(default)]
    pub hits: SearchHits,
    #[serde(default)]
    pub aggregations: Option<Map<String, Value>>,
    /// `_shards` and anything else the engine adds.
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchHits {
    #[serde(default)]
    pub total: Option<Value>,
    #[serde(default)]
    pub hits: Vec<Value>,
}

/// Search response whose hits are threshold signals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignalSearchResponse {
    pub took: u64,
    pub timed_out: bool,
    pub hits: SignalHits,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignalHits {
    /// Number of signals, replacing the engine's own total.
    pub total: usize,
    pub hits: Vec<SignalHit>,
}

/// Flatten the response's threshold aggregation and wrap each combination
/// as a signal hit indexed under `input_index`.
///
/// A response without aggregations produces no hits.
pub fn transform_threshold_results_to_ecs(
    response: SearchResponse,
    input_index: &str,
    started_at: DateTime<Utc>,
    from: DateTime<Utc>,
    spec: &ThresholdSpec,
    rule_id: &str,
) -> Result<SignalSearchResponse> {
    let hits = match &response.aggregations {
        Some(aggregations) => {
            let records = BucketFlattener::new(spec).flatten(aggregations)?;
            SignalBuilder::new(rule_id, started_at, from, &spec.fields, input_index)
                .build_all(records)
                .into_iter()
                .map(|envelope| envelope.into_hit())
                .collect()
        }
        None => Vec::new(),
    };

    tracing::info!(rule_id, signals = hits.len(), "transformed threshold results");

    Ok(SignalSearchResponse {
        took: response.took,
        timed_out: response.timed_out,
        hits: SignalHits {
            total: hits.len(),
            hits,
        },
        rest: response.rest,
    })
}
