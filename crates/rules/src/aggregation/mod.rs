//! Read-only model of the nested bucket tree returned by the search engine.
//!
//! Each level is a terms aggregation over one grouping field. Leaf buckets
//! additionally carry `min_timestamp`/`max_timestamp` metrics and, when the
//! rule has a cardinality condition, a `cardinality_count` metric. Child
//! nodes are looked up by the names in [`AggregationNames`].

mod names;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, ThresholdError};

pub use names::AggregationNames;

/// One named bucket collection at a single tree level.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggregationNode {
    #[serde(default)]
    pub buckets: Vec<Bucket>,
}

/// One group within an [`AggregationNode`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bucket {
    pub key: Value,
    pub doc_count: u64,
    #[serde(default)]
    pub cardinality_count: Option<CardinalityMetric>,
    #[serde(default)]
    pub min_timestamp: Option<TimestampMetric>,
    #[serde(default)]
    pub max_timestamp: Option<TimestampMetric>,
    /// Everything else in the bucket, including nested aggregation nodes.
    #[serde(flatten)]
    pub sub_aggregations: Map<String, Value>,
}

/// Distinct-count metric.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CardinalityMetric {
    pub value: u64,
}

/// Min/max metric over the event timestamp field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimestampMetric {
    /// Epoch milliseconds; null when the bucket saw no timestamped events.
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub value_as_string: Option<String>,
}

impl TimestampMetric {
    /// Timestamp as an RFC 3339 string, preferring the engine's own rendering.
    pub fn as_timestamp(&self) -> Option<String> {
        if let Some(s) = &self.value_as_string {
            return Some(s.clone());
        }
        let millis = self.value?;
        DateTime::<Utc>::from_timestamp_millis(millis as i64)
            .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

/// Look up and decode the node `name` inside an aggregation container.
///
/// `Ok(None)` means the node is absent; a present node that is not a bucket
/// collection is an error.
pub fn find_node(container: &Map<String, Value>, name: &str) -> Result<Option<AggregationNode>> {
    match container.get(name) {
        None => Ok(None),
        Some(raw) => AggregationNode::deserialize(raw)
            .map(Some)
            .map_err(|source| ThresholdError::MalformedAggregation {
                name: name.to_string(),
                source,
            }),
    }
}

impl Bucket {
    /// Decode the nested node `name` beneath this bucket.
    pub fn child(&self, name: &str) -> Result<Option<AggregationNode>> {
        find_node(&self.sub_aggregations, name)
    }

    /// Bucket key rendered for error messages.
    pub(crate) fn key_label(&self) -> String {
        match &self.key {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bucket_keeps_nested_nodes_in_sub_aggregations() {
        let bucket: Bucket = serde_json::from_value(json!({
            "key": "a",
            "doc_count": 3,
            "threshold_1:user.name": {
                "buckets": [{"key": "x", "doc_count": 3}]
            }
        }))
        .unwrap();

        assert_eq!(bucket.doc_count, 3);
        assert!(bucket.max_timestamp.is_none());
        let child = bucket.child("threshold_1:user.name").unwrap().unwrap();
        assert_eq!(child.buckets.len(), 1);
        assert_eq!(child.buckets[0].key, json!("x"));
        assert!(bucket.child("threshold_1:other").unwrap().is_none());
    }

    #[test]
    fn malformed_child_is_an_error() {
        let bucket: Bucket = serde_json::from_value(json!({
            "key": "a",
            "doc_count": 1,
            "threshold_1:user.name": {"buckets": "nope"}
        }))
        .unwrap();

        let err = bucket.child("threshold_1:user.name").unwrap_err();
        assert!(matches!(err, ThresholdError::MalformedAggregation { .. }));
    }

    #[test]
    fn timestamp_prefers_engine_string() {
        let metric = TimestampMetric {
            value: Some(0.0),
            value_as_string: Some("2021-01-01T00:00:00.000Z".into()),
        };
        assert_eq!(metric.as_timestamp().as_deref(), Some("2021-01-01T00:00:00.000Z"));
    }

    #[test]
    fn timestamp_falls_back_to_epoch_millis() {
        let metric = TimestampMetric {
            value: Some(1_609_459_200_000.0),
            value_as_string: None,
        };
        assert_eq!(metric.as_timestamp().as_deref(), Some("2021-01-01T00:00:00.000Z"));

        let empty = TimestampMetric { value: None, value_as_string: None };
        assert!(empty.as_timestamp().is_none());
    }
}
