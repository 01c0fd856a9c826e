//! Flattening of the nested threshold aggregation tree.
//!
//! The tree has one level per grouping field, outer field first. Every leaf
//! bucket becomes one [`CombinationRecord`] whose terms list the bucket key
//! at each level on the path from the root. Records come out depth-first in
//! the engine's bucket order, so the outer field varies slowest.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tripwire_core::{FieldValue, Term};

use crate::aggregation::{find_node, AggregationNames, AggregationNode, Bucket};
use crate::error::{Result, ThresholdError};
use crate::schema::ThresholdSpec;

/// Distinct-value count measured for the rule's cardinality field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CardinalityTerm {
    pub field: String,
    pub value: u64,
}

/// One leaf group of the aggregation tree.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinationRecord {
    /// One term per grouping field, outer to inner.
    pub terms: Vec<Term>,
    pub cardinality: Option<CardinalityTerm>,
    pub min_timestamp: Option<String>,
    pub max_timestamp: String,
    pub doc_count: u64,
}

/// Walks a threshold aggregation tree for one [`ThresholdSpec`].
pub struct BucketFlattener<'a> {
    spec: &'a ThresholdSpec,
    names: AggregationNames,
}

impl<'a> BucketFlattener<'a> {
    pub fn new(spec: &'a ThresholdSpec) -> Self {
        Self {
            spec,
            names: AggregationNames::new(&spec.fields),
        }
    }

    /// Flatten the engine's top-level `aggregations` object.
    ///
    /// A missing root node or a root with no buckets yields no records. A
    /// missing nested node below a non-leaf bucket fails the whole call.
    pub fn flatten(&self, aggregations: &Map<String, Value>) -> Result<Vec<CombinationRecord>> {
        let Some(root_name) = self.names.at(0) else {
            return Ok(Vec::new());
        };
        let Some(root) = find_node(aggregations, root_name)? else {
            tracing::warn!(aggregation = root_name, "threshold aggregation absent from response");
            return Ok(Vec::new());
        };

        let records = self.combinations(&root, 0)?;
        tracing::debug!(
            depth = self.names.depth(),
            combinations = records.len(),
            "flattened threshold aggregation"
        );
        Ok(records)
    }

    fn combinations(&self, node: &AggregationNode, depth: usize) -> Result<Vec<CombinationRecord>> {
        let field = self.spec.fields.get(depth).map(String::as_str);
        let is_leaf = depth + 1 >= self.names.depth();
        let mut acc = Vec::new();

        for bucket in &node.buckets {
            let term = Term::new(field, FieldValue::try_from(&bucket.key)?);

            if is_leaf {
                acc.push(self.leaf(bucket, term)?);
                continue;
            }

            let next = depth + 1;
            let name = self.names.at(next).unwrap_or_default();
            let child = bucket
                .child(name)?
                .ok_or_else(|| ThresholdError::AggregationShape {
                    depth: next,
                    name: name.to_string(),
                })?;

            for mut record in self.combinations(&child, next)? {
                if let Some(term) = &term {
                    record.terms.insert(0, term.clone());
                }
                acc.push(record);
            }
        }

        Ok(acc)
    }

    fn leaf(&self, bucket: &Bucket, term: Option<Term>) -> Result<CombinationRecord> {
        let max_timestamp = bucket
            .max_timestamp
            .as_ref()
            .and_then(|m| m.as_timestamp())
            .ok_or_else(|| ThresholdError::MissingMetric {
                metric: "max_timestamp",
                key: bucket.key_label(),
            })?;

        let cardinality = match self.spec.cardinality_field() {
            Some(field) => {
                let metric = bucket.cardinality_count.as_ref().ok_or_else(|| {
                    ThresholdError::MissingMetric {
                        metric: "cardinality_count",
                        key: bucket.key_label(),
                    }
                })?;
                Some(CardinalityTerm {
                    field: field.to_string(),
                    value: metric.value,
                })
            }
            None => None,
        };

        Ok(CombinationRecord {
            terms: term.into_iter().collect(),
            cardinality,
            min_timestamp: bucket.min_timestamp.as_ref().and_then(|m| m.as_timestamp()),
            max_timestamp,
            doc_count: bucket.doc_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn aggs(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn leaf(key: Value, count: u64, min: &str, max: &str) -> Value {
        json!({
            "key": key,
            "doc_count": count,
            "min_timestamp": {"value_as_string": min},
            "max_timestamp": {"value_as_string": max}
        })
    }

    #[test]
    fn single_field_yields_one_record_per_bucket() {
        let spec = ThresholdSpec::new(["host.name"]);
        let tree = aggs(json!({
            "threshold_0:host.name": {
                "buckets": [leaf(json!("a"), 5, "T1", "T2"), leaf(json!("b"), 3, "T3", "T4")]
            }
        }));

        let records = BucketFlattener::new(&spec).flatten(&tree).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].terms, vec![Term::new(Some("host.name"), "a".into()).unwrap()]);
        assert_eq!(records[0].doc_count, 5);
        assert_eq!(records[0].min_timestamp.as_deref(), Some("T1"));
        assert_eq!(records[0].max_timestamp, "T2");
        assert_eq!(records[1].terms[0].value, FieldValue::from("b"));
        assert_eq!(records[1].doc_count, 3);
        assert_eq!(records[1].max_timestamp, "T4");
        assert!(records[1].cardinality.is_none());
    }

    #[test]
    fn nested_fields_prepend_outer_terms() {
        let spec = ThresholdSpec::new(["host.name", "user.name"]);
        let tree = aggs(json!({
            "threshold_0:host.name": {
                "buckets": [{
                    "key": "a",
                    "doc_count": 3,
                    "threshold_1:user.name": {
                        "buckets": [leaf(json!("x"), 2, "T1", "T2"), leaf(json!("y"), 1, "T3", "T4")]
                    }
                }]
            }
        }));

        let records = BucketFlattener::new(&spec).flatten(&tree).unwrap();
        assert_eq!(records.len(), 2);
        let pairs: Vec<Vec<(String, String)>> = records
            .iter()
            .map(|r| r.terms.iter().map(|t| (t.field.clone(), t.value.to_string())).collect())
            .collect();
        assert_eq!(
            pairs,
            vec![
                vec![("host.name".into(), "a".into()), ("user.name".into(), "x".into())],
                vec![("host.name".into(), "a".into()), ("user.name".into(), "y".into())],
            ]
        );
        assert_eq!(records[0].doc_count, 2);
        assert_eq!(records[1].doc_count, 1);
    }

    #[test]
    fn outer_field_varies_slowest() {
        let spec = ThresholdSpec::new(["a", "b"]);
        let tree = aggs(json!({
            "threshold_0:a": {
                "buckets": [
                    {"key": 1, "doc_count": 2, "threshold_1:b": {"buckets": [
                        leaf(json!("p"), 1, "T", "T"), leaf(json!("q"), 1, "T", "T")
                    ]}},
                    {"key": 2, "doc_count": 1, "threshold_1:b": {"buckets": [
                        leaf(json!("p"), 1, "T", "T")
                    ]}}
                ]
            }
        }));

        let records = BucketFlattener::new(&spec).flatten(&tree).unwrap();
        let keys: Vec<String> = records
            .iter()
            .map(|r| format!("{}/{}", r.terms[0].value, r.terms[1].value))
            .collect();
        assert_eq!(keys, vec!["1/p", "1/q", "2/p"]);
    }

    #[test]
    fn missing_nested_node_fails_without_partial_output() {
        let spec = ThresholdSpec::new(["host.name", "user.name"]);
        let tree = aggs(json!({
            "threshold_0:host.name": {
                "buckets": [leaf(json!("a"), 5, "T1", "T2")]
            }
        }));

        let err = BucketFlattener::new(&spec).flatten(&tree).unwrap_err();
        match err {
            ThresholdError::AggregationShape { depth, name } => {
                assert_eq!(depth, 1);
                assert_eq!(name, "threshold_1:user.name");
            }
            other => panic!("expected shape error, got {other:?}"),
        }
    }

    #[test]
    fn shape_error_deep_in_tree_aborts_everything() {
        let spec = ThresholdSpec::new(["a", "b"]);
        let tree = aggs(json!({
            "threshold_0:a": {
                "buckets": [
                    {"key": "ok", "doc_count": 1, "threshold_1:b": {"buckets": [leaf(json!("x"), 1, "T", "T")]}},
                    {"key": "broken", "doc_count": 1}
                ]
            }
        }));

        assert!(BucketFlattener::new(&spec).flatten(&tree).is_err());
    }

    #[test]
    fn empty_and_absent_roots_yield_nothing() {
        let spec = ThresholdSpec::new(["host.name"]);
        let empty = aggs(json!({"threshold_0:host.name": {"buckets": []}}));
        assert!(BucketFlattener::new(&spec).flatten(&empty).unwrap().is_empty());
        assert!(BucketFlattener::new(&spec).flatten(&Map::new()).unwrap().is_empty());
    }

    #[test]
    fn fieldless_spec_produces_termless_record() {
        let spec = ThresholdSpec::new(Vec::<String>::new()).with_cardinality("source.ip", 2);
        let tree = aggs(json!({
            "threshold_0": {
                "buckets": [{
                    "key": "",
                    "doc_count": 42,
                    "cardinality_count": {"value": 7},
                    "max_timestamp": {"value_as_string": "T9"}
                }]
            }
        }));

        let records = BucketFlattener::new(&spec).flatten(&tree).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].terms.is_empty());
        assert_eq!(records[0].doc_count, 42);
        assert!(records[0].min_timestamp.is_none());
        assert_eq!(
            records[0].cardinality,
            Some(CardinalityTerm { field: "source.ip".into(), value: 7 })
        );
    }

    #[test]
    fn leaf_without_max_timestamp_is_rejected() {
        let spec = ThresholdSpec::new(["host.name"]);
        let tree = aggs(json!({
            "threshold_0:host.name": {"buckets": [{"key": "a", "doc_count": 1}]}
        }));

        let err = BucketFlattener::new(&spec).flatten(&tree).unwrap_err();
        assert!(matches!(err, ThresholdError::MissingMetric { metric: "max_timestamp", .. }));
    }

    #[test]
    fn configured_cardinality_must_be_present() {
        let spec = ThresholdSpec::new(["host.name"]).with_cardinality("user.name", 2);
        let tree = aggs(json!({
            "threshold_0:host.name": {"buckets": [leaf(json!("a"), 1, "T", "T")]}
        }));

        let err = BucketFlattener::new(&spec).flatten(&tree).unwrap_err();
        assert!(matches!(err, ThresholdError::MissingMetric { metric: "cardinality_count", .. }));
    }

    #[test]
    fn non_scalar_key_is_rejected() {
        let spec = ThresholdSpec::new(["host.name"]);
        let tree = aggs(json!({
            "threshold_0:host.name": {"buckets": [leaf(json!(["a"]), 1, "T", "T")]}
        }));

        let err = BucketFlattener::new(&spec).flatten(&tree).unwrap_err();
        assert!(matches!(err, ThresholdError::BucketKey(_)));
    }
}
