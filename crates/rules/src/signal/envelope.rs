//! ECS-style signal envelope and the wrapped hit handed to the sink.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tripwire_core::{FieldValue, Term};

use crate::flatten::CardinalityTerm;

/// Reserved timestamp key in every signal source.
pub const TIMESTAMP_FIELD: &str = "@timestamp";

/// Key of the nested threshold summary block.
pub const THRESHOLD_RESULT_FIELD: &str = "threshold_result";

/// Namespaces owned by the alert itself; grouping terms never overwrite them.
pub const RESERVED_PREFIXES: [&str; 2] = ["signal.", "kibana.alert."];

/// Whether a term on `field` may be merged into the top-level source.
pub fn is_mergeable_field(field: &str) -> bool {
    field != THRESHOLD_RESULT_FIELD && !RESERVED_PREFIXES.iter().any(|p| field.starts_with(p))
}

/// Summary of the group that fired.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThresholdResult {
    /// All grouping terms, including any withheld from the top-level source.
    pub terms: Vec<Term>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cardinality: Option<Vec<CardinalityTerm>>,
    pub count: u64,
    /// Lower time bound of the events in the group.
    pub from: String,
}

/// Document body of a threshold signal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignalSource {
    /// `@timestamp` followed by the merged grouping terms, in term order.
    #[serde(flatten)]
    pub fields: IndexMap<String, FieldValue>,
    pub threshold_result: ThresholdResult,
}

impl SignalSource {
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    pub fn timestamp(&self) -> Option<&str> {
        self.fields.get(TIMESTAMP_FIELD).and_then(FieldValue::as_str)
    }
}

/// One output signal, created once per combination and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalEnvelope {
    pub id: String,
    pub index: String,
    pub source: SignalSource,
}

impl SignalEnvelope {
    /// Wrap for bulk insertion.
    pub fn into_hit(self) -> SignalHit {
        SignalHit {
            index: self.index,
            id: self.id,
            source: self.source,
        }
    }
}

/// Search-hit shaped wrapper: `{_index, _id, _source}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignalHit {
    #[serde(rename = "_index")]
    pub index: String,
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_source")]
    pub source: SignalSource,
}
