//! Threshold rule types: root document, threshold parameters, and the
//! normalized grouping spec consumed by flattening and signal building.

use serde::{Deserialize, Serialize};

use super::CommonMetadata;

/// Top-level threshold rule definition parsed from YAML.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ThresholdRule {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub metadata: CommonMetadata,
    pub threshold: ThresholdParams,
    /// Source index patterns searched by the rule.
    #[serde(default)]
    pub index: Vec<String>,
    /// Signals index override; falls back to the configured signals index.
    #[serde(default)]
    pub output_index: Option<String>,
}

impl ThresholdRule {
    /// Normalized grouping spec for this rule.
    pub fn spec(&self) -> ThresholdSpec {
        self.threshold.normalize()
    }
}

/// Grouping fields as written in YAML: a single field name or a list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldSelector {
    One(String),
    Many(Vec<String>),
}

impl Default for FieldSelector {
    fn default() -> Self {
        FieldSelector::Many(Vec::new())
    }
}

/// Threshold parameters as written in YAML.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ThresholdParams {
    #[serde(default)]
    pub field: FieldSelector,
    /// Minimum document count per group.
    pub value: u64,
    #[serde(default)]
    pub cardinality: Vec<CardinalityParams>,
}

/// Distinct-value condition on one field within each group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CardinalityParams {
    pub field: String,
    pub value: u64,
}

impl ThresholdParams {
    /// Normalize into an ordered field list with at most one cardinality entry.
    ///
    /// Blank field names are dropped; an empty list means the whole result
    /// set is one group.
    pub fn normalize(&self) -> ThresholdSpec {
        let fields = match &self.field {
            FieldSelector::One(f) => vec![f.clone()],
            FieldSelector::Many(fs) => fs.clone(),
        }
        .into_iter()
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .collect();

        ThresholdSpec {
            fields,
            value: self.value,
            cardinality: self.cardinality.first().cloned(),
        }
    }
}

/// Normalized grouping spec: ordered fields (outer to inner) plus an
/// optional cardinality field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ThresholdSpec {
    pub fields: Vec<String>,
    pub value: u64,
    pub cardinality: Option<CardinalityParams>,
}

impl ThresholdSpec {
    /// Spec grouping on `fields` with no cardinality condition.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            value: 1,
            cardinality: None,
        }
    }

    /// Add a cardinality condition on `field`.
    pub fn with_cardinality(mut self, field: &str, value: u64) -> Self {
        self.cardinality = Some(CardinalityParams {
            field: field.to_string(),
            value,
        });
        self
    }

    /// Name of the cardinality field, if configured.
    pub fn cardinality_field(&self) -> Option<&str> {
        self.cardinality.as_ref().map(|c| c.field.as_str())
    }
}
