//! Depth-indexed aggregation names.

/// Prefix shared by every threshold aggregation name.
const NAME_PREFIX: &str = "threshold_";

/// Precomputed table of aggregation names, one per tree depth.
///
/// The node grouping on field `i` is named `threshold_{i}:{field}`. With no
/// grouping fields the whole result lives under a single `threshold_0` node.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationNames {
    names: Vec<String>,
}

impl AggregationNames {
    pub fn new(fields: &[String]) -> Self {
        let names = if fields.is_empty() {
            vec![format!("{NAME_PREFIX}0")]
        } else {
            fields
                .iter()
                .enumerate()
                .map(|(i, field)| format!("{NAME_PREFIX}{i}:{field}"))
                .collect()
        };
        Self { names }
    }

    /// Name of the node at `depth`, if the tree is that deep.
    pub fn at(&self, depth: usize) -> Option<&str> {
        self.names.get(depth).map(String::as_str)
    }

    /// Number of levels in the tree.
    pub fn depth(&self) -> usize {
        self.names.len()
    }
}
