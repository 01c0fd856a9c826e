//! Common metadata carried by every rule document.

use serde::{Deserialize, Serialize};

/// Identity and bookkeeping fields for a rule.
///
/// `id` is the stable rule identifier that feeds signal identifier
/// derivation, so renaming a rule never changes the signals it produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CommonMetadata {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

pub(crate) fn default_true() -> bool {
    true
}
