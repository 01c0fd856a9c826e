//! Deterministic signal identifiers.
//!
//! The identifier is a UUID v5 over the rule id, the execution start time,
//! the grouping fields and the sorted term values. Re-running a rule at the
//! same start time over the same groups regenerates the same ids, so the
//! sink overwrites instead of duplicating.

use chrono::{DateTime, SecondsFormat, Utc};
use tripwire_core::Term;
use uuid::Uuid;

/// Namespace for threshold signal ids (0684ec03-7201-4ee0-8ee0-3a3f6b2479b2).
const THRESHOLD_SIGNAL_NAMESPACE: Uuid = Uuid::from_u128(0x0684ec03_7201_4ee0_8ee0_3a3f6b2479b2);

/// Canonical key for a combination: term values sorted as strings, comma-joined.
pub fn combination_key(terms: &[Term]) -> String {
    let mut values: Vec<String> = terms.iter().map(|t| t.value.sort_key()).collect();
    values.sort();
    values.join(",")
}

/// Derive the signal id for one combination.
pub fn calculate_threshold_signal_id(
    rule_id: &str,
    started_at: DateTime<Utc>,
    fields: &[String],
    key: &str,
) -> String {
    let base = format!(
        "{}{}{}{}",
        rule_id,
        started_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        fields.join(","),
        key
    );
    Uuid::new_v5(&THRESHOLD_SIGNAL_NAMESPACE, base.as_bytes()).to_string()
}
