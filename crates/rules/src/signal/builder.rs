//! Builds one [`SignalEnvelope`] per [`CombinationRecord`].

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use tripwire_core::FieldValue;

use crate::flatten::CombinationRecord;

use super::envelope::{is_mergeable_field, SignalEnvelope, SignalSource, ThresholdResult, TIMESTAMP_FIELD};
use super::id::{calculate_threshold_signal_id, combination_key};

/// Maps combinations from one rule execution to signal envelopes.
pub struct SignalBuilder<'a> {
    rule_id: &'a str,
    started_at: DateTime<Utc>,
    /// Lower search bound of the execution, used when a group has no minimum timestamp.
    from: DateTime<Utc>,
    fields: &'a [String],
    index: &'a str,
}

impl<'a> SignalBuilder<'a> {
    pub fn new(
        rule_id: &'a str,
        started_at: DateTime<Utc>,
        from: DateTime<Utc>,
        fields: &'a [String],
        index: &'a str,
    ) -> Self {
        Self {
            rule_id,
            started_at,
            from,
            fields,
            index,
        }
    }

    /// Build the envelope for a single combination.
    pub fn build(&self, record: CombinationRecord) -> SignalEnvelope {
        let id = calculate_threshold_signal_id(
            self.rule_id,
            self.started_at,
            self.fields,
            &combination_key(&record.terms),
        );

        let mut fields = IndexMap::with_capacity(record.terms.len() + 1);
        fields.insert(
            TIMESTAMP_FIELD.to_string(),
            FieldValue::Text(record.max_timestamp),
        );
        for term in &record.terms {
            if is_mergeable_field(&term.field) {
                fields.insert(term.field.clone(), term.value.clone());
            } else {
                tracing::debug!(
                    rule_id = self.rule_id,
                    field = %term.field,
                    "reserved field kept out of signal source"
                );
            }
        }

        let from = record
            .min_timestamp
            .unwrap_or_else(|| self.from.to_rfc3339_opts(SecondsFormat::Millis, true));

        SignalEnvelope {
            id,
            index: self.index.to_string(),
            source: SignalSource {
                fields,
                threshold_result: ThresholdResult {
                    terms: record.terms,
                    cardinality: record.cardinality.map(|c| vec![c]),
                    count: record.doc_count,
                    from,
                },
            },
        }
    }

    /// Build envelopes for every combination, preserving order.
    pub fn build_all(&self, records: Vec<CombinationRecord>) -> Vec<SignalEnvelope> {
        records.into_iter().map(|r| self.build(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::CardinalityTerm;
    use chrono::TimeZone;
    use tripwire_core::Term;

    fn record(terms: Vec<(&str, &str)>, count: u64, min: Option<&str>, max: &str) -> CombinationRecord {
        CombinationRecord {
            terms: terms
                .into_iter()
                .filter_map(|(f, v)| Term::new(Some(f), v.into()))
                .collect(),
            cardinality: None,
            min_timestamp: min.map(str::to_string),
            max_timestamp: max.to_string(),
            doc_count: count,
        }
    }

    fn times() -> (DateTime<Utc>, DateTime<Utc>) {
        (
            Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2020, 12, 31, 23, 55, 0).unwrap(),
        )
    }

    #[test]
    fn merges_terms_and_timestamp_into_source() {
        let (started_at, from) = times();
        let fields = vec!["host.name".to_string()];
        let builder = SignalBuilder::new("rule-1", started_at, from, &fields, "logs-*");

        let env = builder.build(record(vec![("host.name", "a")], 5, Some("T1"), "T2"));
        assert_eq!(env.id, "78290c48-8289-5ed2-a258-1839d86ef205");
        assert_eq!(env.index, "logs-*");
        assert_eq!(env.source.get("host.name"), Some(&FieldValue::from("a")));
        assert_eq!(env.source.timestamp(), Some("T2"));
        assert_eq!(env.source.threshold_result.count, 5);
        assert_eq!(env.source.threshold_result.from, "T1");
        assert!(env.source.threshold_result.cardinality.is_none());
    }

    #[test]
    fn reserved_terms_stay_in_threshold_result_only() {
        let (started_at, from) = times();
        let fields = vec!["signal.rule.name".to_string(), "kibana.alert.uuid".to_string(), "user.name".to_string()];
        let builder = SignalBuilder::new("rule-1", started_at, from, &fields, "idx");

        let env = builder.build(record(
            vec![("signal.rule.name", "r"), ("kibana.alert.uuid", "u"), ("user.name", "bob")],
            1,
            Some("T"),
            "T",
        ));
        assert!(env.source.get("signal.rule.name").is_none());
        assert!(env.source.get("kibana.alert.uuid").is_none());
        assert_eq!(env.source.get("user.name"), Some(&FieldValue::from("bob")));
        let kept: Vec<&str> = env
            .source
            .threshold_result
            .terms
            .iter()
            .map(|t| t.field.as_str())
            .collect();
        assert_eq!(kept, vec!["signal.rule.name", "kibana.alert.uuid", "user.name"]);
    }

    #[test]
    fn from_falls_back_to_search_lower_bound() {
        let (started_at, from) = times();
        let builder = SignalBuilder::new("rule-1", started_at, from, &[], "idx");

        let mut rec = record(vec![], 42, None, "T9");
        rec.cardinality = Some(CardinalityTerm { field: "source.ip".into(), value: 7 });
        let env = builder.build(rec);

        assert_eq!(env.source.threshold_result.from, "2020-12-31T23:55:00.000Z");
        assert_eq!(
            env.source.threshold_result.cardinality,
            Some(vec![CardinalityTerm { field: "source.ip".into(), value: 7 }])
        );
        assert_eq!(env.source.fields.len(), 1);
    }

    #[test]
    fn id_ignores_term_order() {
        let (started_at, from) = times();
        let fields = vec!["host.name".to_string(), "user.name".to_string()];
        let builder = SignalBuilder::new("rule-1", started_at, from, &fields, "idx");

        let a = builder.build(record(vec![("host.name", "a"), ("user.name", "x")], 1, None, "T"));
        let b = builder.build(record(vec![("user.name", "x"), ("host.name", "a")], 1, None, "T"));
        assert_eq!(a.id, b.id);
        assert_eq!(a.id, "79f0c0f6-9094-522b-8f1c-91a28fa213cc");
    }

    #[test]
    fn source_serializes_flat_with_summary_block() {
        let (started_at, from) = times();
        let fields = vec!["host.name".to_string()];
        let builder = SignalBuilder::new("rule-1", started_at, from, &fields, "idx");

        let hit = builder
            .build(record(vec![("host.name", "a")], 5, Some("T1"), "T2"))
            .into_hit();
        let json = serde_json::to_value(&hit).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "_index": "idx",
                "_id": "78290c48-8289-5ed2-a258-1839d86ef205",
                "_source": {
                    "@timestamp": "T2",
                    "host.name": "a",
                    "threshold_result": {
                        "terms": [{"field": "host.name", "value": "a"}],
                        "count": 5,
                        "from": "T1"
                    }
                }
            })
        );
    }
}
