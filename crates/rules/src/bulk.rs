//! Hands transformed threshold signals to a bulk-write sink.

use chrono::{DateTime, Utc};
use tripwire_core::config::SignalsConfig;

use crate::error::ThresholdError;
use crate::schema::ThresholdRule;
use crate::signal::SignalHit;
use crate::transform::{transform_threshold_results_to_ecs, SearchResponse};

/// Abstraction over the bulk-insert path of the signals index.
///
/// Implementations wrap whatever client writes documents. The rules crate
/// only depends on this trait.
#[async_trait::async_trait]
pub trait SignalSink: Send + Sync {
    /// Write `hits` into `index`, reporting an outcome per hit.
    async fn bulk_create(
        &self,
        index: &str,
        hits: Vec<SignalHit>,
    ) -> Result<BulkCreateResponse, SinkError>;
}

/// Errors that fail a whole bulk request.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Bulk request failed: {0}")]
    RequestFailed(String),

    #[error("Signals index unavailable: {0}")]
    Unavailable(String),
}

/// Outcome of writing one signal.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkItemOutcome {
    pub id: String,
    /// `None` when the signal was written.
    pub error: Option<String>,
}

/// Per-item results of a bulk request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkCreateResponse {
    pub items: Vec<BulkItemOutcome>,
    pub took_ms: u64,
}

impl BulkCreateResponse {
    /// True when every item was written.
    pub fn success(&self) -> bool {
        self.items.iter().all(|i| i.error.is_none())
    }

    pub fn created_count(&self) -> usize {
        self.items.iter().filter(|i| i.error.is_none()).count()
    }

    pub fn errors(&self) -> Vec<&str> {
        self.items.iter().filter_map(|i| i.error.as_deref()).collect()
    }
}

/// Errors from [`bulk_create_threshold_signals`].
#[derive(Debug, thiserror::Error)]
pub enum BulkCreateError {
    #[error(transparent)]
    Threshold(#[from] ThresholdError),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Inputs for one threshold rule execution.
pub struct BulkCreateThresholdParams<'a> {
    pub rule: &'a ThresholdRule,
    pub response: SearchResponse,
    /// Execution start time; part of every signal id.
    pub started_at: DateTime<Utc>,
    /// Lower bound of the execution's search window.
    pub from: DateTime<Utc>,
}

/// Transform the rule's search response into signals and write them.
///
/// Signals carry the rule's input index patterns (or the configured
/// defaults) as their `_index` and are written to the rule's output index
/// (or the configured signals index). A disabled rule writes nothing.
pub async fn bulk_create_threshold_signals(
    params: BulkCreateThresholdParams<'_>,
    config: &SignalsConfig,
    sink: &dyn SignalSink,
) -> Result<BulkCreateResponse, BulkCreateError> {
    let rule = params.rule;
    let rule_id = rule.metadata.id.as_str();
    if !rule.metadata.enabled {
        tracing::debug!(rule_id, "rule disabled, skipping bulk create");
        return Ok(BulkCreateResponse::default());
    }

    let input_index = if rule.index.is_empty() {
        config.input_index.join(",")
    } else {
        rule.index.join(",")
    };
    let signals_index = rule.output_index.as_deref().unwrap_or(&config.index);

    let spec = rule.spec();
    let transformed = transform_threshold_results_to_ecs(
        params.response,
        &input_index,
        params.started_at,
        params.from,
        &spec,
        rule_id,
    )?;

    let hits = transformed.hits.hits;
    if hits.is_empty() {
        return Ok(BulkCreateResponse::default());
    }

    let response = sink.bulk_create(signals_index, hits).await?;
    for item in &response.items {
        if let Some(error) = &item.error {
            tracing::warn!(rule_id, signal_id = %item.id, error = %error, "failed to write threshold signal");
        }
    }
    tracing::info!(
        rule_id,
        index = signals_index,
        created = response.created_count(),
        took_ms = response.took_ms,
        "bulk created threshold signals"
    );

    Ok(response)
}
