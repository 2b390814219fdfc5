mod errors;
mod pipeline;
mod retry;
#[cfg(test)]
mod tests;

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::models::ValidationRules;
use crate::types::Probability;

pub use errors::PipelineError;
pub use pipeline::IngestionPipeline;
pub use retry::RetryPolicy;

/// Top-level upload body: `{ "transacciones": [ ... ] }`.
///
/// Records stay as raw JSON here; the validator decides, one record at a time, whether each
/// is usable, so a single bad entry never rejects the whole upload.
#[derive(Debug, Clone, Deserialize)]
pub struct Batch {
    #[serde(rename = "transacciones")]
    pub records: Vec<Value>
}

impl Batch {
    /// # Errors
    /// Returns `PipelineError::Malformed` when the body is not JSON, not an object, or has no
    /// `transacciones` array.
    pub fn from_slice(body: &[u8]) -> Result<Self, PipelineError> {
        serde_json::from_slice(body)
            .map_err(|error| PipelineError::Malformed(format!("Se requiere 'transacciones' como lista: {error}")))
    }
}

/// Cross-batch dedup on `codigo_transaccion`. Off unless configured.
#[derive(Debug, Clone, Copy)]
pub struct IdempotencySettings {
    /// How long a transaction code stays claimed after it was first seen.
    pub window: Duration,
    pub capacity: u64
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Minimum score at which an alert is persisted. Independent of the display severity cutoffs.
    pub alert_threshold: Probability,
    /// Records of one batch scored at the same time.
    pub concurrency: usize,
    pub scorer_timeout: Duration,
    pub store_timeout: Duration,
    pub retry: RetryPolicy,
    pub validation: ValidationRules,
    pub idempotency: Option<IdempotencySettings>
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            alert_threshold: Probability::HALF,
            concurrency: 16,
            scorer_timeout: Duration::from_secs(5),
            store_timeout: Duration::from_secs(2),
            retry: RetryPolicy::default(),
            validation: ValidationRules::default(),
            idempotency: None
        }
    }
}
