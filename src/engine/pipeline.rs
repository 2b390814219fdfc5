use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashSet;
use futures::stream::{self, StreamExt};
use moka::future::Cache;
use serde_json::Value;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::engine::{Batch, PipelineError, PipelineSettings};
use crate::models::{validate, Alert, BatchSummary, InvalidRecord, Transaction};
use crate::preferences::PreferenceBook;
use crate::scoring::{Assessment, FraudScorer, ScorerError};
use crate::storage::{AlertStore, StoreError};
use crate::types::AlertId;

/// Terminal state of one record. Exactly one is produced per submitted record.
#[derive(Debug)]
enum Outcome {
    Invalid,
    Duplicate,
    Muted,
    ScoringFailed,
    BelowThreshold,
    AlertWritten,
    WriteFailed
}

/// Transaction codes carried to a final outcome inside the window, plus the ones being
/// worked on right now.
struct ClaimedCodes {
    settled: Cache<String, ()>,
    in_flight: DashSet<String>
}

impl ClaimedCodes {
    /// `None` when the code was settled inside the window or another upload holds it.
    fn claim(&self, code: &str) -> Option<Claim<'_>> {
        if !self.in_flight.insert(code.to_string()) {
            return None
        }

        let claim = Claim { codes: self, code: code.to_string() };

        //NOTE: Checked after taking the in-flight slot; settling fills the cache before giving the slot back
        if self.settled.contains_key(&claim.code) {
            return None
        }

        Some(claim)
    }
}

/// In-flight slot for one code, given back on drop. A failed or cancelled record therefore
/// never keeps its code claimed; only `settle` remembers it for the window.
struct Claim<'a> {
    codes: &'a ClaimedCodes,
    code: String
}

impl Claim<'_> {
    async fn settle(self) {
        self.codes.settled.insert(self.code.clone(), ()).await;
    }
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        self.codes.in_flight.remove(&self.code);
    }
}

async fn settle(claim: Option<Claim<'_>>) {
    if let Some(claim) = claim {
        claim.settle().await;
    }
}

/// Validates, scores and persists alerts for uploaded batches.
pub struct IngestionPipeline {
    scorer: Arc<dyn FraudScorer>,
    store: Arc<dyn AlertStore>,
    settings: PipelineSettings,
    preferences: Arc<PreferenceBook>,
    claimed_codes: Option<ClaimedCodes>
}

impl IngestionPipeline {
    pub fn new(scorer: Arc<dyn FraudScorer>, store: Arc<dyn AlertStore>, settings: PipelineSettings) -> Self {
        let claimed_codes = settings.idempotency.map(|idempotency| ClaimedCodes {
            settled: Cache::builder()
                .max_capacity(idempotency.capacity)
                .time_to_live(idempotency.window)
                .build(),
            in_flight: DashSet::new()
        });

        Self {
            scorer,
            store,
            settings,
            preferences: Arc::new(PreferenceBook::new()),
            claimed_codes
        }
    }

    /// Per-account thresholds that take precedence over `alert_threshold`.
    pub fn with_preferences(mut self, preferences: Arc<PreferenceBook>) -> Self {
        self.preferences = preferences;
        self
    }

    pub fn preferences(&self) -> &Arc<PreferenceBook> {
        &self.preferences
    }

    /// Runs every record of the batch through validation, scoring and alert persistence.
    ///
    /// Records are validated in arrival order, then scored by a pool bounded by
    /// `settings.concurrency`. Outcomes are folded into the summary by this single loop, so
    /// retries and concurrency never double count a record. Dropping the returned future stops
    /// any further dispatch; alerts already written stay written and codes claimed for
    /// deduplication are given back.
    ///
    /// # Errors
    /// Per-record failures never surface here. An error is returned only when every scored
    /// record exhausted its scorer retries, or when alert writes were attempted and none
    /// succeeded.
    pub async fn ingest(&self, batch: &Batch) -> Result<BatchSummary, PipelineError> {
        let prepared = self.prepare(&batch.records);
        let concurrency = self.settings.concurrency.max(1);

        let mut outcomes = stream::iter(prepared)
            .map(|record| self.process(record))
            .buffer_unordered(concurrency);

        let mut summary = BatchSummary::default();
        let mut scored = 0;

        while let Some(outcome) = outcomes.next().await {
            summary.processed += 1;

            match outcome {
                Outcome::Invalid => summary.invalid += 1,
                Outcome::Duplicate => summary.duplicates += 1,
                Outcome::Muted => summary.muted += 1,
                Outcome::ScoringFailed => {
                    scored += 1;
                    summary.scoring_failures += 1;
                }
                Outcome::BelowThreshold => scored += 1,
                Outcome::AlertWritten => {
                    scored += 1;
                    summary.alerts_created += 1;
                }
                Outcome::WriteFailed => {
                    scored += 1;
                    summary.write_failures += 1;
                }
            }
        }

        info!(
            "Batch ingested: {} processed, {} alerts created, {} invalid, {} duplicates, {} muted, {} scoring failures, {} write failures",
            summary.processed, summary.alerts_created, summary.invalid, summary.duplicates, summary.muted, summary.scoring_failures, summary.write_failures
        );

        if scored > 0 && summary.scoring_failures == scored {
            return Err(PipelineError::ScorerUnavailable { attempted: scored, summary });
        }

        let write_attempts = summary.alerts_created + summary.write_failures;
        if write_attempts > 0 && summary.alerts_created == 0 {
            return Err(PipelineError::StoreUnavailable { attempted: write_attempts, summary });
        }

        Ok(summary)
    }

    /// Parses a raw request body and ingests it.
    pub async fn ingest_slice(&self, body: &[u8]) -> Result<BatchSummary, PipelineError> {
        let batch = Batch::from_slice(body)?;
        self.ingest(&batch).await
    }

    fn prepare(&self, records: &[Value]) -> Vec<Result<Transaction, InvalidRecord>> {
        let mut codes = HashSet::new();

        records.iter().enumerate().map(|(index, record)| {
            let result = validate(record, &self.settings.validation).and_then(|transaction| {
                if codes.insert(transaction.transaction_code.clone()) {
                    Ok(transaction)
                } else {
                    Err(InvalidRecord::DuplicateTransactionCode(transaction.transaction_code))
                }
            });

            if let Err(reason) = &result {
                warn!("Skipping record #{index}: {reason}");
            }

            result
        }).collect()
    }

    async fn process(&self, prepared: Result<Transaction, InvalidRecord>) -> Outcome {
        let Ok(transaction) = prepared else {
            return Outcome::Invalid
        };

        let claim = match &self.claimed_codes {
            Some(codes) => match codes.claim(&transaction.transaction_code) {
                Some(claim) => Some(claim),
                None => {
                    debug!("Transaction [{}] was already ingested, skipping", transaction.transaction_code);
                    return Outcome::Duplicate
                }
            },
            None => None
        };

        let Some(threshold) = self.preferences.threshold_for(&transaction.iban, self.settings.alert_threshold.value()) else {
            debug!("Notifications are off for [{}], transaction [{}] not scored", transaction.iban, transaction.transaction_code);
            return Outcome::Muted
        };

        let assessment = match self.score(&transaction).await {
            Ok(assessment) => assessment,
            Err(error) => {
                warn!("Transaction [{}] could not be scored: {error}", transaction.transaction_code);
                return Outcome::ScoringFailed
            }
        };

        if assessment.probability.value() < threshold {
            debug!("Transaction [{}] scored {} below threshold {threshold}", transaction.transaction_code, assessment.probability);
            settle(claim).await;
            return Outcome::BelowThreshold
        }

        let alert = Alert::snapshot(&transaction, assessment.probability, assessment.collector_iban);

        match self.write(alert).await {
            Ok(id) => {
                debug!("Alert [{id}] written for transaction [{}] with score {}", transaction.transaction_code, assessment.probability);
                settle(claim).await;
                Outcome::AlertWritten
            }
            Err(error) => {
                warn!("Alert for transaction [{}] could not be written: {error}", transaction.transaction_code);
                Outcome::WriteFailed
            }
        }
    }

    async fn score(&self, transaction: &Transaction) -> Result<Assessment, ScorerError> {
        let limit = self.settings.scorer_timeout;
        let label = format!("Scoring transaction [{}]", transaction.transaction_code);

        self.settings.retry.run(&label, || async move {
            timeout(limit, self.scorer.score(transaction)).await
                .unwrap_or(Err(ScorerError::Timeout(limit)))
        }).await
    }

    async fn write(&self, alert: Alert) -> Result<AlertId, StoreError> {
        let limit = self.settings.store_timeout;
        let label = format!("Writing alert for [{}]", alert.transaction_code);
        let alert = &alert;

        self.settings.retry.run(&label, || async move {
            timeout(limit, self.store.put(alert.clone())).await
                .unwrap_or(Err(StoreError::Timeout(limit)))
        }).await
    }
}
