use super::{Batch, IdempotencySettings, IngestionPipeline, PipelineError, PipelineSettings, RetryPolicy};

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde_json::json;

use crate::models::InvalidRecord;
use crate::preferences::{account_key, PreferenceBook, PreferenceUpdate, ThresholdLevel};
use crate::storage::{AlertFilter, AlertStorage, AlertStore, IbanMatch};
use crate::testing::{record, FlakyStore, ScriptedScorer, IBAN_A, IBAN_B, IBAN_C};
use crate::types::Probability;

fn fast_settings() -> PipelineSettings {
    PipelineSettings {
        scorer_timeout: Duration::from_millis(200),
        store_timeout: Duration::from_millis(200),
        retry: RetryPolicy { max_attempts: 3, backoff: Duration::from_millis(1) },
        ..PipelineSettings::default()
    }
}

fn create_pipeline(scorer: ScriptedScorer, store: Arc<dyn AlertStore>, settings: PipelineSettings) -> (IngestionPipeline, Arc<ScriptedScorer>) {
    let scorer = Arc::new(scorer);
    (IngestionPipeline::new(scorer.clone(), store, settings), scorer)
}

fn batch(records: Vec<serde_json::Value>) -> Batch {
    Batch { records }
}

#[test]
fn test_batch_parsing_rejects_malformed_bodies() {
    assert!(matches!(Batch::from_slice(b"{}"), Err(PipelineError::Malformed(_))));
    assert!(matches!(Batch::from_slice(b"not json"), Err(PipelineError::Malformed(_))));
    assert!(matches!(Batch::from_slice(b"[]"), Err(PipelineError::Malformed(_))));
    assert!(matches!(Batch::from_slice(br#"{"transacciones": {}}"#), Err(PipelineError::Malformed(_))));
    assert!(Batch::from_slice(br#"{"transacciones": []}"#).is_ok());
}

#[test]
fn test_retry_backoff_doubles_after_second_attempt() {
    let policy = RetryPolicy { max_attempts: 5, backoff: Duration::from_millis(10) };

    assert_eq!(policy.delay_before(2), Duration::from_millis(10));
    assert_eq!(policy.delay_before(3), Duration::from_millis(20));
    assert_eq!(policy.delay_before(4), Duration::from_millis(40));
}

#[tokio::test]
async fn test_invalid_record_is_counted_but_not_scored() -> Result<()> {
    // Scenario: three records, one without IBAN, the valid ones score 0.9 and 0.4 against a 0.5 threshold.
    let store = Arc::new(AlertStorage::new());
    let scorer = ScriptedScorer::new(&[("TX-1", 0.9), ("TX-2", 0.4)]);
    let (pipeline, scorer) = create_pipeline(scorer, store.clone(), fast_settings());

    let mut missing_iban = record(IBAN_C, "TX-3", 10.0);
    missing_iban.as_object_mut().map(|fields| fields.remove("IBAN"));

    let summary = pipeline.ingest(&batch(vec![
        record(IBAN_A, "TX-1", -49.99),
        record(IBAN_B, "TX-2", -5.0),
        missing_iban
    ])).await?;

    assert_eq!(summary.processed, 3);
    assert_eq!(summary.alerts_created, 1);
    assert_eq!(summary.invalid, 1);
    assert_eq!(scorer.calls(), 2);

    let filter = AlertFilter { min_score: Some(Probability::new(0.5)?), ..AlertFilter::default() };
    let alerts = store.query(&filter).await?;

    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].alert.probability.value(), 0.9);
    assert_eq!(alerts[0].alert.transaction_code, "TX-1");

    Ok(())
}

#[tokio::test]
async fn test_every_record_is_accounted_for_exactly_once() -> Result<()> {
    let store = Arc::new(AlertStorage::new());
    let scores: Vec<(String, f64)> = (0..200).map(|index| (format!("TX-{index}"), (index % 10) as f64 / 10.0)).collect();
    let borrowed: Vec<(&str, f64)> = scores.iter().map(|(code, score)| (code.as_str(), *score)).collect();
    let (pipeline, _) = create_pipeline(ScriptedScorer::new(&borrowed), store.clone(), fast_settings());

    let mut records: Vec<_> = (0..200).map(|index| record(IBAN_A, &format!("TX-{index}"), 1.0)).collect();
    records.push(json!("not an object"));
    records.push(json!({ "IBAN": IBAN_A }));

    let summary = pipeline.ingest(&batch(records)).await?;

    assert_eq!(summary.processed, 202);
    assert_eq!(summary.invalid, 2);
    assert_eq!(summary.alerts_created, 100);
    assert!(summary.alerts_created <= summary.processed);
    assert_eq!(store.len(), 100);

    Ok(())
}

#[tokio::test]
async fn test_threshold_is_inclusive() -> Result<()> {
    let store = Arc::new(AlertStorage::new());
    let settings = PipelineSettings { alert_threshold: Probability::new(0.7)?, ..fast_settings() };
    let (pipeline, _) = create_pipeline(ScriptedScorer::new(&[("TX-1", 0.7), ("TX-2", 0.6999)]), store.clone(), settings);

    let summary = pipeline.ingest(&batch(vec![record(IBAN_A, "TX-1", 1.0), record(IBAN_A, "TX-2", 1.0)])).await?;

    assert_eq!(summary.alerts_created, 1);

    Ok(())
}

#[tokio::test]
async fn test_duplicate_code_within_batch_is_rejected() -> Result<()> {
    let store = Arc::new(AlertStorage::new());
    let (pipeline, scorer) = create_pipeline(ScriptedScorer::new(&[("TX-1", 0.9)]), store.clone(), fast_settings());

    let summary = pipeline.ingest(&batch(vec![record(IBAN_A, "TX-1", 1.0), record(IBAN_B, "TX-1", 2.0)])).await?;

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.invalid, 1);
    assert_eq!(summary.alerts_created, 1);
    assert_eq!(scorer.calls(), 1);

    let alerts = store.query(&AlertFilter::default()).await?;
    assert_eq!(alerts[0].alert.iban.as_str(), IBAN_A);

    Ok(())
}

#[tokio::test]
async fn test_transient_scorer_failures_are_retried() -> Result<()> {
    let store = Arc::new(AlertStorage::new());
    let scorer = ScriptedScorer::new(&[("TX-1", 0.95)]).failing("TX-1", 2);
    let (pipeline, scorer) = create_pipeline(scorer, store.clone(), fast_settings());

    let summary = pipeline.ingest(&batch(vec![record(IBAN_A, "TX-1", 1.0)])).await?;

    assert_eq!(summary.alerts_created, 1);
    assert_eq!(summary.scoring_failures, 0);
    assert_eq!(scorer.calls(), 3);

    Ok(())
}

#[tokio::test]
async fn test_exhausted_scorer_retries_skip_only_that_record() -> Result<()> {
    let store = Arc::new(AlertStorage::new());
    let scorer = ScriptedScorer::new(&[("TX-1", 0.95), ("TX-2", 0.95)]).failing("TX-1", 10);
    let (pipeline, scorer) = create_pipeline(scorer, store.clone(), fast_settings());

    let summary = pipeline.ingest(&batch(vec![record(IBAN_A, "TX-1", 1.0), record(IBAN_B, "TX-2", 1.0)])).await?;

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.alerts_created, 1);
    assert_eq!(summary.scoring_failures, 1);
    assert_eq!(scorer.calls(), 4);

    Ok(())
}

#[tokio::test]
async fn test_scorer_timeout_counts_as_failure() -> Result<()> {
    let store = Arc::new(AlertStorage::new());
    let scorer = ScriptedScorer::new(&[("TX-1", 0.95)]).with_delay(Duration::from_millis(500));
    let settings = PipelineSettings {
        scorer_timeout: Duration::from_millis(20),
        retry: RetryPolicy { max_attempts: 2, backoff: Duration::from_millis(1) },
        ..fast_settings()
    };
    let (pipeline, scorer) = create_pipeline(scorer, store.clone(), settings);

    let result = pipeline.ingest(&batch(vec![record(IBAN_A, "TX-1", 1.0)])).await;

    let (attempted, summary) = match result {
        Err(PipelineError::ScorerUnavailable { attempted, summary }) => (attempted, summary),
        other => return Err(anyhow!("expected a scorer outage, got {other:?}"))
    };

    assert_eq!(attempted, 1);
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.alerts_created, 0);
    assert_eq!(scorer.calls(), 2);
    assert!(store.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_batch_of_only_invalid_records_is_not_an_outage() -> Result<()> {
    let store = Arc::new(AlertStorage::new());
    let (pipeline, scorer) = create_pipeline(ScriptedScorer::new(&[]), store, fast_settings());

    let summary = pipeline.ingest(&batch(vec![json!({}), json!(null)])).await?;

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.invalid, 2);
    assert_eq!(scorer.calls(), 0);

    Ok(())
}

#[tokio::test]
async fn test_store_write_failures_are_retried_and_reported() -> Result<()> {
    let store = Arc::new(FlakyStore::new().failing_put("TX-1", 1).failing_put("TX-2", 10));
    let scorer = ScriptedScorer::new(&[("TX-1", 0.9), ("TX-2", 0.9)]);
    let (pipeline, _) = create_pipeline(scorer, store.clone(), fast_settings());

    let summary = pipeline.ingest(&batch(vec![record(IBAN_A, "TX-1", 1.0), record(IBAN_B, "TX-2", 1.0)])).await?;

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.alerts_created, 1);
    assert_eq!(summary.write_failures, 1);
    assert_eq!(store.query(&AlertFilter::default()).await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_store_outage_fails_the_batch() -> Result<()> {
    let store = Arc::new(FlakyStore::unavailable());
    let (pipeline, _) = create_pipeline(ScriptedScorer::new(&[("TX-1", 0.9)]), store, fast_settings());

    let result = pipeline.ingest(&batch(vec![record(IBAN_A, "TX-1", 1.0)])).await;

    assert!(matches!(result, Err(PipelineError::StoreUnavailable { attempted: 1, .. })));

    Ok(())
}

#[tokio::test]
async fn test_resubmission_creates_new_alerts_by_default() -> Result<()> {
    let store = Arc::new(AlertStorage::new());
    let (pipeline, _) = create_pipeline(ScriptedScorer::new(&[("TX-1", 0.9)]), store.clone(), fast_settings());
    let upload = batch(vec![record(IBAN_A, "TX-1", 1.0)]);

    let first = pipeline.ingest(&upload).await?;
    let second = pipeline.ingest(&upload).await?;

    assert_eq!(first.alerts_created, 1);
    assert_eq!(second.alerts_created, 1);
    assert_eq!(store.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_idempotency_keying_skips_seen_codes() -> Result<()> {
    let store = Arc::new(AlertStorage::new());
    let settings = PipelineSettings {
        idempotency: Some(IdempotencySettings { window: Duration::from_secs(60), capacity: 1_000 }),
        ..fast_settings()
    };
    let scorer = ScriptedScorer::new(&[("TX-1", 0.9), ("TX-2", 0.9)]);
    let (pipeline, scorer) = create_pipeline(scorer, store.clone(), settings);

    pipeline.ingest(&batch(vec![record(IBAN_A, "TX-1", 1.0)])).await?;
    let second = pipeline.ingest(&batch(vec![record(IBAN_A, "TX-1", 1.0), record(IBAN_A, "TX-2", 1.0)])).await?;

    assert_eq!(second.processed, 2);
    assert_eq!(second.duplicates, 1);
    assert_eq!(second.alerts_created, 1);
    assert_eq!(scorer.calls(), 2);
    assert_eq!(store.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_idempotency_releases_codes_that_failed() -> Result<()> {
    let store = Arc::new(AlertStorage::new());
    let settings = PipelineSettings {
        idempotency: Some(IdempotencySettings { window: Duration::from_secs(60), capacity: 1_000 }),
        retry: RetryPolicy { max_attempts: 1, backoff: Duration::from_millis(1) },
        ..fast_settings()
    };
    let scorer = ScriptedScorer::new(&[("TX-1", 0.9), ("TX-2", 0.1)]).failing("TX-1", 1);
    let (pipeline, _) = create_pipeline(scorer, store.clone(), settings);
    let upload = batch(vec![record(IBAN_A, "TX-1", 1.0), record(IBAN_A, "TX-2", 1.0)]);

    let first = pipeline.ingest(&upload).await?;
    let second = pipeline.ingest(&upload).await?;

    assert_eq!(first.scoring_failures, 1);
    assert_eq!(second.alerts_created, 1);
    assert_eq!(second.duplicates, 1);

    Ok(())
}

fn idempotent_settings() -> PipelineSettings {
    PipelineSettings {
        idempotency: Some(IdempotencySettings { window: Duration::from_secs(60), capacity: 1_000 }),
        scorer_timeout: Duration::from_secs(2),
        ..fast_settings()
    }
}

#[tokio::test]
async fn test_cancelled_upload_gives_claimed_codes_back() -> Result<()> {
    let store = Arc::new(AlertStorage::new());
    let scorer = ScriptedScorer::new(&[("TX-1", 0.9)]).with_delay(Duration::from_millis(300));
    let (pipeline, _) = create_pipeline(scorer, store.clone(), idempotent_settings());
    let upload = batch(vec![record(IBAN_A, "TX-1", 1.0)]);

    let cancelled = tokio::time::timeout(Duration::from_millis(50), pipeline.ingest(&upload)).await;
    assert!(cancelled.is_err());

    let retried = pipeline.ingest(&upload).await?;

    assert_eq!(retried.duplicates, 0);
    assert_eq!(retried.alerts_created, 1);
    assert_eq!(store.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_concurrent_uploads_of_the_same_code_alert_once() -> Result<()> {
    let store = Arc::new(AlertStorage::new());
    let scorer = ScriptedScorer::new(&[("TX-1", 0.9)]).with_delay(Duration::from_millis(100));
    let (pipeline, scorer) = create_pipeline(scorer, store.clone(), idempotent_settings());
    let upload = batch(vec![record(IBAN_A, "TX-1", 1.0)]);

    let (first, second) = tokio::join!(pipeline.ingest(&upload), pipeline.ingest(&upload));
    let (first, second) = (first?, second?);

    assert_eq!(first.alerts_created + second.alerts_created, 1);
    assert_eq!(first.duplicates + second.duplicates, 1);
    assert_eq!(scorer.calls(), 1);
    assert_eq!(store.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_cancelled_upload_stops_dispatch_and_keeps_written_alerts() -> Result<()> {
    let store = Arc::new(AlertStorage::new());
    let scores: Vec<(String, f64)> = (0..5).map(|index| (format!("TX-{index}"), 0.9)).collect();
    let borrowed: Vec<(&str, f64)> = scores.iter().map(|(code, score)| (code.as_str(), *score)).collect();
    let scorer = ScriptedScorer::new(&borrowed).with_delay(Duration::from_millis(100));
    let settings = PipelineSettings {
        concurrency: 1,
        scorer_timeout: Duration::from_secs(2),
        ..fast_settings()
    };
    let (pipeline, scorer) = create_pipeline(scorer, store.clone(), settings);
    let upload = batch((0..5).map(|index| record(IBAN_A, &format!("TX-{index}"), 1.0)).collect());

    let cancelled = tokio::time::timeout(Duration::from_millis(350), pipeline.ingest(&upload)).await;
    assert!(cancelled.is_err());

    let written = store.len();
    assert!(written >= 1);
    assert!(written <= scorer.calls());
    assert!(scorer.calls() < 5);

    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(store.len(), written);
    assert!(scorer.calls() < 5);

    Ok(())
}

fn book(entries: &[(&str, PreferenceUpdate)]) -> Result<Arc<PreferenceBook>> {
    let book = PreferenceBook::new();
    for (iban, update) in entries {
        book.apply(account_key(iban)?, *update);
    }
    Ok(Arc::new(book))
}

#[tokio::test]
async fn test_account_preferences_override_global_threshold() -> Result<()> {
    let store = Arc::new(AlertStorage::new());
    let scorer = ScriptedScorer::new(&[("TX-1", 0.85), ("TX-2", 0.6), ("TX-3", 0.69), ("TX-4", 0.7)]);
    let (pipeline, _) = create_pipeline(scorer, store.clone(), fast_settings());
    let pipeline = pipeline.with_preferences(book(&[
        (IBAN_A, PreferenceUpdate { notifications: None, level: Some(ThresholdLevel::Alto) }),
        (IBAN_C, PreferenceUpdate::default())
    ])?);

    let summary = pipeline.ingest(&batch(vec![
        record(IBAN_A, "TX-1", 1.0),
        record(IBAN_B, "TX-2", 1.0),
        record(IBAN_C, "TX-3", 1.0),
        record(IBAN_C, "TX-4", 1.0)
    ])).await?;

    assert_eq!(summary.alerts_created, 2);

    let mut codes: Vec<String> = store.query(&AlertFilter::default()).await?
        .into_iter()
        .map(|stored| stored.alert.transaction_code)
        .collect();
    codes.sort();
    assert_eq!(codes, vec!["TX-2", "TX-4"]);

    Ok(())
}

#[tokio::test]
async fn test_muted_accounts_are_not_scored() -> Result<()> {
    let store = Arc::new(AlertStorage::new());
    let scorer = ScriptedScorer::new(&[("TX-1", 0.99), ("TX-2", 0.99)]);
    let (pipeline, scorer) = create_pipeline(scorer, store.clone(), fast_settings());
    let pipeline = pipeline.with_preferences(book(&[
        (IBAN_A, PreferenceUpdate { notifications: Some(false), level: Some(ThresholdLevel::Bajo) })
    ])?);

    let summary = pipeline.ingest(&batch(vec![record(IBAN_A, "TX-1", 1.0), record(IBAN_B, "TX-2", 1.0)])).await?;

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.muted, 1);
    assert_eq!(summary.alerts_created, 1);
    assert_eq!(scorer.calls(), 1);

    Ok(())
}

#[tokio::test]
async fn test_batch_of_only_muted_accounts_is_not_an_outage() -> Result<()> {
    let store = Arc::new(AlertStorage::new());
    let (pipeline, scorer) = create_pipeline(ScriptedScorer::new(&[]), store, fast_settings());
    let pipeline = pipeline.with_preferences(book(&[
        (IBAN_A, PreferenceUpdate { notifications: Some(false), level: None })
    ])?);

    let summary = pipeline.ingest(&batch(vec![record(IBAN_A, "TX-1", 1.0)])).await?;

    assert_eq!(summary.muted, 1);
    assert_eq!(scorer.calls(), 0);

    Ok(())
}

#[tokio::test]
async fn test_written_alert_round_trips_through_iban_filter() -> Result<()> {
    let store = Arc::new(AlertStorage::new());
    let (pipeline, _) = create_pipeline(ScriptedScorer::new(&[("TX-1", 0.83)]), store.clone(), fast_settings());

    pipeline.ingest(&batch(vec![record(IBAN_B, "TX-1", -120.5)])).await?;

    let filter = AlertFilter { iban: Some(IbanMatch::exact(IBAN_B)), ..AlertFilter::default() };
    let alerts = store.query(&filter).await?;
    let alert = &alerts.first().ok_or_else(|| anyhow!("alert missing"))?.alert;

    assert_eq!(alert.iban.as_str(), IBAN_B);
    assert_eq!(alert.transaction_code, "TX-1");
    assert_eq!(alert.amount.to_string(), "-120.5");
    assert_eq!(alert.probability.value(), 0.83);
    assert_eq!(alert.collector_iban.as_deref(), Some("COLLECTOR-TX-1"));

    Ok(())
}

#[tokio::test]
async fn test_ingest_slice_rejects_missing_transactions_key() -> Result<()> {
    let store = Arc::new(AlertStorage::new());
    let (pipeline, scorer) = create_pipeline(ScriptedScorer::new(&[]), store.clone(), fast_settings());

    let result = pipeline.ingest_slice(b"{}").await;

    assert!(matches!(result, Err(PipelineError::Malformed(_))));
    assert_eq!(scorer.calls(), 0);
    assert!(store.is_empty());

    Ok(())
}

#[test]
fn test_invalid_record_reason_is_structured() {
    let reason = InvalidRecord::DuplicateTransactionCode("TX-1".to_string());
    assert_eq!(reason.to_string(), "Transaction code [TX-1] repeats an earlier record of the batch");
}
