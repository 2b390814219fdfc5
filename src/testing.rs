use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::time::sleep;

use crate::models::{Alert, Transaction};
use crate::scoring::{Assessment, FraudScorer, ScorerError};
use crate::storage::{AlertFilter, AlertStorage, AlertStore, StoreError, StoredAlert};
use crate::types::{AlertId, Probability};

pub const IBAN_A: &str = "ES9121000418450200051332";
pub const IBAN_B: &str = "DE89370400440532013000";
pub const IBAN_C: &str = "GB82WEST12345698765432";

pub fn record(iban: &str, code: &str, amount: f64) -> Value {
    json!({
        "IBAN": iban,
        "producto_map": "suscripcion",
        "empresa_cobradora_norm": "gimnasio central",
        "valor": amount,
        "fecha": "2025-06-01",
        "recurrente": true,
        "primer_gasto_con_empresa": false,
        "codigo_transaccion": code
    })
}

/// Scores by transaction code. Codes listed in `failures` fail that many times before answering;
/// unknown codes always fail.
pub struct ScriptedScorer {
    scores: HashMap<String, f64>,
    failures: Mutex<HashMap<String, usize>>,
    delay: Option<Duration>,
    calls: AtomicUsize
}

impl ScriptedScorer {
    pub fn new(scores: &[(&str, f64)]) -> Self {
        Self {
            scores: scores.iter().map(|(code, score)| (code.to_string(), *score)).collect(),
            failures: Mutex::new(HashMap::new()),
            delay: None,
            calls: AtomicUsize::new(0)
        }
    }

    pub fn failing(mut self, code: &str, times: usize) -> Self {
        if let Ok(failures) = self.failures.get_mut() {
            failures.insert(code.to_string(), times);
        }
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FraudScorer for ScriptedScorer {
    async fn score(&self, transaction: &Transaction) -> Result<Assessment, ScorerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            sleep(delay).await;
        }

        let should_fail = {
            let mut failures = self.failures.lock()
                .map_err(|_| ScorerError::Unavailable("poisoned".to_string()))?;

            match failures.get_mut(&transaction.transaction_code) {
                Some(remaining) if *remaining > 0 => {
                    *remaining -= 1;
                    true
                }
                _ => false
            }
        };

        if should_fail {
            return Err(ScorerError::Unavailable("scripted failure".to_string()));
        }

        let score = self.scores.get(&transaction.transaction_code)
            .ok_or_else(|| ScorerError::Unavailable(format!("no score for {}", transaction.transaction_code)))?;

        Ok(Assessment {
            probability: Probability::new(*score)?,
            collector_iban: Some(format!("COLLECTOR-{}", transaction.transaction_code))
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Wraps the in-memory store with injectable write failures and an outage switch.
pub struct FlakyStore {
    inner: AlertStorage,
    put_failures: Mutex<HashMap<String, usize>>,
    unavailable: bool,
    queries: AtomicUsize
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: AlertStorage::new(),
            put_failures: Mutex::new(HashMap::new()),
            unavailable: false,
            queries: AtomicUsize::new(0)
        }
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::new()
        }
    }

    pub fn failing_put(mut self, code: &str, times: usize) -> Self {
        if let Ok(failures) = self.put_failures.get_mut() {
            failures.insert(code.to_string(), times);
        }
        self
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AlertStore for FlakyStore {
    async fn put(&self, alert: Alert) -> Result<AlertId, StoreError> {
        if self.unavailable {
            return Err(StoreError::Unavailable("outage".to_string()));
        }

        let should_fail = {
            let mut failures = self.put_failures.lock()
                .map_err(|_| StoreError::Unavailable("poisoned".to_string()))?;

            match failures.get_mut(&alert.transaction_code) {
                Some(remaining) if *remaining > 0 => {
                    *remaining -= 1;
                    true
                }
                _ => false
            }
        };

        if should_fail {
            return Err(StoreError::Unavailable("scripted write failure".to_string()));
        }

        self.inner.put(alert).await
    }

    async fn query(&self, filter: &AlertFilter) -> Result<Vec<StoredAlert>, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);

        if self.unavailable {
            return Err(StoreError::Unavailable("outage".to_string()));
        }

        self.inner.query(filter).await
    }

    async fn count(&self) -> Result<usize, StoreError> {
        if self.unavailable {
            return Err(StoreError::Unavailable("outage".to_string()));
        }

        self.inner.count().await
    }
}
