mod alert_storage;
mod errors;

use async_trait::async_trait;

use crate::models::Alert;
use crate::types::{AlertId, Iban, Probability};

pub use alert_storage::AlertStorage;
pub use errors::StoreError;

/// An alert together with the key the store assigned to it.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredAlert {
    pub id: AlertId,
    pub alert: Alert
}

/// How an IBAN filter is compared against stored accounts. Both sides are normalised first.
#[derive(Debug, Clone, PartialEq)]
pub enum IbanMatch {
    Exact(String),
    Prefix(String)
}

impl IbanMatch {
    pub fn exact(value: &str) -> Self {
        IbanMatch::Exact(Iban::normalise(value))
    }

    pub fn prefix(value: &str) -> Self {
        IbanMatch::Prefix(Iban::normalise(value))
    }

    pub fn matches(&self, iban: &Iban) -> bool {
        match self {
            IbanMatch::Exact(expected) => iban.as_str() == expected,
            IbanMatch::Prefix(prefix) => iban.as_str().starts_with(prefix.as_str())
        }
    }
}

/// Conjunction of optional predicates. An empty filter matches every alert.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertFilter {
    pub iban: Option<IbanMatch>,
    /// Inclusive lower bound on the alert probability.
    pub min_score: Option<Probability>
}

impl AlertFilter {
    pub fn matches(&self, alert: &Alert) -> bool {
        let iban_ok = self.iban.as_ref()
            .is_none_or(|matcher| matcher.matches(&alert.iban));
        let score_ok = self.min_score
            .is_none_or(|minimum| alert.probability.value() >= minimum.value());

        iban_ok && score_ok
    }
}

/// Append-only alert collection shared by every ingestion and query request.
///
/// `put` must be linearizable per alert so that concurrent ingestion workers never lose a
/// write. `query` makes no ordering promise.
#[async_trait]
pub trait AlertStore: Send + Sync + 'static {
    async fn put(&self, alert: Alert) -> Result<AlertId, StoreError>;
    async fn query(&self, filter: &AlertFilter) -> Result<Vec<StoredAlert>, StoreError>;
    async fn count(&self) -> Result<usize, StoreError>;
}
