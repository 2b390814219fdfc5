mod blended;
mod errors;
mod heuristic;
mod http;

use async_trait::async_trait;

use crate::models::Transaction;
use crate::types::Probability;

pub use blended::BlendedScorer;
pub use errors::ScorerError;
pub use heuristic::HeuristicScorer;
pub use http::HttpScorer;

/// What a scorer concluded about one transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub probability: Probability,
    /// Account of the collecting company, when the scorer can resolve it.
    pub collector_iban: Option<String>
}

impl Assessment {
    pub fn new(probability: Probability) -> Self {
        Self {
            probability,
            collector_iban: None
        }
    }
}

/// Fraud-probability model consulted once per valid record.
///
/// Implementations may block on the network; the pipeline bounds every call with its own
/// timeout and retry policy, so a scorer only has to report what happened.
#[async_trait]
pub trait FraudScorer: Send + Sync + 'static {
    async fn score(&self, transaction: &Transaction) -> Result<Assessment, ScorerError>;

    /// Returns a stable name for logging.
    fn name(&self) -> &str;
}
