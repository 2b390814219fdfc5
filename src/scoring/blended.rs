use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::warn;

use crate::models::Transaction;
use crate::scoring::{Assessment, FraudScorer, ScorerError};
use crate::types::Probability;

const NEUTRAL_SCORE: f64 = 0.5;

/// Equal-weight average over several scorers, all consulted concurrently.
///
/// A member that fails contributes a neutral score of 0.5 as long as at least one member
/// answered. The average is rounded to three decimals, like the heuristic score. If every member fails the last error is returned, so the pipeline retry policy
/// still applies. The first resolved collector account wins.
pub struct BlendedScorer {
    members: Vec<Arc<dyn FraudScorer>>
}

impl BlendedScorer {
    pub fn new(members: Vec<Arc<dyn FraudScorer>>) -> Self {
        Self { members }
    }
}

#[async_trait]
impl FraudScorer for BlendedScorer {
    async fn score(&self, transaction: &Transaction) -> Result<Assessment, ScorerError> {
        let results = join_all(self.members.iter().map(|member| member.score(transaction))).await;

        let mut total = 0.0;
        let mut answered = 0;
        let mut collector_iban = None;
        let mut last_error = None;

        for (member, result) in self.members.iter().zip(results) {
            match result {
                Ok(assessment) => {
                    total += assessment.probability.value();
                    answered += 1;
                    collector_iban = collector_iban.or(assessment.collector_iban);
                }
                Err(error) => {
                    warn!("Scorer [{}] failed for transaction [{}]: {error}", member.name(), transaction.transaction_code);
                    total += NEUTRAL_SCORE;
                    last_error = Some(error);
                }
            }
        }

        if answered == 0 {
            return Err(last_error.unwrap_or_else(|| ScorerError::Unavailable("no scorers configured".to_string())));
        }

        let average = (total / self.members.len() as f64 * 1000.0).round() / 1000.0;

        Ok(Assessment {
            probability: Probability::new(average.clamp(0.0, 1.0))?,
            collector_iban
        })
    }

    fn name(&self) -> &str {
        "blended"
    }
}
