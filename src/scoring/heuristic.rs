use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;

use crate::models::Transaction;
use crate::scoring::{Assessment, FraudScorer, ScorerError};
use crate::types::Probability;

const BIAS: f64 = -3.0;
const FIRST_CHARGE_WEIGHT: f64 = 1.6;
const RECURRING_WEIGHT: f64 = 0.9;
const UNMAPPED_PRODUCT_WEIGHT: f64 = 0.5;
const MAGNITUDE_WEIGHT: f64 = 0.35;

/// Local rule-based model used when no remote scorer is configured.
///
/// A logistic score over a handful of record features: an unfamiliar collector, a recurring
/// charge, an unmapped product and the size of the amount all push the probability up.
/// Scores are rounded to three decimals so identical records always share a score.
#[derive(Debug, Default, Clone)]
pub struct HeuristicScorer;

impl HeuristicScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate(&self, transaction: &Transaction) -> f64 {
        let magnitude = transaction.amount.abs().to_f64().unwrap_or(f64::MAX);

        let mut logit = BIAS;
        logit += FIRST_CHARGE_WEIGHT * indicator(transaction.first_charge_with_collector);
        logit += RECURRING_WEIGHT * indicator(transaction.recurring);
        logit += UNMAPPED_PRODUCT_WEIGHT * indicator(transaction.product.trim().is_empty());
        logit += MAGNITUDE_WEIGHT * magnitude.ln_1p();

        let probability = 1.0 / (1.0 + (-logit).exp());

        (probability * 1000.0).round() / 1000.0
    }
}

fn indicator(flag: bool) -> f64 {
    if flag { 1.0 } else { 0.0 }
}

#[async_trait]
impl FraudScorer for HeuristicScorer {
    async fn score(&self, transaction: &Transaction) -> Result<Assessment, ScorerError> {
        let probability = Probability::new(self.evaluate(transaction))?;

        Ok(Assessment::new(probability))
    }

    fn name(&self) -> &str {
        "heuristic"
    }
}
