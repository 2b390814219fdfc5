use std::time::Duration;

use thiserror::Error;

use crate::types::ProbabilityError;

#[derive(Debug, Error)]
pub enum ScorerError {
    #[error("Scorer unavailable: {0}")]
    Unavailable(String),
    #[error("Scorer timed out after {0:?}")]
    Timeout(Duration),
    #[error("Scorer returned an invalid score: {0}")]
    InvalidScore(#[from] ProbabilityError)
}
