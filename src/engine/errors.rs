use thiserror::Error;

use crate::models::BatchSummary;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    Malformed(String),
    #[error("Fraud scorer unavailable: all {attempted} scored records failed")]
    ScorerUnavailable {
        attempted: usize,
        summary: BatchSummary
    },
    #[error("Alert store unavailable: none of {attempted} alert writes succeeded")]
    StoreUnavailable {
        attempted: usize,
        summary: BatchSummary
    }
}
