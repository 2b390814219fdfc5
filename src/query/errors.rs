use thiserror::Error;

use crate::storage::StoreError;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("{0}")]
    InvalidFilter(String),
    #[error(transparent)]
    StoreUnavailable(#[from] StoreError)
}
