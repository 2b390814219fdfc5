use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Alert store unavailable: {0}")]
    Unavailable(String),
    #[error("Alert store timed out after {0:?}")]
    Timeout(Duration)
}
