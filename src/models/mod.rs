mod alert;
mod errors;
mod summary;
mod transaction;
mod validator;

use serde::Serialize;
use std::fmt;
use std::fmt::{Display, Formatter};

use crate::types::Probability;

pub use alert::Alert;
pub use errors::InvalidRecord;
pub use summary::BatchSummary;
pub use transaction::Transaction;
pub use validator::{validate, ValidationRules};

/// Presentation bucket derived from an alert score.
///
/// Buckets are computed when an alert is rendered and are never stored, so the cutoffs can
/// move without touching persisted alerts. Variants are ordered from lowest to highest tier.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Serialize)]
pub enum Severity {
    Baja,
    Media,
    Alta
}

impl Severity {
    pub const HIGH_CUTOFF: f64 = 0.8;
    pub const MEDIUM_CUTOFF: f64 = 0.6;

    pub fn classify(score: Probability) -> Self {
        let score = score.value();

        if score >= Self::HIGH_CUTOFF {
            Severity::Alta
        } else if score >= Self::MEDIUM_CUTOFF {
            Severity::Media
        } else {
            Severity::Baja
        }
    }
}

impl Display for Severity {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Baja => "Baja",
            Severity::Media => "Media",
            Severity::Alta => "Alta"
        };

        formatter.write_str(label)
    }
}
