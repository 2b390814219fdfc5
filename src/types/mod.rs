mod errors;
mod iban;
mod probability;

pub use errors::{IbanError, ProbabilityError};
pub use iban::Iban;
pub use probability::Probability;

/// Monotonic key assigned by the alert store on insertion.
pub type AlertId = u64;
