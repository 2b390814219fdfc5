use crate::types::errors::ProbabilityError;
use serde::Serialize;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// A finite score in the closed interval `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Probability(f64);

impl Probability {
    pub const HALF: Probability = Probability(0.5);

    pub fn new(value: f64) -> Result<Self, ProbabilityError> {
        if value.is_nan() {
            return Err(ProbabilityError::NotANumber(value.to_string()));
        }

        if !(0.0..=1.0).contains(&value) {
            return Err(ProbabilityError::OutOfRange(value));
        }

        Ok(Probability(value))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl FromStr for Probability {
    type Err = ProbabilityError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let parsed: f64 = trimmed.parse()
            .map_err(|_| ProbabilityError::NotANumber(trimmed.to_string()))?;

        Probability::new(parsed)
    }
}

impl Display for Probability {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}
