use crate::types::errors::IbanError;
use serde::Serialize;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

const MIN_LENGTH: usize = 15;
const MAX_LENGTH: usize = 34;

/// A normalised International Bank Account Number.
///
/// Input is accepted in either the electronic form (`ES9121000418450200051332`) or the
/// grouped print form (`ES91 2100 0418 4502 0005 1332`), and is stored uppercased without
/// whitespace so that filters compare against a single canonical spelling.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Iban(String);

impl Iban {
    /// Parses and checks layout only: country code, numeric check digits, alphanumeric body.
    ///
    /// Used for anonymised feeds whose account numbers no longer carry a valid checksum.
    pub fn structural(value: &str) -> Result<Self, IbanError> {
        let normalised = Iban::normalise(value);

        if normalised.is_empty() {
            return Err(IbanError::Empty);
        }

        if !(MIN_LENGTH..=MAX_LENGTH).contains(&normalised.len()) {
            return Err(IbanError::Length(normalised.len()));
        }

        let bytes = normalised.as_bytes();

        if !bytes[..2].iter().all(u8::is_ascii_uppercase) {
            return Err(IbanError::CountryCode(normalised.chars().take(2).collect()));
        }

        if !bytes[2..4].iter().all(u8::is_ascii_digit) {
            return Err(IbanError::CheckDigits);
        }

        if !bytes[4..].iter().all(u8::is_ascii_alphanumeric) {
            return Err(IbanError::Characters);
        }

        Ok(Iban(normalised))
    }

    /// ISO 13616 mod-97 check, computed incrementally so the number never overflows.
    pub fn has_valid_checksum(&self) -> bool {
        let (head, tail) = self.0.split_at(4);
        let mut remainder: u32 = 0;

        for character in tail.chars().chain(head.chars()) {
            let Some(value) = character.to_digit(36) else {
                return false;
            };

            remainder = if value >= 10 {
                (remainder * 100 + value) % 97
            } else {
                (remainder * 10 + value) % 97
            };
        }

        remainder == 1
    }

    /// Uppercases and strips whitespace, the canonical form used for storage and filtering.
    pub fn normalise(value: &str) -> String {
        value.chars()
            .filter(|character| !character.is_whitespace())
            .map(|character| character.to_ascii_uppercase())
            .collect()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Iban {
    type Err = IbanError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let iban = Iban::structural(value)?;

        if !iban.has_valid_checksum() {
            return Err(IbanError::Checksum);
        }

        Ok(iban)
    }
}

impl Display for Iban {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}
