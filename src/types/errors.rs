use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum IbanError {
    #[error("IBAN error: value is empty")]
    Empty,
    #[error("IBAN error: length {0} is outside 15..=34")]
    Length(usize),
    #[error("IBAN error: '{0}' is not a valid country code")]
    CountryCode(String),
    #[error("IBAN error: check digits must be numeric")]
    CheckDigits,
    #[error("IBAN error: account part must be alphanumeric")]
    Characters,
    #[error("IBAN error: checksum mismatch")]
    Checksum
}

#[derive(Debug, Error, PartialEq)]
pub enum ProbabilityError {
    #[error("Probability error: '{0}' is not a number")]
    NotANumber(String),
    #[error("Probability error: {0} is outside [0, 1]")]
    OutOfRange(f64)
}
