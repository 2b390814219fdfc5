use crate::types::IbanError;
use thiserror::Error;

/// Why a single batch record was rejected before scoring.
#[derive(Debug, Error, PartialEq)]
pub enum InvalidRecord {
    #[error("Record is not a JSON object")]
    NotAnObject,
    #[error("Missing field [{0}]")]
    MissingField(&'static str),
    #[error("Field [{field}] must be a {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str
    },
    #[error("Malformed IBAN: {0}")]
    MalformedIban(#[from] IbanError),
    #[error("Malformed date [{0}]")]
    MalformedDate(String),
    #[error("Malformed amount [{0}]")]
    MalformedAmount(String),
    #[error("Transaction code is empty")]
    EmptyTransactionCode,
    #[error("Transaction code [{0}] repeats an earlier record of the batch")]
    DuplicateTransactionCode(String)
}
