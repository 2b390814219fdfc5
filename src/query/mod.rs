mod errors;
mod service;

use clap::ValueEnum;
use serde::Deserialize;

use crate::storage::IbanMatch;
use crate::types::Probability;

pub use errors::QueryError;
pub use service::AlertQueryService;

/// How the `iban` filter is applied. Exact is the default; prefix must be opted into.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, ValueEnum)]
pub enum IbanMatchMode {
    #[default]
    Exact,
    Prefix
}

impl IbanMatchMode {
    pub fn matcher(self, value: &str) -> IbanMatch {
        match self {
            IbanMatchMode::Exact => IbanMatch::exact(value),
            IbanMatchMode::Prefix => IbanMatch::prefix(value)
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct QuerySettings {
    pub iban_match: IbanMatchMode,
    /// Page size used when the caller does not ask for one.
    pub page_size: usize,
    /// Hard cap on a single response, whatever the caller asks for.
    pub max_page_size: usize
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            iban_match: IbanMatchMode::Exact,
            page_size: 500,
            max_page_size: 5_000
        }
    }
}

/// Query-string parameters exactly as received. Blank values count as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub iban: Option<String>,
    pub min_score: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>
}

/// A checked listing request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListRequest {
    pub iban: Option<String>,
    pub min_score: Option<Probability>,
    pub limit: Option<usize>,
    pub offset: usize
}

impl ListParams {
    /// # Errors
    /// `QueryError::InvalidFilter` when `min_score` is not a number in `[0, 1]`, or when `limit`
    /// or `offset` are not non-negative integers (`limit` must also be at least one).
    pub fn parse(self) -> Result<ListRequest, QueryError> {
        let min_score = present(self.min_score)
            .map(|raw| raw.parse::<Probability>()
                .map_err(|error| QueryError::InvalidFilter(format!("min_score debe ser numérico entre 0 y 1: {error}"))))
            .transpose()?;

        let limit = present(self.limit)
            .map(|raw| match raw.parse::<usize>() {
                Ok(limit) if limit > 0 => Ok(limit),
                _ => Err(QueryError::InvalidFilter(format!("limit debe ser un entero positivo: '{raw}'")))
            })
            .transpose()?;

        let offset = present(self.offset)
            .map(|raw| raw.parse::<usize>()
                .map_err(|_| QueryError::InvalidFilter(format!("offset debe ser un entero no negativo: '{raw}'"))))
            .transpose()?
            .unwrap_or(0);

        Ok(ListRequest {
            iban: present(self.iban),
            min_score,
            limit,
            offset
        })
    }
}

fn present(value: Option<String>) -> Option<String> {
    value.map(|raw| raw.trim().to_string()).filter(|raw| !raw.is_empty())
}
