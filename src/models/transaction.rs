use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::types::Iban;

/// A validated batch record, ready to be scored.
///
/// Only the validator builds these, so every field already satisfies its format rules.
/// Serialisation keeps the upload field names because the same shape is forwarded to
/// remote scorers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    /// Payer account.
    #[serde(rename = "IBAN")]
    pub iban: Iban,
    /// Product category as mapped by the upstream feed. May be empty.
    #[serde(rename = "producto_map")]
    pub product: String,
    /// Normalised name of the collecting company.
    #[serde(rename = "empresa_cobradora_norm")]
    pub collector: String,
    /// Signed amount of the charge.
    #[serde(rename = "valor", with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(rename = "fecha")]
    pub date: NaiveDate,
    #[serde(rename = "recurrente")]
    pub recurring: bool,
    /// Whether this is the first charge from the collecting company to this account.
    #[serde(rename = "primer_gasto_con_empresa")]
    pub first_charge_with_collector: bool,
    /// Correlation key copied onto any alert raised for this record.
    #[serde(rename = "codigo_transaccion")]
    pub transaction_code: String
}
