use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::{Severity, Transaction};
use crate::types::{Iban, Probability};

/// A persisted fraud alert.
///
/// Alerts are snapshots: the amount is copied from the transaction when the alert is
/// raised and nothing about an alert changes afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    #[serde(rename = "IBAN")]
    pub iban: Iban,
    #[serde(rename = "codigo_transaccion")]
    pub transaction_code: String,
    #[serde(rename = "importe", with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(rename = "umbral_probabilistico")]
    pub probability: Probability,
    /// Account of the collecting company, when the scorer could resolve one.
    #[serde(rename = "IBAN_empresa_cobradora")]
    pub collector_iban: Option<String>
}

impl Alert {
    pub fn snapshot(transaction: &Transaction, probability: Probability, collector_iban: Option<String>) -> Self {
        Self {
            iban: transaction.iban.clone(),
            transaction_code: transaction.transaction_code.clone(),
            amount: transaction.amount,
            probability,
            collector_iban
        }
    }

    pub fn severity(&self) -> Severity {
        Severity::classify(self.probability)
    }
}
