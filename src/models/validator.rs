use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::{Map, Number, Value};
use std::str::FromStr;

use crate::models::{InvalidRecord, Transaction};
use crate::types::Iban;

/// Knobs the validator honours. The defaults apply the full ISO 13616 checksum.
#[derive(Debug, Clone, Copy)]
pub struct ValidationRules {
    pub verify_iban_checksum: bool
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            verify_iban_checksum: true
        }
    }
}

/// Checks one raw batch record and converts it into a [`Transaction`].
///
/// This is the only place the loose upload shape is trusted. The function is pure: the same
/// input always produces the same outcome and nothing outside the record is consulted, so
/// uniqueness of `codigo_transaccion` across the batch is left to the caller.
///
/// # Errors
/// Returns the first [`InvalidRecord`] reason found, checking fields in wire order.
pub fn validate(record: &Value, rules: &ValidationRules) -> Result<Transaction, InvalidRecord> {
    let Value::Object(fields) = record else {
        return Err(InvalidRecord::NotAnObject)
    };

    let raw_iban = required_string(fields, "IBAN")?;
    let iban = if rules.verify_iban_checksum {
        Iban::from_str(raw_iban)?
    } else {
        Iban::structural(raw_iban)?
    };

    let product = required_string(fields, "producto_map")?.to_string();
    let collector = required_string(fields, "empresa_cobradora_norm")?.to_string();
    let amount = parse_amount(required(fields, "valor")?)?;

    let raw_date = required_string(fields, "fecha")?;
    let date = NaiveDate::parse_from_str(raw_date.trim(), "%Y-%m-%d")
        .map_err(|_| InvalidRecord::MalformedDate(raw_date.to_string()))?;

    let recurring = required_bool(fields, "recurrente")?;
    let first_charge_with_collector = required_bool(fields, "primer_gasto_con_empresa")?;

    let transaction_code = required_string(fields, "codigo_transaccion")?.trim();
    if transaction_code.is_empty() {
        return Err(InvalidRecord::EmptyTransactionCode)
    }

    Ok(Transaction {
        iban,
        product,
        collector,
        amount,
        date,
        recurring,
        first_charge_with_collector,
        transaction_code: transaction_code.to_string()
    })
}

fn required<'a>(fields: &'a Map<String, Value>, name: &'static str) -> Result<&'a Value, InvalidRecord> {
    match fields.get(name) {
        None | Some(Value::Null) => Err(InvalidRecord::MissingField(name)),
        Some(value) => Ok(value)
    }
}

fn required_string<'a>(fields: &'a Map<String, Value>, name: &'static str) -> Result<&'a str, InvalidRecord> {
    required(fields, name)?.as_str()
        .ok_or(InvalidRecord::WrongType { field: name, expected: "string" })
}

fn required_bool(fields: &Map<String, Value>, name: &'static str) -> Result<bool, InvalidRecord> {
    required(fields, name)?.as_bool()
        .ok_or(InvalidRecord::WrongType { field: name, expected: "boolean" })
}

//NOTE: JSON cannot carry NaN or infinities, so "finite" reduces to "fits a Decimal". Numeric strings
//      are tolerated because spreadsheet exports often quote amounts.
fn parse_amount(value: &Value) -> Result<Decimal, InvalidRecord> {
    match value {
        Value::Number(number) => decimal_from_number(number),
        Value::String(text) => decimal_from_text(text.trim()),
        other => Err(InvalidRecord::MalformedAmount(other.to_string()))
    }
}

fn decimal_from_number(number: &Number) -> Result<Decimal, InvalidRecord> {
    decimal_from_text(&number.to_string())
}

fn decimal_from_text(text: &str) -> Result<Decimal, InvalidRecord> {
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .map_err(|_| InvalidRecord::MalformedAmount(text.to_string()))
}
