use thiserror::Error;

use crate::types::IbanError;

#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("IBAN '{iban}' no es válido: {source}")]
    InvalidIban {
        iban: String,
        #[source]
        source: IbanError
    },
    #[error("Preferencias mal formadas: {0}")]
    Malformed(String),
    #[error("No hay preferencias para el IBAN '{0}'")]
    NotFound(String)
}
