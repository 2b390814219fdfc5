mod book;
mod errors;

use serde::{Deserialize, Serialize};

use crate::types::{Iban, IbanError};

pub use book::PreferenceBook;
pub use errors::PreferenceError;

/// Alert sensitivity chosen for one account.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdLevel {
    /// Only the strongest signals.
    Alto,
    #[default]
    Medio,
    Bajo
}

impl ThresholdLevel {
    pub const ALTO_CUTOFF: f64 = 0.90;
    pub const MEDIO_CUTOFF: f64 = 0.70;
    pub const BAJO_CUTOFF: f64 = 0.50;

    pub fn cutoff(self) -> f64 {
        match self {
            ThresholdLevel::Alto => Self::ALTO_CUTOFF,
            ThresholdLevel::Medio => Self::MEDIO_CUTOFF,
            ThresholdLevel::Bajo => Self::BAJO_CUTOFF
        }
    }
}

/// Per-account override of the global alert threshold.
///
/// A missing `umbral` means `medio`. With `notificaciones` off no alert is created for the
/// account and its transactions are not scored.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct AlertPreference {
    #[serde(rename = "notificaciones", default = "enabled")]
    pub notifications: bool,
    #[serde(rename = "umbral", default)]
    pub level: Option<ThresholdLevel>
}

fn enabled() -> bool {
    true
}

impl Default for AlertPreference {
    fn default() -> Self {
        Self {
            notifications: true,
            level: Some(ThresholdLevel::Medio)
        }
    }
}

impl AlertPreference {
    /// Score an alert needs for this account, or `None` while notifications are off.
    pub fn cutoff(&self) -> Option<f64> {
        self.notifications.then(|| self.level.unwrap_or_default().cutoff())
    }
}

/// Partial change to a stored preference. Absent fields keep their current value.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PreferenceUpdate {
    #[serde(rename = "notificaciones")]
    pub notifications: Option<bool>,
    #[serde(rename = "umbral")]
    pub level: Option<ThresholdLevel>
}

impl PreferenceUpdate {
    /// # Errors
    /// `PreferenceError::Malformed` when the body is not a JSON object of the expected shape.
    pub fn from_slice(body: &[u8]) -> Result<Self, PreferenceError> {
        serde_json::from_slice(body).map_err(|error| PreferenceError::Malformed(format!(
            "se espera {{\"notificaciones\": booleano, \"umbral\": alto|medio|bajo}}: {error}"
        )))
    }
}

/// Preferences are keyed by layout-checked IBANs, so anonymised feeds can be configured too.
pub fn account_key(raw: &str) -> Result<Iban, PreferenceError> {
    Iban::structural(raw).map_err(|source: IbanError| PreferenceError::InvalidIban {
        iban: raw.to_string(),
        source
    })
}
