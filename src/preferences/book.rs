use std::collections::HashMap;

use dashmap::DashMap;
use tracing::info;

use crate::preferences::{account_key, AlertPreference, PreferenceError, PreferenceUpdate};
use crate::types::Iban;

/// Alert preferences of the accounts that have any, keyed by normalised IBAN.
///
/// Accounts without an entry use the global alert threshold.
#[derive(Debug, Default)]
pub struct PreferenceBook {
    profiles: DashMap<Iban, AlertPreference>
}

impl PreferenceBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a JSON object mapping IBANs to `{ "notificaciones", "umbral" }`.
    ///
    /// # Errors
    /// `PreferenceError::Malformed` on a body of the wrong shape, `InvalidIban` on a bad key.
    pub fn from_json(body: &[u8]) -> Result<Self, PreferenceError> {
        let raw: HashMap<String, AlertPreference> = serde_json::from_slice(body)
            .map_err(|error| PreferenceError::Malformed(error.to_string()))?;

        let book = PreferenceBook::new();
        for (iban, preference) in raw {
            book.profiles.insert(account_key(&iban)?, preference);
        }

        info!("Loaded alert preferences for {} accounts", book.len());

        Ok(book)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn get(&self, iban: &Iban) -> Option<AlertPreference> {
        self.profiles.get(iban).map(|entry| *entry.value())
    }

    /// Merges `update` into the account's preference, creating it from the defaults.
    pub fn apply(&self, iban: Iban, update: PreferenceUpdate) -> AlertPreference {
        let mut entry = self.profiles.entry(iban).or_default();

        if let Some(notifications) = update.notifications {
            entry.notifications = notifications;
        }

        if let Some(level) = update.level {
            entry.level = Some(level);
        }

        *entry
    }

    pub fn remove(&self, iban: &Iban) -> Option<AlertPreference> {
        self.profiles.remove(iban).map(|(_, preference)| preference)
    }

    /// Score an alert for `iban` needs: its own cutoff, else `default`. `None` when muted.
    pub fn threshold_for(&self, iban: &Iban, default: f64) -> Option<f64> {
        match self.get(iban) {
            Some(preference) => preference.cutoff(),
            None => Some(default)
        }
    }
}
