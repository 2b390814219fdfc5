use serde::{Deserialize, Serialize};

/// Outcome of one ingested batch.
///
/// `procesadas` accounts for every submitted record exactly once. The optional counters
/// break down the records that did not reach a confirmed outcome and are left out of the
/// wire form while they are zero.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    #[serde(rename = "procesadas")]
    pub processed: usize,
    #[serde(rename = "alertas_creadas")]
    pub alerts_created: usize,
    #[serde(rename = "invalidas", default, skip_serializing_if = "is_zero")]
    pub invalid: usize,
    #[serde(rename = "duplicadas", default, skip_serializing_if = "is_zero")]
    pub duplicates: usize,
    /// Records of accounts that turned notifications off.
    #[serde(rename = "silenciadas", default, skip_serializing_if = "is_zero")]
    pub muted: usize,
    #[serde(rename = "fallos_puntuacion", default, skip_serializing_if = "is_zero")]
    pub scoring_failures: usize,
    #[serde(rename = "fallos_escritura", default, skip_serializing_if = "is_zero")]
    pub write_failures: usize
}

fn is_zero(value: &usize) -> bool {
    *value == 0
}
