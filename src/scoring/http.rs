use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::models::Transaction;
use crate::scoring::{Assessment, FraudScorer, ScorerError};
use crate::types::Probability;

#[derive(Debug, Deserialize)]
struct ScoreResponse {
    score: f64,
    #[serde(rename = "IBAN_empresa_cobradora", default)]
    collector_iban: Option<String>
}

/// Remote model reached over HTTP.
///
/// Each transaction is POSTed as JSON, using the upload field names, and the endpoint answers
/// `{ "score": <0..1>, "IBAN_empresa_cobradora": <string|null> }`.
pub struct HttpScorer {
    client: Client,
    endpoint: String,
    timeout: Duration
}

impl HttpScorer {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ScorerError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| ScorerError::Unavailable(error.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            timeout
        })
    }
}

#[async_trait]
impl FraudScorer for HttpScorer {
    async fn score(&self, transaction: &Transaction) -> Result<Assessment, ScorerError> {
        let response = self.client.post(&self.endpoint)
            .json(transaction)
            .send()
            .await
            .map_err(|error| self.transport_error(error))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScorerError::Unavailable(format!("{} answered {status}", self.endpoint)));
        }

        let body: ScoreResponse = response.json()
            .await
            .map_err(|error| self.transport_error(error))?;

        Ok(Assessment {
            probability: Probability::new(body.score)?,
            collector_iban: body.collector_iban.filter(|iban| !iban.trim().is_empty())
        })
    }

    fn name(&self) -> &str {
        &self.endpoint
    }
}

impl HttpScorer {
    fn transport_error(&self, error: reqwest::Error) -> ScorerError {
        if error.is_timeout() {
            ScorerError::Timeout(self.timeout)
        } else {
            ScorerError::Unavailable(format!("{}: {error}", self.endpoint))
        }
    }
}
