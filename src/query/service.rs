use std::cmp::Ordering;
use std::sync::Arc;

use tracing::debug;

use crate::models::Alert;
use crate::query::{ListParams, ListRequest, QueryError, QuerySettings};
use crate::storage::{AlertFilter, AlertStore, StoredAlert};

/// Filtered, ordered and bounded listing over the alert store.
pub struct AlertQueryService {
    store: Arc<dyn AlertStore>,
    settings: QuerySettings
}

impl AlertQueryService {
    pub fn new(store: Arc<dyn AlertStore>, settings: QuerySettings) -> Self {
        Self { store, settings }
    }

    /// Validates raw parameters before the store is touched, then lists.
    pub async fn list_params(&self, params: ListParams) -> Result<Vec<Alert>, QueryError> {
        let request = params.parse()?;
        self.list(&request).await
    }

    /// Returns matching alerts ordered by descending probability, then transaction code, then
    /// insertion order. The page never exceeds `max_page_size`.
    ///
    /// # Errors
    /// Store failures are passed through untouched; the query path does not retry.
    pub async fn list(&self, request: &ListRequest) -> Result<Vec<Alert>, QueryError> {
        let filter = AlertFilter {
            iban: request.iban.as_deref().map(|iban| self.settings.iban_match.matcher(iban)),
            min_score: request.min_score
        };

        let mut alerts = self.store.query(&filter).await?;
        alerts.sort_by(compare);

        let limit = request.limit
            .unwrap_or(self.settings.page_size)
            .min(self.settings.max_page_size);

        debug!("Alert query {filter:?} matched {} alerts, returning at most {limit} from offset {}", alerts.len(), request.offset);

        Ok(alerts.into_iter()
            .skip(request.offset)
            .take(limit)
            .map(|stored| stored.alert)
            .collect())
    }

    pub async fn count(&self) -> Result<usize, QueryError> {
        Ok(self.store.count().await?)
    }
}

fn compare(left: &StoredAlert, right: &StoredAlert) -> Ordering {
    right.alert.probability.value().total_cmp(&left.alert.probability.value())
        .then_with(|| left.alert.transaction_code.cmp(&right.alert.transaction_code))
        .then_with(|| left.id.cmp(&right.id))
}
