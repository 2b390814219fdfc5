use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::models::Alert;
use crate::storage::{AlertFilter, AlertStore, StoreError, StoredAlert};
use crate::types::AlertId;

/// In-process alert store keyed by a monotonic insertion id.
///
/// Keys come from an atomic counter and each alert is written with a single map insert, so
/// concurrent `put`s never contend on a read-modify-write.
pub struct AlertStorage {
    cache: Arc<DashMap<AlertId, Alert>>,
    next_id: AtomicU64
}

impl AlertStorage {
    pub fn new() -> Self {
        Self {
            cache: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(1)
        }
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

impl Default for AlertStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AlertStore for AlertStorage {
    async fn put(&self, alert: Alert) -> Result<AlertId, StoreError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.cache.insert(id, alert);

        Ok(id)
    }

    async fn query(&self, filter: &AlertFilter) -> Result<Vec<StoredAlert>, StoreError> {
        let alerts = self.cache.iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| StoredAlert { id: *entry.key(), alert: entry.value().clone() })
            .collect();

        Ok(alerts)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.len())
    }
}
