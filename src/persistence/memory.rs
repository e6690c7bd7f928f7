//! In-memory store backend.
//!
//! [`MemoryStore`] keeps all records in `HashMap`s behind a single
//! [`tokio::sync::RwLock`]. Conditional semantics are exact: every trait
//! method takes the lock once, so each operation is atomic with respect
//! to concurrent callers. Used by tests and `PERSISTENCE_ENABLED=false`
//! runs.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::{Event, QueueRecord, RequestId, SongRequest, Transaction};

use super::store::{AdmissionStore, StoreError, Version};

#[derive(Debug, Default)]
struct Inner {
    events: HashMap<String, Event>,
    requests: HashMap<RequestId, SongRequest>,
    transactions: HashMap<String, Transaction>,
    queues: HashMap<String, (QueueRecord, Version)>,
}

/// In-process implementation of [`AdmissionStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an event record.
    ///
    /// Event creation belongs to the (external) event management flow;
    /// this exists so local runs and tests can seed state.
    pub async fn put_event(&self, event: Event) {
        let mut inner = self.inner.write().await;
        inner.events.insert(event.event_id.clone(), event);
    }

    /// Inserts or replaces a transaction record.
    ///
    /// Transactions are created by the external payment flow; this exists
    /// so local runs and tests can seed state.
    pub async fn put_transaction(&self, transaction: Transaction) {
        let mut inner = self.inner.write().await;
        inner
            .transactions
            .insert(transaction.transaction_id.clone(), transaction);
    }
}

#[async_trait]
impl AdmissionStore for MemoryStore {
    async fn get_event(&self, event_id: &str) -> Result<Option<Event>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.events.get(event_id).cloned())
    }

    async fn record_admission(&self, event_id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let event = inner
            .events
            .get_mut(event_id)
            .ok_or_else(|| StoreError::NotFound(format!("event {event_id}")))?;
        event.total_requests += 1;
        event.last_request_at = Some(at);
        Ok(())
    }

    async fn put_request_if_absent(&self, request: &SongRequest) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.requests.contains_key(&request.request_id) {
            return Err(StoreError::Conflict);
        }
        inner.requests.insert(request.request_id, request.clone());
        Ok(())
    }

    async fn get_request(&self, request_id: RequestId) -> Result<Option<SongRequest>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.requests.get(&request_id).cloned())
    }

    async fn finalize_request_position(
        &self,
        request_id: RequestId,
        position: u32,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let request = inner
            .requests
            .get_mut(&request_id)
            .ok_or_else(|| StoreError::NotFound(format!("request {request_id}")))?;
        request.queue_position = position;
        request.updated_at = at;
        Ok(())
    }

    async fn delete_request(&self, request_id: RequestId) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.requests.remove(&request_id);
        Ok(())
    }

    async fn count_user_requests_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let inner = self.inner.read().await;
        let count = inner
            .requests
            .values()
            .filter(|r| r.user_id == user_id && r.submitted_at >= since)
            .count();
        Ok(count as u64)
    }

    async fn find_latest_duplicate(
        &self,
        event_id: &str,
        user_id: &str,
        song_title: &str,
        artist_name: &str,
    ) -> Result<Option<SongRequest>, StoreError> {
        let inner = self.inner.read().await;
        let found = inner
            .requests
            .values()
            .filter(|r| {
                r.event_id == event_id
                    && r.user_id == user_id
                    && r.song_title == song_title
                    && r.artist_name == artist_name
                    && r.status != crate::domain::RequestStatus::Cancelled
            })
            .max_by_key(|r| r.submitted_at)
            .cloned();
        Ok(found)
    }

    async fn count_live_requests(&self, event_id: &str) -> Result<u64, StoreError> {
        let inner = self.inner.read().await;
        let count = inner
            .requests
            .values()
            .filter(|r| r.event_id == event_id && r.status.is_live())
            .count();
        Ok(count as u64)
    }

    async fn get_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Transaction>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.transactions.get(transaction_id).cloned())
    }

    async fn find_request_by_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<SongRequest>, StoreError> {
        let inner = self.inner.read().await;
        let found = inner
            .requests
            .values()
            .find(|r| r.transaction_id.as_deref() == Some(transaction_id))
            .cloned();
        Ok(found)
    }

    async fn load_queue(
        &self,
        event_id: &str,
    ) -> Result<Option<(QueueRecord, Version)>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.queues.get(event_id).cloned())
    }

    async fn store_queue(
        &self,
        record: &QueueRecord,
        expected: Option<Version>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        match (inner.queues.get(&record.event_id), expected) {
            (None, None) => {
                inner
                    .queues
                    .insert(record.event_id.clone(), (record.clone(), 1));
                Ok(())
            }
            (Some((_, current)), Some(version)) if *current == version => {
                let next = version + 1;
                inner
                    .queues
                    .insert(record.event_id.clone(), (record.clone(), next));
                Ok(())
            }
            // Record appeared, vanished, or moved under the caller.
            _ => Err(StoreError::Conflict),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{
        EventSettings, EventStatus, RequestStatus, RequestType, SongRequestInput,
    };

    fn make_event(event_id: &str) -> Event {
        Event {
            event_id: event_id.to_string(),
            status: EventStatus::Active,
            settings: EventSettings::default(),
            total_requests: 0,
            last_request_at: None,
        }
    }

    fn make_request(event_id: &str, user_id: &str, song: &str) -> SongRequest {
        let input = SongRequestInput {
            event_id: event_id.to_string(),
            user_id: user_id.to_string(),
            song_title: song.to_string(),
            artist_name: "Artist".to_string(),
            genre: None,
            request_type: RequestType::Standard,
            dedication: None,
            shoutout: None,
            transaction_id: None,
        };
        SongRequest::provisional(&input, 20.0, Utc::now())
    }

    #[tokio::test]
    async fn put_request_if_absent_rejects_same_id() {
        let store = MemoryStore::new();
        let request = make_request("evt-1", "user-1", "Song A");

        assert!(store.put_request_if_absent(&request).await.is_ok());
        let second = store.put_request_if_absent(&request).await;
        assert!(matches!(second, Err(StoreError::Conflict)));
    }

    #[tokio::test]
    async fn finalize_missing_request_is_not_found() {
        let store = MemoryStore::new();
        let result = store
            .finalize_request_position(RequestId::new(), 1, Utc::now())
            .await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_request_is_idempotent() {
        let store = MemoryStore::new();
        let request = make_request("evt-1", "user-1", "Song A");
        let _ = store.put_request_if_absent(&request).await;

        assert!(store.delete_request(request.request_id).await.is_ok());
        assert!(store.delete_request(request.request_id).await.is_ok());
        let fetched = store.get_request(request.request_id).await;
        assert!(matches!(fetched, Ok(None)));
    }

    #[tokio::test]
    async fn record_admission_increments_counter() {
        let store = MemoryStore::new();
        store.put_event(make_event("evt-1")).await;

        let at = Utc::now();
        assert!(store.record_admission("evt-1", at).await.is_ok());
        assert!(store.record_admission("evt-1", at).await.is_ok());

        let Ok(Some(event)) = store.get_event("evt-1").await else {
            panic!("event missing");
        };
        assert_eq!(event.total_requests, 2);
        assert_eq!(event.last_request_at, Some(at));
    }

    #[tokio::test]
    async fn queue_create_if_absent_then_cas() {
        let store = MemoryStore::new();
        let mut record = QueueRecord::new("evt-1", Utc::now());
        record.insert(RequestId::new(), RequestType::Standard);

        // Fresh queue: create-if-absent succeeds once.
        assert!(store.store_queue(&record, None).await.is_ok());
        assert!(matches!(
            store.store_queue(&record, None).await,
            Err(StoreError::Conflict)
        ));

        let Ok(Some((loaded, version))) = store.load_queue("evt-1").await else {
            panic!("queue missing");
        };
        assert_eq!(loaded.len(), 1);

        // CAS at the read version succeeds and bumps it.
        let mut updated = loaded.clone();
        updated.insert(RequestId::new(), RequestType::Standard);
        assert!(store.store_queue(&updated, Some(version)).await.is_ok());

        // Replaying the same version now conflicts.
        assert!(matches!(
            store.store_queue(&updated, Some(version)).await,
            Err(StoreError::Conflict)
        ));
    }

    #[tokio::test]
    async fn duplicate_lookup_ignores_cancelled() {
        let store = MemoryStore::new();
        let mut cancelled = make_request("evt-1", "user-1", "Song A");
        cancelled.status = RequestStatus::Cancelled;
        let _ = store.put_request_if_absent(&cancelled).await;

        let found = store
            .find_latest_duplicate("evt-1", "user-1", "Song A", "Artist")
            .await;
        assert!(matches!(found, Ok(None)));

        let live = make_request("evt-1", "user-1", "Song A");
        let _ = store.put_request_if_absent(&live).await;
        let Ok(Some(found)) = store
            .find_latest_duplicate("evt-1", "user-1", "Song A", "Artist")
            .await
        else {
            panic!("expected duplicate");
        };
        assert_eq!(found.request_id, live.request_id);
    }

    #[tokio::test]
    async fn live_count_excludes_cancelled_and_vetoed() {
        let store = MemoryStore::new();
        let _ = store
            .put_request_if_absent(&make_request("evt-1", "u1", "A"))
            .await;
        let mut vetoed = make_request("evt-1", "u2", "B");
        vetoed.status = RequestStatus::Vetoed;
        let _ = store.put_request_if_absent(&vetoed).await;
        let mut cancelled = make_request("evt-1", "u3", "C");
        cancelled.status = RequestStatus::Cancelled;
        let _ = store.put_request_if_absent(&cancelled).await;

        let count = store.count_live_requests("evt-1").await;
        assert!(matches!(count, Ok(1)));
    }
}
