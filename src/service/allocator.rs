//! Atomic queue position assignment.

use std::sync::Arc;

use chrono::Utc;

use crate::domain::{QueueRecord, RequestId, RequestType};
use crate::error::AdmissionError;
use crate::persistence::{AdmissionStore, StoreError};

/// Assigns each request a queue position unique among the event's
/// currently-queued requests, under arbitrary concurrent callers, using
/// only the store's single-item conditional writes.
///
/// Each attempt re-reads the queue record, applies the insertion locally,
/// and writes it back conditioned on the version it read (create-if-absent
/// for a fresh queue). A losing writer retries with fresh state, so every
/// successful STANDARD append computes its position from the post-write
/// length and no two winners can observe the same length. SPOTLIGHT
/// prepends always claim position 1; among simultaneous SPOTLIGHT writers
/// the head slot is last-writer-wins at the store, with no further
/// ordering defined.
#[derive(Debug, Clone)]
pub struct QueueAllocator {
    store: Arc<dyn AdmissionStore>,
    max_attempts: u32,
}

impl QueueAllocator {
    /// Creates an allocator that retries benign conflicts up to
    /// `max_attempts` times before escalating.
    #[must_use]
    pub fn new(store: Arc<dyn AdmissionStore>, max_attempts: u32) -> Self {
        Self {
            store,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Inserts `request_id` into the event's queue and returns its
    /// 1-indexed position.
    ///
    /// # Errors
    ///
    /// Returns [`AdmissionError::QueueUpdateFailed`] when the store fails
    /// for any reason other than a benign write conflict, or when the
    /// conflict retry budget is exhausted.
    pub async fn allocate(
        &self,
        event_id: &str,
        request_id: RequestId,
        request_type: RequestType,
    ) -> Result<u32, AdmissionError> {
        for attempt in 1..=self.max_attempts {
            let (mut record, expected) = match self.store.load_queue(event_id).await {
                Ok(Some((record, version))) => (record, Some(version)),
                Ok(None) => (QueueRecord::new(event_id, Utc::now()), None),
                Err(err) => {
                    return Err(AdmissionError::QueueUpdateFailed {
                        details: err.to_string(),
                    });
                }
            };

            let position = record.insert(request_id, request_type);

            match self.store.store_queue(&record, expected).await {
                Ok(()) => {
                    tracing::debug!(event_id, %request_id, position, attempt, "queue slot assigned");
                    return Ok(position);
                }
                Err(StoreError::Conflict) => {
                    // Lost the write race; re-read and re-apply.
                    tracing::debug!(event_id, %request_id, attempt, "queue write conflict, retrying");
                }
                Err(err) => {
                    return Err(AdmissionError::QueueUpdateFailed {
                        details: err.to_string(),
                    });
                }
            }
        }

        Err(AdmissionError::QueueUpdateFailed {
            details: format!("conflict retries exhausted after {} attempts", self.max_attempts),
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;

    #[tokio::test]
    async fn standard_positions_grow_from_one() {
        let store = Arc::new(MemoryStore::new());
        let allocator = QueueAllocator::new(store, 5);

        for expected in 1..=3 {
            let position = allocator
                .allocate("evt-1", RequestId::new(), RequestType::Standard)
                .await;
            let Ok(position) = position else {
                panic!("allocation failed");
            };
            assert_eq!(position, expected);
        }
    }

    #[tokio::test]
    async fn spotlight_takes_the_head() {
        let store = Arc::new(MemoryStore::new());
        let allocator = QueueAllocator::new(Arc::clone(&store) as Arc<dyn AdmissionStore>, 5);

        let standard = RequestId::new();
        let spotlight = RequestId::new();
        let Ok(1) = allocator
            .allocate("evt-1", standard, RequestType::Standard)
            .await
        else {
            panic!("standard allocation failed");
        };
        let Ok(position) = allocator
            .allocate("evt-1", spotlight, RequestType::Spotlight)
            .await
        else {
            panic!("spotlight allocation failed");
        };
        assert_eq!(position, 1);

        let Ok(Some((queue, _))) = store.load_queue("evt-1").await else {
            panic!("queue missing");
        };
        assert_eq!(queue.position_of(spotlight), Some(1));
        assert_eq!(queue.position_of(standard), Some(2));
    }

    #[tokio::test]
    async fn concurrent_standard_allocations_get_distinct_positions() {
        let store = Arc::new(MemoryStore::new());
        // Each conflict implies another task's write landed, so N-1 extra
        // attempts are enough for N contenders.
        let allocator = Arc::new(QueueAllocator::new(
            Arc::clone(&store) as Arc<dyn AdmissionStore>,
            16,
        ));

        let mut handles = Vec::new();
        for _ in 0..10 {
            let allocator = Arc::clone(&allocator);
            handles.push(tokio::spawn(async move {
                allocator
                    .allocate("evt-1", RequestId::new(), RequestType::Standard)
                    .await
            }));
        }

        let mut positions = std::collections::HashSet::new();
        for handle in handles {
            let Ok(Ok(position)) = handle.await else {
                panic!("allocation task failed");
            };
            positions.insert(position);
        }

        assert_eq!(positions.len(), 10);
        assert_eq!(positions, (1..=10).collect());

        let Ok(Some((queue, _))) = store.load_queue("evt-1").await else {
            panic!("queue missing");
        };
        assert_eq!(queue.len(), 10);
        assert_eq!(queue.standard_count, 10);
    }

    /// Store double whose queue writes always conflict.
    #[derive(Debug, Default)]
    struct ContestedStore {
        inner: MemoryStore,
    }

    #[async_trait::async_trait]
    impl AdmissionStore for ContestedStore {
        async fn get_event(
            &self,
            event_id: &str,
        ) -> Result<Option<crate::domain::Event>, StoreError> {
            self.inner.get_event(event_id).await
        }

        async fn record_admission(
            &self,
            event_id: &str,
            at: chrono::DateTime<Utc>,
        ) -> Result<(), StoreError> {
            self.inner.record_admission(event_id, at).await
        }

        async fn put_request_if_absent(
            &self,
            request: &crate::domain::SongRequest,
        ) -> Result<(), StoreError> {
            self.inner.put_request_if_absent(request).await
        }

        async fn get_request(
            &self,
            request_id: RequestId,
        ) -> Result<Option<crate::domain::SongRequest>, StoreError> {
            self.inner.get_request(request_id).await
        }

        async fn finalize_request_position(
            &self,
            request_id: RequestId,
            position: u32,
            at: chrono::DateTime<Utc>,
        ) -> Result<(), StoreError> {
            self.inner
                .finalize_request_position(request_id, position, at)
                .await
        }

        async fn delete_request(&self, request_id: RequestId) -> Result<(), StoreError> {
            self.inner.delete_request(request_id).await
        }

        async fn count_user_requests_since(
            &self,
            user_id: &str,
            since: chrono::DateTime<Utc>,
        ) -> Result<u64, StoreError> {
            self.inner.count_user_requests_since(user_id, since).await
        }

        async fn find_latest_duplicate(
            &self,
            event_id: &str,
            user_id: &str,
            song_title: &str,
            artist_name: &str,
        ) -> Result<Option<crate::domain::SongRequest>, StoreError> {
            self.inner
                .find_latest_duplicate(event_id, user_id, song_title, artist_name)
                .await
        }

        async fn count_live_requests(&self, event_id: &str) -> Result<u64, StoreError> {
            self.inner.count_live_requests(event_id).await
        }

        async fn get_transaction(
            &self,
            transaction_id: &str,
        ) -> Result<Option<crate::domain::Transaction>, StoreError> {
            self.inner.get_transaction(transaction_id).await
        }

        async fn find_request_by_transaction(
            &self,
            transaction_id: &str,
        ) -> Result<Option<crate::domain::SongRequest>, StoreError> {
            self.inner.find_request_by_transaction(transaction_id).await
        }

        async fn load_queue(
            &self,
            event_id: &str,
        ) -> Result<Option<(QueueRecord, crate::persistence::Version)>, StoreError> {
            self.inner.load_queue(event_id).await
        }

        async fn store_queue(
            &self,
            _record: &QueueRecord,
            _expected: Option<crate::persistence::Version>,
        ) -> Result<(), StoreError> {
            Err(StoreError::Conflict)
        }
    }

    #[tokio::test]
    async fn exhausted_retries_escalate() {
        let store = Arc::new(ContestedStore::default());
        let allocator = QueueAllocator::new(store, 3);

        let result = allocator
            .allocate("evt-1", RequestId::new(), RequestType::Standard)
            .await;
        assert!(matches!(
            result,
            Err(AdmissionError::QueueUpdateFailed { .. })
        ));
    }
}
