//! End-to-end create-request orchestration.

use std::sync::Arc;

use chrono::Utc;

use crate::config::AdmissionLimits;
use crate::domain::{SongRequest, SongRequestInput, Transaction, pricing};
use crate::error::AdmissionError;
use crate::persistence::AdmissionStore;

use super::allocator::QueueAllocator;
use super::validator::{AdmissionValidator, Validation};

/// Result of one admission call.
///
/// New admissions and echoed duplicates share this shape deliberately;
/// `echoed` distinguishes them.
#[derive(Debug, Clone)]
pub struct AdmissionOutcome {
    /// The admitted (or previously admitted) request.
    pub request: SongRequest,
    /// The verified transaction, when one is attached to the request.
    pub transaction: Option<Transaction>,
    /// `true` when an existing request was returned instead of a new one.
    pub echoed: bool,
}

/// Orchestrates the create-request protocol.
///
/// Validate → write provisional record → allocate queue position →
/// finalize. The request and queue writes are two separate single-item
/// operations, so the pair forms a manual saga: when allocation fails
/// after the provisional write, the orchestrator compensates by deleting
/// the provisional record. A failed compensation is logged and the
/// original allocation error is still what the caller sees.
#[derive(Debug, Clone)]
pub struct AdmissionService {
    store: Arc<dyn AdmissionStore>,
    validator: AdmissionValidator,
    allocator: QueueAllocator,
}

impl AdmissionService {
    /// Creates the service over a store and policy limits.
    #[must_use]
    pub fn new(store: Arc<dyn AdmissionStore>, limits: AdmissionLimits) -> Self {
        let validator = AdmissionValidator::new(Arc::clone(&store), limits);
        let allocator = QueueAllocator::new(Arc::clone(&store), limits.allocator_max_attempts);
        Self {
            store,
            validator,
            allocator,
        }
    }

    /// Admits one submission end to end.
    ///
    /// # Errors
    ///
    /// Returns the first failing validation's [`AdmissionError`],
    /// [`AdmissionError::QueueUpdateFailed`] when queue insertion fails
    /// (after rolling back the provisional record), or the catch-all kind
    /// on unexpected store failures.
    pub async fn submit(
        &self,
        input: SongRequestInput,
    ) -> Result<AdmissionOutcome, AdmissionError> {
        let now = Utc::now();

        let (event, transaction) = match self.validator.validate(&input, now).await? {
            Validation::Echo {
                request,
                transaction,
            } => {
                return Ok(AdmissionOutcome {
                    request,
                    transaction,
                    echoed: true,
                });
            }
            Validation::Admit { event, transaction } => (event, transaction),
        };

        let price = pricing::quote(&event.settings, &input);
        let provisional = SongRequest::provisional(&input, price, now);
        let request_id = provisional.request_id;

        // Conditioned on id absence: defends against id collision, not a
        // business rule.
        self.store.put_request_if_absent(&provisional).await?;

        let position = match self
            .allocator
            .allocate(&input.event_id, request_id, input.request_type)
            .await
        {
            Ok(position) => position,
            Err(err) => {
                self.roll_back(&provisional).await;
                return Err(err);
            }
        };

        let finalized_at = Utc::now();
        self.store
            .finalize_request_position(request_id, position, finalized_at)
            .await?;

        let mut request = provisional;
        request.queue_position = position;
        request.updated_at = finalized_at;

        // Best-effort aggregate counters; the admission already succeeded.
        if let Err(err) = self.store.record_admission(&input.event_id, finalized_at).await {
            tracing::warn!(event_id = %input.event_id, error = %err, "event stats update failed");
        }

        tracing::info!(
            %request_id,
            event_id = %input.event_id,
            user_id = %input.user_id,
            position,
            price,
            "request admitted"
        );

        Ok(AdmissionOutcome {
            request,
            transaction,
            echoed: false,
        })
    }

    /// Compensating delete of a provisional record that never obtained a
    /// queue slot. Idempotent; a failure here leaves an orphan for the
    /// external sweeper and must not mask the allocation error.
    async fn roll_back(&self, provisional: &SongRequest) {
        if let Err(err) = self.store.delete_request(provisional.request_id).await {
            tracing::error!(
                request_id = %provisional.request_id,
                event_id = %provisional.event_id,
                error = %err,
                "rollback delete failed after queue failure"
            );
        } else {
            tracing::warn!(
                request_id = %provisional.request_id,
                event_id = %provisional.event_id,
                "provisional request rolled back after queue failure"
            );
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{
        Event, EventSettings, EventStatus, QueueRecord, RequestId, RequestStatus, RequestType,
        TransactionStatus,
    };
    use crate::persistence::{MemoryStore, StoreError, Version};

    fn make_event(event_id: &str) -> Event {
        Event {
            event_id: event_id.to_string(),
            status: EventStatus::Active,
            settings: EventSettings {
                base_price: Some(20.0),
                ..EventSettings::default()
            },
            total_requests: 0,
            last_request_at: None,
        }
    }

    fn make_input(user_id: &str, song: &str) -> SongRequestInput {
        SongRequestInput {
            event_id: "evt-1".to_string(),
            user_id: user_id.to_string(),
            song_title: song.to_string(),
            artist_name: "Artist".to_string(),
            genre: None,
            request_type: RequestType::Standard,
            dedication: None,
            shoutout: None,
            transaction_id: None,
        }
    }

    fn make_service(store: Arc<dyn AdmissionStore>) -> AdmissionService {
        let limits = AdmissionLimits {
            allocator_max_attempts: 16,
            ..AdmissionLimits::default()
        };
        AdmissionService::new(store, limits)
    }

    #[tokio::test]
    async fn first_admission_lands_at_position_one() {
        let store = Arc::new(MemoryStore::new());
        store.put_event(make_event("evt-1")).await;
        let service = make_service(Arc::clone(&store) as Arc<dyn AdmissionStore>);

        let Ok(outcome) = service.submit(make_input("u1", "Song A")).await else {
            panic!("admission failed");
        };
        assert!(!outcome.echoed);
        assert_eq!(outcome.request.queue_position, 1);
        assert_eq!(outcome.request.status, RequestStatus::Unpaid);
        assert!((outcome.request.price - 20.0).abs() < f64::EPSILON);

        // Finalized record is persisted with its position.
        let Ok(Some(stored)) = store.get_request(outcome.request.request_id).await else {
            panic!("request missing");
        };
        assert_eq!(stored.queue_position, 1);

        // Stats incremented.
        let Ok(Some(event)) = store.get_event("evt-1").await else {
            panic!("event missing");
        };
        assert_eq!(event.total_requests, 1);
        assert!(event.last_request_at.is_some());
    }

    #[tokio::test]
    async fn double_submit_echoes_the_first_request() {
        let store = Arc::new(MemoryStore::new());
        store.put_event(make_event("evt-1")).await;
        let service = make_service(Arc::clone(&store) as Arc<dyn AdmissionStore>);

        let Ok(first) = service.submit(make_input("u1", "Song A")).await else {
            panic!("first admission failed");
        };
        let Ok(second) = service.submit(make_input("u1", "Song A")).await else {
            panic!("second admission failed");
        };

        assert!(second.echoed);
        assert_eq!(second.request.request_id, first.request.request_id);

        // No second record and no second queue slot were written.
        let Ok(count) = store.count_live_requests("evt-1").await else {
            panic!("count failed");
        };
        assert_eq!(count, 1);
        let Ok(Some((queue, _))) = store.load_queue("evt-1").await else {
            panic!("queue missing");
        };
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn capacity_frees_up_when_a_request_leaves() {
        let store = Arc::new(MemoryStore::new());
        let mut event = make_event("evt-1");
        event.settings.max_requests = Some(2);
        store.put_event(event).await;
        let service = make_service(Arc::clone(&store) as Arc<dyn AdmissionStore>);

        let Ok(first) = service.submit(make_input("u1", "A")).await else {
            panic!("admission failed");
        };
        let Ok(_) = service.submit(make_input("u2", "B")).await else {
            panic!("admission failed");
        };

        let result = service.submit(make_input("u3", "C")).await;
        assert!(matches!(result, Err(AdmissionError::EventCapacityExceeded)));

        // Removing one live request brings the count back under the cap.
        let Ok(()) = store.delete_request(first.request.request_id).await else {
            panic!("delete failed");
        };
        let result = service.submit(make_input("u3", "C")).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn paid_admission_is_pending_with_its_transaction() {
        let store = Arc::new(MemoryStore::new());
        store.put_event(make_event("evt-1")).await;
        store
            .put_transaction(crate::domain::Transaction {
                transaction_id: "txn-1".to_string(),
                amount: 20.0,
                status: TransactionStatus::Completed,
                created_at: Utc::now(),
            })
            .await;
        let service = make_service(Arc::clone(&store) as Arc<dyn AdmissionStore>);

        let mut input = make_input("u1", "Song A");
        input.transaction_id = Some("txn-1".to_string());
        let Ok(outcome) = service.submit(input).await else {
            panic!("admission failed");
        };
        assert_eq!(outcome.request.status, RequestStatus::Pending);
        let Some(transaction) = outcome.transaction else {
            panic!("transaction missing from outcome");
        };
        assert_eq!(transaction.transaction_id, "txn-1");
    }

    #[tokio::test]
    async fn spotlight_displaces_the_standard_head() {
        let store = Arc::new(MemoryStore::new());
        store.put_event(make_event("evt-1")).await;
        let service = make_service(Arc::clone(&store) as Arc<dyn AdmissionStore>);

        let Ok(standard) = service.submit(make_input("u1", "A")).await else {
            panic!("standard admission failed");
        };
        let mut input = make_input("u2", "B");
        input.request_type = RequestType::Spotlight;
        let Ok(spotlight) = service.submit(input).await else {
            panic!("spotlight admission failed");
        };

        assert_eq!(spotlight.request.queue_position, 1);
        assert!((spotlight.request.price - 50.0).abs() < f64::EPSILON);

        // The queue is the authoritative order; the displaced request's
        // stored position is a stale snapshot until re-read from it.
        let Ok(Some((queue, _))) = store.load_queue("evt-1").await else {
            panic!("queue missing");
        };
        assert_eq!(queue.position_of(spotlight.request.request_id), Some(1));
        assert_eq!(queue.position_of(standard.request.request_id), Some(2));
        let Ok(Some(stored)) = store.get_request(standard.request.request_id).await else {
            panic!("request missing");
        };
        assert_eq!(stored.queue_position, 1);
    }

    #[tokio::test]
    async fn concurrent_admissions_get_distinct_positions() {
        let store = Arc::new(MemoryStore::new());
        store.put_event(make_event("evt-1")).await;
        let service = Arc::new(make_service(Arc::clone(&store) as Arc<dyn AdmissionStore>));

        let mut handles = Vec::new();
        for i in 0..10 {
            let service = Arc::clone(&service);
            handles.push(tokio::spawn(async move {
                service
                    .submit(make_input(&format!("user-{i}"), &format!("Song {i}")))
                    .await
            }));
        }

        let mut positions = std::collections::HashSet::new();
        for handle in handles {
            let Ok(Ok(outcome)) = handle.await else {
                panic!("admission task failed");
            };
            positions.insert(outcome.request.queue_position);
        }

        assert_eq!(positions.len(), 10);
        assert_eq!(positions, (1..=10).collect());
    }

    /// Store double whose queue writes always fail hard.
    #[derive(Debug, Default)]
    struct BrokenQueueStore {
        inner: MemoryStore,
    }

    #[async_trait::async_trait]
    impl AdmissionStore for BrokenQueueStore {
        async fn get_event(&self, event_id: &str) -> Result<Option<Event>, StoreError> {
            self.inner.get_event(event_id).await
        }

        async fn record_admission(
            &self,
            event_id: &str,
            at: chrono::DateTime<Utc>,
        ) -> Result<(), StoreError> {
            self.inner.record_admission(event_id, at).await
        }

        async fn put_request_if_absent(&self, request: &SongRequest) -> Result<(), StoreError> {
            self.inner.put_request_if_absent(request).await
        }

        async fn get_request(
            &self,
            request_id: RequestId,
        ) -> Result<Option<SongRequest>, StoreError> {
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
        ) -> Result<Option<SongRequest>, StoreError> {
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
        ) -> Result<Option<SongRequest>, StoreError> {
            self.inner.find_request_by_transaction(transaction_id).await
        }

        async fn load_queue(
            &self,
            event_id: &str,
        ) -> Result<Option<(QueueRecord, Version)>, StoreError> {
            self.inner.load_queue(event_id).await
        }

        async fn store_queue(
            &self,
            _record: &QueueRecord,
            _expected: Option<Version>,
        ) -> Result<(), StoreError> {
            Err(StoreError::Backend("queue write refused".to_string()))
        }
    }

    #[tokio::test]
    async fn allocation_failure_rolls_back_the_provisional_record() {
        let store = Arc::new(BrokenQueueStore::default());
        store.inner.put_event(make_event("evt-1")).await;
        let service = make_service(Arc::clone(&store) as Arc<dyn AdmissionStore>);

        let result = service.submit(make_input("u1", "Song A")).await;
        assert!(matches!(
            result,
            Err(AdmissionError::QueueUpdateFailed { .. })
        ));

        // The compensating delete removed the provisional record: nothing
        // is retrievable afterward.
        let Ok(count) = store.count_live_requests("evt-1").await else {
            panic!("count failed");
        };
        assert_eq!(count, 0);
        let Ok(user_count) = store
            .count_user_requests_since("u1", Utc::now() - chrono::Duration::hours(1))
            .await
        else {
            panic!("count failed");
        };
        assert_eq!(user_count, 0);
    }
}
