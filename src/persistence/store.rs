//! The abstract conditional store consumed by the admission pipeline.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Event, QueueRecord, RequestId, SongRequest, Transaction};

/// Monotonic version token used for conditional queue replacement.
///
/// A backend increments the version on every successful queue write; a
/// caller replaying a read-modify-write cycle passes the version it read
/// and receives [`StoreError::Conflict`] if another writer got there
/// first.
pub type Version = u64;

/// Failure modes of the store.
///
/// [`StoreError::Conflict`] is the only concurrency signal: it means a
/// conditional precondition (absence, existence, or expected version) did
/// not hold, and the operation wrote nothing.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A conditional write lost its precondition to a concurrent writer.
    #[error("conditional write conflict")]
    Conflict,

    /// An update-if-exists operation targeted a missing record.
    #[error("record not found: {0}")]
    NotFound(String),

    /// The backend failed (connectivity, query error).
    #[error("store backend error: {0}")]
    Backend(String),

    /// A stored value could not be decoded.
    #[error("codec error: {0}")]
    Codec(String),
}

/// Single-item conditional storage operations for admission.
///
/// Every method is one atomic round-trip against a single record; there
/// are no multi-record transactions. This is the entire coordination
/// surface available to concurrent workers — the orchestrator's
/// compensation step exists precisely because no operation here spans
/// both a request and a queue record.
#[async_trait]
pub trait AdmissionStore: Send + Sync + std::fmt::Debug {
    /// Fetches an event by id.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on backend failure.
    async fn get_event(&self, event_id: &str) -> Result<Option<Event>, StoreError>;

    /// Atomically increments the event's request counter and stamps the
    /// admission time. Update-if-exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the event record is missing,
    /// or another [`StoreError`] on backend failure.
    async fn record_admission(&self, event_id: &str, at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Writes a request record conditioned on its id being absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if a record with the same id
    /// already exists, or another [`StoreError`] on backend failure.
    async fn put_request_if_absent(&self, request: &SongRequest) -> Result<(), StoreError>;

    /// Fetches a request by id.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on backend failure.
    async fn get_request(&self, request_id: RequestId) -> Result<Option<SongRequest>, StoreError>;

    /// Writes the allocated queue position onto an existing request and
    /// bumps its `updated_at`. Update-if-exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the record no longer exists,
    /// or another [`StoreError`] on backend failure.
    async fn finalize_request_position(
        &self,
        request_id: RequestId,
        position: u32,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Deletes a request record. Idempotent: deleting a missing record
    /// succeeds, so the compensating rollback can be retried safely.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on backend failure.
    async fn delete_request(&self, request_id: RequestId) -> Result<(), StoreError>;

    /// Counts requests submitted by a user at or after `since`.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on backend failure.
    async fn count_user_requests_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    /// Finds the user's most recent non-cancelled request in the event
    /// with an identical song title and artist.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on backend failure.
    async fn find_latest_duplicate(
        &self,
        event_id: &str,
        user_id: &str,
        song_title: &str,
        artist_name: &str,
    ) -> Result<Option<SongRequest>, StoreError>;

    /// Counts the event's live requests (those occupying a capacity slot).
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on backend failure.
    async fn count_live_requests(&self, event_id: &str) -> Result<u64, StoreError>;

    /// Fetches a payment transaction by id.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on backend failure.
    async fn get_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Transaction>, StoreError>;

    /// Finds a request already referencing the given transaction, if any.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on backend failure.
    async fn find_request_by_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<SongRequest>, StoreError>;

    /// Loads an event's queue record together with its current version.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on backend failure.
    async fn load_queue(
        &self,
        event_id: &str,
    ) -> Result<Option<(QueueRecord, Version)>, StoreError>;

    /// Conditionally writes a queue record.
    ///
    /// With `expected = None` the write is create-if-absent; with
    /// `expected = Some(v)` it replaces the record only if its stored
    /// version is still `v`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when the precondition fails
    /// (record already exists, or the version moved), or another
    /// [`StoreError`] on backend failure.
    async fn store_queue(
        &self,
        record: &QueueRecord,
        expected: Option<Version>,
    ) -> Result<(), StoreError>;
}
