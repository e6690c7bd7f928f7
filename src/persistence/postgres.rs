//! PostgreSQL store backend.
//!
//! Conditional semantics are expressed with single-statement writes:
//! put-if-absent is `INSERT … ON CONFLICT DO NOTHING`, update-if-exists
//! is an `UPDATE` whose affected-row count is checked, and the queue's
//! compare-and-swap is an `UPDATE … WHERE version = $n` against a
//! version column. Zero affected rows on a conditional write maps to
//! [`StoreError::Conflict`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::domain::{
    Event, EventSettings, EventStatus, QueueRecord, RequestId, RequestStatus, RequestType,
    SongRequest, Transaction, TransactionStatus,
};

use super::store::{AdmissionStore, StoreError, Version};

/// PostgreSQL-backed implementation of [`AdmissionStore`].
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a store over the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn codec(detail: impl std::fmt::Display) -> StoreError {
    StoreError::Codec(detail.to_string())
}

fn request_from_row(row: &PgRow) -> Result<SongRequest, StoreError> {
    let status_raw: String = row.try_get("status").map_err(backend)?;
    let status = RequestStatus::parse(&status_raw)
        .ok_or_else(|| codec(format!("unknown request status {status_raw}")))?;
    let type_raw: String = row.try_get("request_type").map_err(backend)?;
    let request_type = RequestType::parse(&type_raw)
        .ok_or_else(|| codec(format!("unknown request type {type_raw}")))?;
    let queue_position: i32 = row.try_get("queue_position").map_err(backend)?;
    let upvotes: i32 = row.try_get("upvotes").map_err(backend)?;

    Ok(SongRequest {
        request_id: RequestId::from_uuid(row.try_get("request_id").map_err(backend)?),
        event_id: row.try_get("event_id").map_err(backend)?,
        user_id: row.try_get("user_id").map_err(backend)?,
        song_title: row.try_get("song_title").map_err(backend)?,
        artist_name: row.try_get("artist_name").map_err(backend)?,
        genre: row.try_get("genre").map_err(backend)?,
        status,
        request_type,
        price: row.try_get("price").map_err(backend)?,
        queue_position: u32::try_from(queue_position).map_err(codec)?,
        dedication: row.try_get("dedication").map_err(backend)?,
        shoutout: row.try_get("shoutout").map_err(backend)?,
        transaction_id: row.try_get("transaction_id").map_err(backend)?,
        upvotes: u32::try_from(upvotes).map_err(codec)?,
        submitted_at: row.try_get("submitted_at").map_err(backend)?,
        updated_at: row.try_get("updated_at").map_err(backend)?,
    })
}

const REQUEST_COLUMNS: &str = "request_id, event_id, user_id, song_title, artist_name, genre, \
     status, request_type, price, queue_position, dedication, shoutout, transaction_id, \
     upvotes, submitted_at, updated_at";

#[async_trait]
impl AdmissionStore for PostgresStore {
    async fn get_event(&self, event_id: &str) -> Result<Option<Event>, StoreError> {
        let row = sqlx::query(
            "SELECT status, settings, total_requests, last_request_at FROM events \
             WHERE event_id = $1",
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let status_raw: String = row.try_get("status").map_err(backend)?;
        let status = EventStatus::parse(&status_raw)
            .ok_or_else(|| codec(format!("unknown event status {status_raw}")))?;
        let settings_json: serde_json::Value = row.try_get("settings").map_err(backend)?;
        let settings: EventSettings = serde_json::from_value(settings_json).map_err(codec)?;
        let total_requests: i64 = row.try_get("total_requests").map_err(backend)?;

        Ok(Some(Event {
            event_id: event_id.to_string(),
            status,
            settings,
            total_requests: u64::try_from(total_requests).map_err(codec)?,
            last_request_at: row.try_get("last_request_at").map_err(backend)?,
        }))
    }

    async fn record_admission(&self, event_id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE events SET total_requests = total_requests + 1, last_request_at = $2 \
             WHERE event_id = $1",
        )
        .bind(event_id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("event {event_id}")));
        }
        Ok(())
    }

    async fn put_request_if_absent(&self, request: &SongRequest) -> Result<(), StoreError> {
        let position = i32::try_from(request.queue_position).map_err(codec)?;
        let upvotes = i32::try_from(request.upvotes).map_err(codec)?;
        let result = sqlx::query(
            "INSERT INTO requests (request_id, event_id, user_id, song_title, artist_name, \
             genre, status, request_type, price, queue_position, dedication, shoutout, \
             transaction_id, upvotes, submitted_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16) \
             ON CONFLICT (request_id) DO NOTHING",
        )
        .bind(request.request_id.as_uuid())
        .bind(&request.event_id)
        .bind(&request.user_id)
        .bind(&request.song_title)
        .bind(&request.artist_name)
        .bind(&request.genre)
        .bind(request.status.as_str())
        .bind(request.request_type.as_str())
        .bind(request.price)
        .bind(position)
        .bind(&request.dedication)
        .bind(&request.shoutout)
        .bind(&request.transaction_id)
        .bind(upvotes)
        .bind(request.submitted_at)
        .bind(request.updated_at)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict);
        }
        Ok(())
    }

    async fn get_request(&self, request_id: RequestId) -> Result<Option<SongRequest>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM requests WHERE request_id = $1"
        ))
        .bind(request_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.as_ref().map(request_from_row).transpose()
    }

    async fn finalize_request_position(
        &self,
        request_id: RequestId,
        position: u32,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let position = i32::try_from(position).map_err(codec)?;
        let result = sqlx::query(
            "UPDATE requests SET queue_position = $2, updated_at = $3 WHERE request_id = $1",
        )
        .bind(request_id.as_uuid())
        .bind(position)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("request {request_id}")));
        }
        Ok(())
    }

    async fn delete_request(&self, request_id: RequestId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM requests WHERE request_id = $1")
            .bind(request_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn count_user_requests_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM requests WHERE user_id = $1 AND submitted_at >= $2",
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;

        u64::try_from(count).map_err(codec)
    }

    async fn find_latest_duplicate(
        &self,
        event_id: &str,
        user_id: &str,
        song_title: &str,
        artist_name: &str,
    ) -> Result<Option<SongRequest>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM requests \
             WHERE event_id = $1 AND user_id = $2 AND song_title = $3 AND artist_name = $4 \
             AND status <> 'CANCELLED' \
             ORDER BY submitted_at DESC LIMIT 1"
        ))
        .bind(event_id)
        .bind(user_id)
        .bind(song_title)
        .bind(artist_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.as_ref().map(request_from_row).transpose()
    }

    async fn count_live_requests(&self, event_id: &str) -> Result<u64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM requests \
             WHERE event_id = $1 AND status NOT IN ('CANCELLED', 'VETOED')",
        )
        .bind(event_id)
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;

        u64::try_from(count).map_err(codec)
    }

    async fn get_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Transaction>, StoreError> {
        let row = sqlx::query(
            "SELECT amount, status, created_at FROM transactions WHERE transaction_id = $1",
        )
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let status_raw: String = row.try_get("status").map_err(backend)?;
        let status = TransactionStatus::parse(&status_raw)
            .ok_or_else(|| codec(format!("unknown transaction status {status_raw}")))?;

        Ok(Some(Transaction {
            transaction_id: transaction_id.to_string(),
            amount: row.try_get("amount").map_err(backend)?,
            status,
            created_at: row.try_get("created_at").map_err(backend)?,
        }))
    }

    async fn find_request_by_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<SongRequest>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM requests WHERE transaction_id = $1 LIMIT 1"
        ))
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.as_ref().map(request_from_row).transpose()
    }

    async fn load_queue(
        &self,
        event_id: &str,
    ) -> Result<Option<(QueueRecord, Version)>, StoreError> {
        let row = sqlx::query(
            "SELECT ordered_request_ids, spotlight_count, standard_count, last_updated, version \
             FROM queues WHERE event_id = $1",
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let ids_json: serde_json::Value = row.try_get("ordered_request_ids").map_err(backend)?;
        let ordered_request_ids: Vec<RequestId> =
            serde_json::from_value(ids_json).map_err(codec)?;
        let spotlight_count: i64 = row.try_get("spotlight_count").map_err(backend)?;
        let standard_count: i64 = row.try_get("standard_count").map_err(backend)?;
        let version: i64 = row.try_get("version").map_err(backend)?;

        Ok(Some((
            QueueRecord {
                event_id: event_id.to_string(),
                ordered_request_ids,
                spotlight_count: u64::try_from(spotlight_count).map_err(codec)?,
                standard_count: u64::try_from(standard_count).map_err(codec)?,
                last_updated: row.try_get("last_updated").map_err(backend)?,
            },
            u64::try_from(version).map_err(codec)?,
        )))
    }

    async fn store_queue(
        &self,
        record: &QueueRecord,
        expected: Option<Version>,
    ) -> Result<(), StoreError> {
        let ids_json = serde_json::to_value(&record.ordered_request_ids).map_err(codec)?;
        let spotlight = i64::try_from(record.spotlight_count).map_err(codec)?;
        let standard = i64::try_from(record.standard_count).map_err(codec)?;

        let result = if let Some(version) = expected {
            let version = i64::try_from(version).map_err(codec)?;
            sqlx::query(
                "UPDATE queues SET ordered_request_ids = $2, spotlight_count = $3, \
                 standard_count = $4, last_updated = $5, version = version + 1 \
                 WHERE event_id = $1 AND version = $6",
            )
            .bind(&record.event_id)
            .bind(ids_json)
            .bind(spotlight)
            .bind(standard)
            .bind(record.last_updated)
            .bind(version)
            .execute(&self.pool)
            .await
        } else {
            sqlx::query(
                "INSERT INTO queues (event_id, ordered_request_ids, spotlight_count, \
                 standard_count, last_updated, version) VALUES ($1, $2, $3, $4, $5, 1) \
                 ON CONFLICT (event_id) DO NOTHING",
            )
            .bind(&record.event_id)
            .bind(ids_json)
            .bind(spotlight)
            .bind(standard)
            .bind(record.last_updated)
            .execute(&self.pool)
            .await
        }
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict);
        }
        Ok(())
    }
}
