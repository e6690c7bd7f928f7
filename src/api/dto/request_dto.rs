//! Request submission and admission DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{
    RequestId, RequestStatus, RequestType, SongRequest, SongRequestInput, Transaction,
};

/// Request body for `POST /events/{event_id}/requests`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SubmitRequestBody {
    /// Submitting user identifier.
    pub user_id: String,
    /// Requested song title.
    pub song_title: String,
    /// Requested artist.
    pub artist_name: String,
    /// Optional genre tag.
    #[serde(default)]
    pub genre: Option<String>,
    /// Priority class; defaults to `STANDARD`.
    #[serde(default = "default_request_type")]
    pub request_type: RequestType,
    /// Optional dedication text (surcharged).
    #[serde(default)]
    pub dedication: Option<String>,
    /// Optional shoutout text (surcharged).
    #[serde(default)]
    pub shoutout: Option<String>,
    /// Identifier of an already-created payment transaction to verify.
    #[serde(default)]
    pub transaction_id: Option<String>,
}

fn default_request_type() -> RequestType {
    RequestType::Standard
}

impl SubmitRequestBody {
    /// Combines the body with the path's event id into pipeline input.
    #[must_use]
    pub fn into_input(self, event_id: String) -> SongRequestInput {
        SongRequestInput {
            event_id,
            user_id: self.user_id,
            song_title: self.song_title,
            artist_name: self.artist_name,
            genre: self.genre,
            request_type: self.request_type,
            dedication: self.dedication,
            shoutout: self.shoutout,
            transaction_id: self.transaction_id,
        }
    }
}

/// An admitted song request as returned to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RequestDto {
    /// Request identifier.
    pub request_id: RequestId,
    /// Owning event.
    pub event_id: String,
    /// Submitting user.
    pub user_id: String,
    /// Requested song title.
    pub song_title: String,
    /// Requested artist.
    pub artist_name: String,
    /// Genre tag.
    pub genre: String,
    /// Lifecycle state.
    pub status: RequestStatus,
    /// Priority class.
    pub request_type: RequestType,
    /// Computed price.
    pub price: f64,
    /// Queue position snapshot taken at admission (1-indexed).
    pub queue_position: u32,
    /// Dedication text, if purchased.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dedication: Option<String>,
    /// Shoutout text, if purchased.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shoutout: Option<String>,
    /// Attached payment transaction id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    /// Upvote count.
    pub upvotes: u32,
    /// Submission timestamp.
    pub submitted_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<SongRequest> for RequestDto {
    fn from(request: SongRequest) -> Self {
        Self {
            request_id: request.request_id,
            event_id: request.event_id,
            user_id: request.user_id,
            song_title: request.song_title,
            artist_name: request.artist_name,
            genre: request.genre,
            status: request.status,
            request_type: request.request_type,
            price: request.price,
            queue_position: request.queue_position,
            dedication: request.dedication,
            shoutout: request.shoutout,
            transaction_id: request.transaction_id,
            upvotes: request.upvotes,
            submitted_at: request.submitted_at,
            updated_at: request.updated_at,
        }
    }
}

/// A verified payment transaction as returned to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TransactionDto {
    /// Transaction identifier.
    pub transaction_id: String,
    /// Paid amount.
    pub amount: f64,
    /// Transaction status string (`"COMPLETED"` / `"FAILED"`).
    pub status: String,
    /// Transaction creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<Transaction> for TransactionDto {
    fn from(transaction: Transaction) -> Self {
        Self {
            transaction_id: transaction.transaction_id,
            amount: transaction.amount,
            status: transaction.status.as_str().to_string(),
            created_at: transaction.created_at,
        }
    }
}

/// Response body for `POST /events/{event_id}/requests`.
///
/// Returned with 201 for a freshly admitted request and 200 with
/// `echoed: true` when an identical recent submission was returned
/// instead.
#[derive(Debug, Serialize, ToSchema)]
pub struct AdmissionResponse {
    /// The admitted (or echoed) request.
    pub request: RequestDto,
    /// The verified transaction, when one is attached.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<TransactionDto>,
    /// `true` when an existing request was returned instead of a new one.
    pub echoed: bool,
}
