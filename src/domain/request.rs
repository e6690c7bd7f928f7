//! Song requests: the record created by admission and ordered by the queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::RequestId;

/// Genre recorded when the submitter does not supply one.
pub const UNKNOWN_GENRE: &str = "Unknown";

/// Sentinel queue position of a provisional request that has not yet been
/// assigned a slot by the allocator.
pub const POSITION_UNASSIGNED: u32 = 0;

/// Priority class of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestType {
    /// Regular request, appended to the tail of the queue.
    Standard,
    /// Premium request, inserted at the head of the queue.
    Spotlight,
}

impl RequestType {
    /// Returns the wire representation (`"STANDARD"` / `"SPOTLIGHT"`).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "STANDARD",
            Self::Spotlight => "SPOTLIGHT",
        }
    }

    /// Parses a wire representation back into a request type.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "STANDARD" => Some(Self::Standard),
            "SPOTLIGHT" => Some(Self::Spotlight),
            _ => None,
        }
    }
}

/// Lifecycle state of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    /// Admitted without a verified payment attached.
    Unpaid,
    /// Admitted with a verified payment, awaiting the DJ's decision.
    Pending,
    /// Accepted by the DJ.
    Accepted,
    /// Played during the set.
    Played,
    /// Rejected by the DJ.
    Vetoed,
    /// Withdrawn; requests are soft-deleted into this state rather than
    /// removed (the compensating rollback of a provisional record is the
    /// one hard-delete path).
    Cancelled,
}

impl RequestStatus {
    /// Returns the wire representation (`"UNPAID"`, `"PENDING"`, ...).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unpaid => "UNPAID",
            Self::Pending => "PENDING",
            Self::Accepted => "ACCEPTED",
            Self::Played => "PLAYED",
            Self::Vetoed => "VETOED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Parses a wire representation back into a status.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "UNPAID" => Some(Self::Unpaid),
            "PENDING" => Some(Self::Pending),
            "ACCEPTED" => Some(Self::Accepted),
            "PLAYED" => Some(Self::Played),
            "VETOED" => Some(Self::Vetoed),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Returns `true` if the request still counts toward event capacity.
    ///
    /// Cancelled and vetoed requests release their slot; everything else
    /// occupies one.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        !matches!(self, Self::Cancelled | Self::Vetoed)
    }
}

/// Attributes of a submission before admission.
///
/// This is what the attendee sends; the admission pipeline turns it into a
/// priced, positioned [`SongRequest`].
#[derive(Debug, Clone)]
pub struct SongRequestInput {
    /// Event the request targets.
    pub event_id: String,
    /// Submitting user (identity issuance is external).
    pub user_id: String,
    /// Requested song title.
    pub song_title: String,
    /// Requested artist.
    pub artist_name: String,
    /// Optional genre tag.
    pub genre: Option<String>,
    /// Priority class.
    pub request_type: RequestType,
    /// Optional dedication text (surcharged).
    pub dedication: Option<String>,
    /// Optional shoutout text (surcharged).
    pub shoutout: Option<String>,
    /// Identifier of an already-created payment transaction to verify.
    pub transaction_id: Option<String>,
}

/// An admitted (or provisional) song request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SongRequest {
    /// Globally unique identifier, generated at creation.
    pub request_id: RequestId,
    /// Owning event; a request never exists without exactly one.
    pub event_id: String,
    /// Submitting user.
    pub user_id: String,
    /// Requested song title.
    pub song_title: String,
    /// Requested artist.
    pub artist_name: String,
    /// Genre tag, `"Unknown"` when the submitter omitted it.
    pub genre: String,
    /// Lifecycle state.
    pub status: RequestStatus,
    /// Priority class.
    pub request_type: RequestType,
    /// Computed price; immutable after creation.
    pub price: f64,
    /// Queue position snapshot taken when the allocator finalized the
    /// request (1-indexed; [`POSITION_UNASSIGNED`] while provisional).
    /// The queue record is the authoritative order; this value goes stale
    /// when later insertions land ahead of it.
    pub queue_position: u32,
    /// Dedication text, if purchased.
    pub dedication: Option<String>,
    /// Shoutout text, if purchased.
    pub shoutout: Option<String>,
    /// Verified payment transaction, if one was attached at submission.
    pub transaction_id: Option<String>,
    /// Upvote count, zero at creation.
    pub upvotes: u32,
    /// Submission timestamp.
    pub submitted_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl SongRequest {
    /// Builds a provisional record from validated input.
    ///
    /// The record carries the sentinel position and is `PENDING` when a
    /// verified transaction is attached, `UNPAID` otherwise.
    #[must_use]
    pub fn provisional(input: &SongRequestInput, price: f64, now: DateTime<Utc>) -> Self {
        let status = if input.transaction_id.is_some() {
            RequestStatus::Pending
        } else {
            RequestStatus::Unpaid
        };
        Self {
            request_id: RequestId::new(),
            event_id: input.event_id.clone(),
            user_id: input.user_id.clone(),
            song_title: input.song_title.clone(),
            artist_name: input.artist_name.clone(),
            genre: input
                .genre
                .clone()
                .unwrap_or_else(|| UNKNOWN_GENRE.to_string()),
            status,
            request_type: input.request_type,
            price,
            queue_position: POSITION_UNASSIGNED,
            dedication: input.dedication.clone(),
            shoutout: input.shoutout.clone(),
            transaction_id: input.transaction_id.clone(),
            upvotes: 0,
            submitted_at: now,
            updated_at: now,
        }
    }
}
