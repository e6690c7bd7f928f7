//! Queue read-model DTOs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::request_dto::RequestDto;

/// One slot in the ordered queue.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QueueEntryDto {
    /// 1-indexed position in the authoritative order.
    pub position: u32,
    /// The request occupying the slot.
    pub request: RequestDto,
}

/// Response body for `GET /events/{event_id}/queue`.
///
/// The entry order here is authoritative; `queue_position` snapshots on
/// individual requests may lag behind it.
#[derive(Debug, Serialize, ToSchema)]
pub struct QueueResponse {
    /// Event the queue belongs to.
    pub event_id: String,
    /// Number of queued requests.
    pub total: u32,
    /// Lifetime count of spotlight insertions.
    pub spotlight_count: u64,
    /// Lifetime count of standard insertions.
    pub standard_count: u64,
    /// Timestamp of the last queue mutation, absent for an empty queue
    /// that was never written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    /// Queued requests in play order.
    pub entries: Vec<QueueEntryDto>,
}
