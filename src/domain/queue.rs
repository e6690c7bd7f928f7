//! The per-event ordered queue record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{RequestId, RequestType};

/// Authoritative ordered queue for one event.
///
/// Holds the request ids in priority order (index 0 plays first) plus two
/// monotonic insertion counters. The counters move only inside
/// [`QueueRecord::insert`], in the same conditional write that mutates the
/// sequence, so they cannot drift from it.
///
/// A request's stored `queue_position` is a snapshot of its index here at
/// finalize time; readers needing a live position must re-derive it from
/// this record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueRecord {
    /// Owning event.
    pub event_id: String,
    /// Request ids in priority order.
    pub ordered_request_ids: Vec<RequestId>,
    /// Total spotlight insertions over the queue's lifetime.
    pub spotlight_count: u64,
    /// Total standard insertions over the queue's lifetime.
    pub standard_count: u64,
    /// Timestamp of the last mutation.
    pub last_updated: DateTime<Utc>,
}

impl QueueRecord {
    /// Creates an empty queue for the given event.
    #[must_use]
    pub fn new(event_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            event_id: event_id.into(),
            ordered_request_ids: Vec::new(),
            spotlight_count: 0,
            standard_count: 0,
            last_updated: now,
        }
    }

    /// Inserts a request id and returns its 1-indexed position.
    ///
    /// STANDARD appends to the tail and the position is the resulting
    /// length; SPOTLIGHT prepends and the position is always 1. Among
    /// concurrent SPOTLIGHT writers the head slot is last-writer-wins at
    /// the store; no further ordering is defined.
    #[allow(clippy::cast_possible_truncation)]
    pub fn insert(&mut self, request_id: RequestId, request_type: RequestType) -> u32 {
        self.last_updated = Utc::now();
        match request_type {
            RequestType::Spotlight => {
                self.ordered_request_ids.insert(0, request_id);
                self.spotlight_count += 1;
                1
            }
            RequestType::Standard => {
                self.ordered_request_ids.push(request_id);
                self.standard_count += 1;
                self.ordered_request_ids.len() as u32
            }
        }
    }

    /// Returns the current 1-indexed position of a request, if queued.
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn position_of(&self, request_id: RequestId) -> Option<u32> {
        self.ordered_request_ids
            .iter()
            .position(|id| *id == request_id)
            .map(|idx| idx as u32 + 1)
    }

    /// Returns the number of queued requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ordered_request_ids.len()
    }

    /// Returns `true` if no requests are queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ordered_request_ids.is_empty()
    }
}
