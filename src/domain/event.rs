//! Events and their admission settings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Default cap on live requests per event when the settings omit one.
pub const DEFAULT_MAX_REQUESTS: u32 = 100;

/// Lifecycle state of an event.
///
/// Only `ACTIVE` events admit new requests. Events are created by a
/// performer and transition through these states; they are never deleted
/// while a session is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    /// Event is live and accepting requests.
    Active,
    /// Event has ended; no further requests.
    Ended,
    /// Event finished and settled.
    Completed,
    /// Event was cancelled.
    Cancelled,
}

impl EventStatus {
    /// Returns the wire representation (`"ACTIVE"`, `"ENDED"`, ...).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Ended => "ENDED",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Parses a wire representation back into a status.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(Self::Active),
            "ENDED" => Some(Self::Ended),
            "COMPLETED" => Some(Self::Completed),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Performer-configured admission settings for one event.
///
/// Both fields are optional on the wire; accessors apply the platform
/// defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EventSettings {
    /// Base price of a standard request, in the platform currency unit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_price: Option<f64>,
    /// Maximum number of live requests the event accepts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_requests: Option<u32>,
}

impl EventSettings {
    /// Returns the live-request cap, applying the platform default.
    #[must_use]
    pub fn max_requests(&self) -> u32 {
        self.max_requests.unwrap_or(DEFAULT_MAX_REQUESTS)
    }
}

/// A live event (a DJ's set) that attendees submit requests against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Opaque event identifier issued at event creation.
    pub event_id: String,
    /// Lifecycle state; only `ACTIVE` admits requests.
    pub status: EventStatus,
    /// Admission settings.
    pub settings: EventSettings,
    /// Aggregate count of admitted requests, maintained by the stats
    /// updater. Best-effort: may lag the true count if an increment is
    /// lost.
    pub total_requests: u64,
    /// Timestamp of the most recent admitted request.
    pub last_request_at: Option<DateTime<Utc>>,
}

impl Event {
    /// Returns `true` if the event currently admits requests.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == EventStatus::Active
    }
}
