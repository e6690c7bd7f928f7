//! Payment transactions, as recorded by the external payment flow.
//!
//! Charge creation and card capture happen elsewhere; admission only
//! verifies an already-created transaction record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Outcome of a payment charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    /// Charge completed successfully.
    Completed,
    /// Charge failed.
    Failed,
}

impl TransactionStatus {
    /// Returns the wire representation (`"COMPLETED"` / `"FAILED"`).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }

    /// Parses a wire representation back into a status.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "COMPLETED" => Some(Self::Completed),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// A payment transaction created by the external charge flow.
///
/// At most one request may reference a given transaction; the admission
/// pipeline enforces this with a uniqueness lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Provider-issued transaction identifier.
    pub transaction_id: String,
    /// Charged amount in the platform currency unit.
    pub amount: f64,
    /// Charge outcome.
    pub status: TransactionStatus,
    /// Charge creation timestamp.
    pub created_at: DateTime<Utc>,
}
