//! Admission error taxonomy with HTTP status mapping.
//!
//! [`AdmissionError`] is the central error type of the gateway. Each
//! variant carries a stable string `error_code`, a short non-technical
//! message (the `Display` impl), and an HTTP status. Internal detail is
//! never put in the message; it travels in the optional `details` field
//! of the JSON body. Clients should treat unknown codes defensively.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::persistence::StoreError;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": "RATE_LIMIT_EXCEEDED",
///     "message": "You can only submit 3 requests per hour",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with stable code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Stable string error code (see [`AdmissionError::error_code`]).
    pub code: String,
    /// Short, non-technical message.
    pub message: String,
    /// Diagnostic detail, present only on server-side failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Admission pipeline errors.
///
/// The first nine variants are validation failures detected before any
/// write; they require no compensation. [`AdmissionError::QueueUpdateFailed`]
/// is the only kind that triggers the compensating delete of a
/// provisional request. Anything unanticipated is mapped to
/// [`AdmissionError::Internal`] with the original message preserved in
/// `details`.
#[derive(Debug, thiserror::Error)]
pub enum AdmissionError {
    /// No event with the given id.
    #[error("Event not found")]
    EventNotFound {
        /// Id the caller asked for.
        event_id: String,
    },

    /// The event exists but is not in the `ACTIVE` state.
    #[error("This event is not currently accepting requests")]
    EventNotActive {
        /// Id of the inactive event.
        event_id: String,
    },

    /// The user hit the sliding-window submission cap.
    #[error("You can only submit {max} requests per hour")]
    RateLimitExceeded {
        /// Window cap that was reached.
        max: u32,
    },

    /// The user already has a live request for this song at this event.
    #[error("You have already requested this song at this event")]
    DuplicateSongRequest,

    /// The event's live-request cap is reached.
    #[error("This event has reached its request limit")]
    EventCapacityExceeded,

    /// The referenced transaction does not exist.
    #[error("Payment not found")]
    PaymentNotFound,

    /// The referenced transaction did not complete.
    #[error("Payment was not completed")]
    PaymentNotCompleted,

    /// The transaction amount does not match the computed price.
    #[error("Payment amount does not match the request price")]
    PaymentAmountMismatch,

    /// Another request already consumed this transaction.
    #[error("This payment has already been used")]
    PaymentAlreadyUsed,

    /// Queue insertion failed after retries; the provisional request was
    /// rolled back.
    #[error("Your request could not be added to the queue, please try again")]
    QueueUpdateFailed {
        /// Proximate store failure, for diagnostics.
        details: String,
    },

    /// Catch-all for unexpected failures anywhere in the pipeline.
    #[error("An unexpected error occurred")]
    Internal {
        /// Original error message, for diagnostics.
        details: String,
    },
}

impl AdmissionError {
    /// Returns the stable string code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::EventNotFound { .. } => "EVENT_NOT_FOUND",
            Self::EventNotActive { .. } => "EVENT_NOT_ACTIVE",
            Self::RateLimitExceeded { .. } => "RATE_LIMIT_EXCEEDED",
            Self::DuplicateSongRequest => "DUPLICATE_SONG_REQUEST",
            Self::EventCapacityExceeded => "EVENT_CAPACITY_EXCEEDED",
            Self::PaymentNotFound => "PAYMENT_NOT_FOUND",
            Self::PaymentNotCompleted => "PAYMENT_NOT_COMPLETED",
            Self::PaymentAmountMismatch => "PAYMENT_AMOUNT_MISMATCH",
            Self::PaymentAlreadyUsed => "PAYMENT_ALREADY_USED",
            Self::QueueUpdateFailed { .. } => "QUEUE_UPDATE_FAILED",
            Self::Internal { .. } => "REQUEST_CREATION_FAILED",
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::EventNotFound { .. } => StatusCode::NOT_FOUND,
            Self::EventNotActive { .. }
            | Self::DuplicateSongRequest
            | Self::EventCapacityExceeded
            | Self::PaymentAlreadyUsed => StatusCode::CONFLICT,
            Self::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::PaymentNotFound | Self::PaymentNotCompleted | Self::PaymentAmountMismatch => {
                StatusCode::PAYMENT_REQUIRED
            }
            Self::QueueUpdateFailed { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the diagnostic detail carried by server-side failures.
    #[must_use]
    pub fn details(&self) -> Option<&str> {
        match self {
            Self::QueueUpdateFailed { details } | Self::Internal { details } => {
                Some(details.as_str())
            }
            _ => None,
        }
    }
}

impl From<StoreError> for AdmissionError {
    /// Unexpected store failures become the catch-all kind; the original
    /// message is retained in `details` rather than leaked to the user.
    fn from(err: StoreError) -> Self {
        Self::Internal {
            details: err.to_string(),
        }
    }
}

impl IntoResponse for AdmissionError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code().to_string(),
                message: self.to_string(),
                details: self.details().map(str::to_string),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
