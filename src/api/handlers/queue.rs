//! Queue read-model handler.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{QueueEntryDto, QueueResponse};
use crate::app_state::AppState;
use crate::error::{AdmissionError, ErrorResponse};

/// `GET /events/{event_id}/queue` — Read the event's queue in play order.
///
/// The queue record holds the authoritative order; this endpoint joins it
/// against the request records. An event that has never received a request
/// returns an empty queue rather than an error.
///
/// # Errors
///
/// Returns [`AdmissionError::EventNotFound`] for an unknown event, or the
/// catch-all kind on store failures.
#[utoipa::path(
    get,
    path = "/api/v1/events/{event_id}/queue",
    tag = "Queue",
    summary = "Get the event queue",
    description = "Returns the event's queued requests in authoritative play order, with 1-indexed positions.",
    params(
        ("event_id" = String, Path, description = "Target event id"),
    ),
    responses(
        (status = 200, description = "Queue in play order", body = QueueResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn get_queue(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, AdmissionError> {
    if state.store.get_event(&event_id).await?.is_none() {
        return Err(AdmissionError::EventNotFound { event_id });
    }

    let Some((record, _)) = state.store.load_queue(&event_id).await? else {
        return Ok(Json(QueueResponse {
            event_id,
            total: 0,
            spotlight_count: 0,
            standard_count: 0,
            last_updated: None,
            entries: Vec::new(),
        }));
    };

    let mut entries = Vec::with_capacity(record.len());
    for request_id in &record.ordered_request_ids {
        // A missing record is a rolled-back provisional whose queue slot
        // had already landed; skip it and keep positions contiguous.
        if let Some(request) = state.store.get_request(*request_id).await? {
            entries.push(QueueEntryDto {
                position: entries.len() as u32 + 1,
                request: request.into(),
            });
        }
    }

    Ok(Json(QueueResponse {
        event_id,
        total: entries.len() as u32,
        spotlight_count: record.spotlight_count,
        standard_count: record.standard_count,
        last_updated: Some(record.last_updated),
        entries,
    }))
}

/// Queue routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/events/{event_id}/queue", get(get_queue))
}
