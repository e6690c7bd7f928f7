//! Request admission handler.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{AdmissionResponse, SubmitRequestBody};
use crate::app_state::AppState;
use crate::error::{AdmissionError, ErrorResponse};

/// `POST /events/{event_id}/requests` — Submit a song request.
///
/// # Errors
///
/// Returns [`AdmissionError`] when any admission check fails or the queue
/// write cannot complete.
#[utoipa::path(
    post,
    path = "/api/v1/events/{event_id}/requests",
    tag = "Requests",
    summary = "Submit a song request",
    description = "Runs the full admission pipeline: event and payment validation, rate limiting, duplicate detection, capacity check, then queue placement. An identical submission repeated within the echo window returns the original request with `echoed: true` instead of failing.",
    params(
        ("event_id" = String, Path, description = "Target event id"),
    ),
    request_body = SubmitRequestBody,
    responses(
        (status = 201, description = "Request admitted and queued", body = AdmissionResponse),
        (status = 200, description = "Recent identical request echoed", body = AdmissionResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
        (status = 409, description = "Inactive event, duplicate, capacity, or reused payment", body = ErrorResponse),
        (status = 429, description = "Rate limit exceeded", body = ErrorResponse),
        (status = 402, description = "Payment missing, failed, or mismatched", body = ErrorResponse),
        (status = 503, description = "Queue placement failed, safe to retry", body = ErrorResponse),
    )
)]
pub async fn submit_request(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    Json(body): Json<SubmitRequestBody>,
) -> Result<impl IntoResponse, AdmissionError> {
    let outcome = state.admission.submit(body.into_input(event_id)).await?;

    let status = if outcome.echoed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    let response = AdmissionResponse {
        request: outcome.request.into(),
        transaction: outcome.transaction.map(Into::into),
        echoed: outcome.echoed,
    };

    Ok((status, Json(response)))
}

/// Request admission routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/events/{event_id}/requests", post(submit_request))
}
