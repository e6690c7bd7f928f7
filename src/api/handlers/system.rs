//! System endpoints: health check and pricing catalog.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;
use crate::domain::pricing;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
}

/// `GET /health` — Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, and current timestamp.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// Published pricing rules.
#[derive(Debug, Serialize, ToSchema)]
struct PricingCatalog {
    default_base_price: f64,
    spotlight_multiplier: f64,
    dedication_surcharge: f64,
    shoutout_surcharge: f64,
}

/// `GET /config/pricing` — Published pricing rules.
#[utoipa::path(
    get,
    path = "/config/pricing",
    tag = "System",
    summary = "Pricing rules",
    description = "Returns the pricing constants applied at admission: fallback base price, spotlight multiplier, and extras surcharges. Events may override the base price.",
    responses(
        (status = 200, description = "Pricing catalog", body = PricingCatalog),
    )
)]
pub async fn pricing_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(PricingCatalog {
            default_base_price: pricing::DEFAULT_BASE_PRICE,
            spotlight_multiplier: pricing::SPOTLIGHT_MULTIPLIER,
            dedication_surcharge: pricing::DEDICATION_SURCHARGE,
            shoutout_surcharge: pricing::SHOUTOUT_SURCHARGE,
        }),
    )
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/config/pricing", get(pricing_handler))
}
