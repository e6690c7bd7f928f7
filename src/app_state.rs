//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::persistence::AdmissionStore;
use crate::service::AdmissionService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Admission pipeline for create-request calls.
    pub admission: Arc<AdmissionService>,
    /// Store handle for read-side endpoints.
    pub store: Arc<dyn AdmissionStore>,
}
