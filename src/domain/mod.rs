//! Domain layer: identifiers, model types, and the price calculator.
//!
//! This module contains the server-side domain model: request identity,
//! events with their admission settings, song requests, the per-event
//! ordered queue record, payment transactions, and the pure pricing
//! function.

pub mod event;
pub mod pricing;
pub mod queue;
pub mod request;
pub mod request_id;
pub mod transaction;

pub use event::{Event, EventSettings, EventStatus};
pub use queue::QueueRecord;
pub use request::{RequestStatus, RequestType, SongRequest, SongRequestInput};
pub use request_id::RequestId;
pub use transaction::{Transaction, TransactionStatus};
