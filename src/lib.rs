//! # encore-gateway
//!
//! REST gateway for live-event song request admission and queue ordering.
//!
//! Attendees submit song requests against an event; the gateway decides
//! whether each submission is admitted (event state, rate limits,
//! duplicates, capacity, payment verification), prices it, and places it
//! in the event's ordered queue. All storage goes through single-item
//! conditional writes, so queue ordering is maintained with an optimistic
//! read-modify-write loop rather than transactions.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP)
//!     │
//!     ├── REST Handlers (api/)
//!     │
//!     ├── AdmissionService (service/)
//!     │     ├── AdmissionValidator
//!     │     └── QueueAllocator
//!     │
//!     ├── AdmissionStore (persistence/)
//!     │     ├── PostgresStore
//!     │     └── MemoryStore
//!     │
//!     └── Domain model (domain/)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
