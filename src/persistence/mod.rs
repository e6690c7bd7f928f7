//! Persistence layer: the abstract conditional store and its backends.
//!
//! Provides the [`AdmissionStore`] trait — the single-item conditional
//! get / put-if-absent / update-if-exists / delete surface that all
//! cross-worker coordination goes through — plus an in-memory backend
//! for dev and tests and a PostgreSQL backend for durable deployments.

pub mod memory;
pub mod postgres;
pub mod store;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use store::{AdmissionStore, StoreError, Version};
