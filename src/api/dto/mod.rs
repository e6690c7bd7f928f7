//! Data Transfer Objects for REST request/response serialization.

pub mod queue_dto;
pub mod request_dto;

pub use queue_dto::*;
pub use request_dto::*;
