//! Service layer: the admission pipeline.
//!
//! Three coordinators compose the end-to-end create-request protocol:
//! [`AdmissionValidator`] runs the ordered pre-write checks,
//! [`QueueAllocator`] assigns a race-free queue position, and
//! [`AdmissionService`] orchestrates validate → provisional write →
//! allocate → finalize with a compensating delete on allocation failure.

pub mod admission;
pub mod allocator;
pub mod validator;

pub use admission::{AdmissionOutcome, AdmissionService};
pub use allocator::QueueAllocator;
pub use validator::{AdmissionValidator, Validation};
