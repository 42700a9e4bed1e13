//! The allocate/deallocate orchestrator.

pub mod service;

pub use service::{AllocationService, MIN_ALLOCATION};
