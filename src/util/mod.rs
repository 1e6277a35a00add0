//! Shared utilities.

/// Per-tick cost tracking.
pub mod frame_timing;

pub use frame_timing::TickTimer;
