//! Five-stage pipeline.
//!
//! One invocation runs a single process for up to its quantum of cycles,
//! then drains the four in-flight instructions. The stage functions live in
//! `engine`; `hazards` holds the RAW lookback and `latch` the in-flight
//! instruction record.

/// RAW hazard detection over the latch history.
pub mod hazards;
/// In-flight instruction latch.
pub mod latch;

mod engine;

pub use engine::run_quantum;
pub use latch::Latch;
