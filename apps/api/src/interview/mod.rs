//! Deterministic interview orchestration: turn state, scoring, selection,
//! summary aggregation, and the per-turn engine that ties them together.

pub mod engine;
pub mod handlers;
pub mod scoring;
pub mod selection;
pub mod summary;
pub mod turn_state;
