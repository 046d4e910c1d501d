//! Deterministic, pure logic over the workflow record.
//!
//! Core modules must be free of I/O side effects. Callers pass in the current
//! time so every operation is reproducible in tests.

pub mod graph;
pub mod invariants;
pub mod lifecycle;
pub mod render;
pub mod retry;
pub mod session;
pub mod state;
pub mod summary;
pub mod types;
