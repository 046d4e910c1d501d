//! Workflow state machine and dependency scheduler.
//!
//! Tracks a directed set of tasks with dependencies, retryable failures,
//! checkpoints and a supervising session in a single JSON record under
//! `<root>/.conductor/state.json`. Every CLI invocation is a fresh process that
//! performs one load-mutate-save cycle. The crate is split into:
//!
//! - **[`core`]**: Pure, deterministic logic (graph queries, transitions, retry
//!   escalation, session stamps). No I/O; the caller supplies the clock.
//! - **[`io`]**: Side-effecting operations (state file, lock file, config).
//!
//! [`commands`] composes the two into the single-shot CLI operations.

pub mod commands;
pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
