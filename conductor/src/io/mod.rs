//! I/O helpers for conductor commands.

pub mod config;
pub mod lock;
pub mod paths;
pub mod state_store;
