//! Helpers for tests and benchmarks.

pub mod spend_store;
pub mod toy_group;
