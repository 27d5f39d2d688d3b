//! Test helpers shared across crates.
//!
//! Provides environment variable guards, a `figment::Jail` wrapper and an
//! in-memory capture for `tracing` output.

pub mod env;
pub mod figment;
pub mod logs;
