//! Initialization logic for logging and metrics shared between the
//! binaries, plus the `/metrics` scrape endpoint.

pub mod metrics;
pub mod tracing;
