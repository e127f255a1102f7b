//! Observability utilities for toolforest processes.

#![warn(missing_docs, clippy::pedantic)]

pub mod request;
pub mod tracing_support;

pub use request::{Outcome, REQUEST_TARGET, RequestRecord, RequestTelemetry};
pub use tracing_support::init;
