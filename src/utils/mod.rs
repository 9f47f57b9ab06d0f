//! # Utility Modules
//!
//! Supporting utilities for logging and observability.
//!
//! ## Components
//! - **Logging**: structured logging configuration
//! - **Metrics**: thread-safe observability counters

pub mod logging;
pub mod metrics;

pub use metrics::Metrics;
