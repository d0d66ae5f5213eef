//! Resilience patterns for quanta-runtime.
//!
//! - Retry with exponential backoff and jitter around model calls
//! - Placeholder fallback around store writes

mod persistence;
mod retry;

pub use persistence::{Persisted, ResilientPersistence, WriteSource};
pub use retry::{realized_delay, RetryPolicy, Retryable};
