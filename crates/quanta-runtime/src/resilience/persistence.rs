//! Durable writes that degrade to placeholder values instead of failing.

use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Where a persisted value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteSource {
    /// The store accepted the write
    Durable,
    /// The store failed; the value is a placeholder that was never stored
    Fallback,
}

/// Outcome of a [`ResilientPersistence::write`].
#[derive(Debug, Clone, PartialEq)]
pub struct Persisted<T> {
    pub value: T,
    pub source: WriteSource,
}

impl<T> Persisted<T> {
    pub fn is_fallback(&self) -> bool {
        self.source == WriteSource::Fallback
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

/// Wraps durable writes so a store outage never fails the caller.
///
/// Clones share one degraded-write counter; the server holds a single
/// instance for the whole process and reports the count on `/health`.
#[derive(Debug, Clone, Default)]
pub struct ResilientPersistence {
    degraded_writes: Arc<AtomicU64>,
}

impl ResilientPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Await one durable write. On error, log it, count it and return the
    /// value built by `fallback`. Never retries and never fails.
    pub async fn write<T, E, Fut, Fb>(&self, entity: &str, op: Fut, fallback: Fb) -> Persisted<T>
    where
        Fut: Future<Output = Result<T, E>>,
        E: Display,
        Fb: FnOnce() -> T,
    {
        match op.await {
            Ok(value) => Persisted {
                value,
                source: WriteSource::Durable,
            },
            Err(err) => {
                let total = self.degraded_writes.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::warn!(
                    entity,
                    error = %err,
                    degraded_writes = total,
                    "store write failed, continuing in degraded mode"
                );
                Persisted {
                    value: fallback(),
                    source: WriteSource::Fallback,
                }
            }
        }
    }

    /// Writes that fell back since start-up.
    pub fn degraded_writes(&self) -> u64 {
        self.degraded_writes.load(Ordering::Relaxed)
    }
}
