//! Minimum-interval gate for model calls.
//!
//! The hosted model enforces a request rate. Instead of a bare sleep in the
//! pipeline, the client owns a gate that guarantees at least `interval` between
//! the end of one call and the start of the next. A zero interval disables it.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;

use super::LanguageModel;
use crate::error::GenerationError;

pub struct MinIntervalGate {
    interval: Duration,
    last_finished: Mutex<Option<Instant>>,
}

impl MinIntervalGate {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_finished: Mutex::new(None),
        }
    }

    /// Run `call` once the interval since the previous call has elapsed.
    ///
    /// Calls are serialized: the gate is held for the duration of `call`. A call
    /// that is cancelled midway still counts as finished when it is dropped.
    pub async fn run<F, T>(&self, call: F) -> T
    where
        F: Future<Output = T>,
    {
        let last = self.last_finished.lock().await;
        if let Some(prev) = *last {
            let ready_at = prev + self.interval;
            if ready_at > Instant::now() {
                tracing::debug!(wait_ms = (ready_at - Instant::now()).as_millis() as u64, "rate limit pause");
                tokio::time::sleep_until(ready_at).await;
            }
        }
        let _finished = MarkFinished(last);
        call.await
    }
}

/// Stamps the finish time on drop, whether the call completed or was cancelled.
struct MarkFinished<'a>(MutexGuard<'a, Option<Instant>>);

impl Drop for MarkFinished<'_> {
    fn drop(&mut self) {
        *self.0 = Some(Instant::now());
    }
}

/// A [`LanguageModel`] whose calls pass through a [`MinIntervalGate`].
pub struct Throttled<M> {
    inner: M,
    gate: MinIntervalGate,
}

impl<M: LanguageModel> Throttled<M> {
    pub fn new(inner: M, interval: Duration) -> Self {
        Self {
            inner,
            gate: MinIntervalGate::new(interval),
        }
    }
}

#[async_trait]
impl<M: LanguageModel> LanguageModel for Throttled<M> {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.gate.run(self.inner.generate(prompt)).await
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}
