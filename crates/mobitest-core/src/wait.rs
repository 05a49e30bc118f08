//! Bounded polling: the engine's only synchronization primitive.
//!
//! [`WaitEngine::until`] evaluates a probe immediately and then every
//! `poll_interval` until it yields a value or the deadline passes. The
//! deadline is measured from before the first evaluation, so a slow probe
//! cannot stretch it, and the final sleep is clipped so the last evaluation
//! happens at the deadline rather than after it.
//!
//! Running out of time is a value ([`Waited::DeadlineExceeded`]), not an
//! error. Errors returned by the probe end the wait at once: probes are
//! expected to fold "not yet visible" conditions into `Ok(None)` and only
//! return `Err` for session faults, which are never retried.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use mobitest_core::wait::{WaitEngine, WaitSpec, Waited};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let spec = WaitSpec::new(Duration::from_secs(2), Duration::from_millis(100))?;
//! let mut polls = 0;
//! let waited = WaitEngine::until(&spec, || {
//!     polls += 1;
//!     let n = polls;
//!     async move { Ok::<_, mobitest_core::session::SessionError>((n >= 3).then_some(n)) }
//! })
//! .await?;
//! assert!(matches!(waited, Waited::Ready(3)));
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

use crate::error::EngineError;
use crate::session::SessionError;

/// Deadline and poll cadence for one wait.
///
/// Invariant: `0 < poll_interval < timeout`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitSpec {
    timeout: Duration,
    poll_interval: Duration,
}

impl WaitSpec {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Result<Self, EngineError> {
        if timeout.is_zero() {
            return Err(EngineError::InvalidWaitSpec("timeout must be positive".to_string()));
        }
        if poll_interval.is_zero() {
            return Err(EngineError::InvalidWaitSpec(
                "poll interval must be positive".to_string(),
            ));
        }
        if poll_interval >= timeout {
            return Err(EngineError::InvalidWaitSpec(format!(
                "poll interval {:?} must be shorter than timeout {:?}",
                poll_interval, timeout
            )));
        }
        Ok(Self {
            timeout,
            poll_interval,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

/// Outcome of a bounded wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Waited<T> {
    /// The probe produced a value.
    Ready(T),
    /// The deadline passed without the probe producing a value.
    DeadlineExceeded {
        /// Time from the first evaluation to the last one.
        elapsed: Duration,
        /// How many times the probe ran.
        attempts: u32,
    },
}

impl<T> Waited<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, Waited::Ready(_))
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Waited::Ready(v) => Some(v),
            Waited::DeadlineExceeded { .. } => None,
        }
    }
}

/// Polls probes against a deadline.
#[derive(Debug, Clone, Copy, Default)]
pub struct WaitEngine;

impl WaitEngine {
    /// Polls `probe` until it returns `Ok(Some(_))`, returns `Err`, or the
    /// deadline passes.
    pub async fn until<T, F, Fut>(spec: &WaitSpec, mut probe: F) -> Result<Waited<T>, SessionError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>, SessionError>>,
    {
        let start = Instant::now();
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            if let Some(value) = probe().await? {
                trace!(attempts, elapsed_ms = start.elapsed().as_millis() as u64, "wait satisfied");
                return Ok(Waited::Ready(value));
            }

            let elapsed = start.elapsed();
            if elapsed >= spec.timeout {
                trace!(attempts, elapsed_ms = elapsed.as_millis() as u64, "wait deadline exceeded");
                return Ok(Waited::DeadlineExceeded { elapsed, attempts });
            }

            let remaining = spec.timeout - elapsed;
            tokio::time::sleep(spec.poll_interval.min(remaining)).await;
        }
    }

    /// Boolean form of [`until`](Self::until).
    pub async fn until_true<F, Fut>(spec: &WaitSpec, mut predicate: F) -> Result<Waited<()>, SessionError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<bool, SessionError>>,
    {
        Self::until(spec, || {
            let fut = predicate();
            async move { Ok(fut.await?.then_some(())) }
        })
        .await
    }
}
