//! Deadline and cancellation shared by the runs of one request

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use cep_core::{Error, Result};

use crate::error::BrowserError;

/// Upper bound on any request deadline; longer configured values are capped
pub const MAX_DEADLINE: Duration = Duration::from_secs(24 * 60 * 60);

/// `now + timeout`, capped at [`MAX_DEADLINE`] so the addition cannot overflow
pub fn deadline_after(now: Instant, timeout: Duration) -> Instant {
    now.checked_add(timeout.min(MAX_DEADLINE))
        .unwrap_or(now)
}

/// Cancellation flag shared between the orchestrator and its blocking runs
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Raise the flag when the returned guard is dropped
    pub fn guard(&self) -> CancelOnDrop {
        CancelOnDrop(self.clone())
    }
}

/// Raises its flag on drop, so abandoned runs stop and release their browsers
#[derive(Debug)]
pub struct CancelOnDrop(CancelFlag);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// Per-run view of the request deadline
#[derive(Debug, Clone)]
pub struct RunContext {
    deadline: Instant,
    cancel: CancelFlag,
}

impl RunContext {
    pub fn new(deadline: Instant, cancel: CancelFlag) -> Self {
        Self { deadline, cancel }
    }

    /// A context that expires after `timeout` and is never cancelled from outside
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new(deadline_after(Instant::now(), timeout), CancelFlag::new())
    }

    pub fn is_expired(&self) -> bool {
        self.cancel.is_cancelled() || Instant::now() >= self.deadline
    }

    /// Fail with `DeadlineExceeded` once the request is over
    pub fn checkpoint(&self) -> Result<()> {
        if self.is_expired() {
            return Err(Error::DeadlineExceeded);
        }
        Ok(())
    }

    /// Shorten a wait so it never outlives the deadline
    pub fn clamp(&self, wait: Duration) -> Duration {
        wait.min(self.deadline.saturating_duration_since(Instant::now()))
    }

    /// Sleep for at most `wait`, waking early on cancellation
    pub fn sleep(&self, wait: Duration, slice: Duration) {
        let until = Instant::now() + self.clamp(wait);
        let slice = slice.max(Duration::from_millis(1));
        while !self.cancel.is_cancelled() {
            let now = Instant::now();
            if now >= until {
                break;
            }
            std::thread::sleep(slice.min(until - now));
        }
    }

    /// Poll `check` every `interval` until it holds.
    ///
    /// Gives up with a timeout once `timeout` passes, and right away once the
    /// request is over.
    pub fn poll_until(
        &self,
        timeout: Duration,
        interval: Duration,
        what: &str,
        mut check: impl FnMut() -> bool,
    ) -> std::result::Result<(), BrowserError> {
        let limit = Instant::now() + self.clamp(timeout);

        loop {
            if self.is_expired() {
                return Err(BrowserError::Timeout(format!(
                    "stopped waiting for {}: request is over",
                    what
                )));
            }
            if check() {
                return Ok(());
            }
            if Instant::now() >= limit {
                return Err(BrowserError::Timeout(format!(
                    "{} not ready within {:?}",
                    what, timeout
                )));
            }
            self.sleep(interval, interval);
        }
    }
}
