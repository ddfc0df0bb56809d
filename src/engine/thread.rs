//! Detection-thread plumbing shared by every engine variant.
//!
//! [`DetectionThread`] owns the running flag and the join handle of the one
//! background thread an engine may have.  The thread takes ownership of
//! whatever it reads from (signal source, frame reader, recognition session)
//! and hands it back as its return value, so [`DetectionThread::join`] is the
//! only way the controlling side gets those resources back.  Nothing can be
//! released while the loop may still touch it.
//!
//! [`Backoff`] throttles a loop that keeps hitting the same failure.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use super::WakeWordError;

/// Granularity of [`RunFlag::sleep`]; bounds how long a cleared flag goes
/// unnoticed while the loop is sleeping.
const SLEEP_SLICE: Duration = Duration::from_millis(10);

/// First delay of a failure streak.
pub const BACKOFF_BASE: Duration = Duration::from_millis(10);

// ---------------------------------------------------------------------------
// RunFlag
// ---------------------------------------------------------------------------

/// Read-only view of the running flag, handed to the detection loop.
#[derive(Debug, Clone)]
pub struct RunFlag(Arc<AtomicBool>);

impl RunFlag {
    /// `true` until the controlling thread asks the loop to exit.
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Sleep for `total`, waking early if the flag clears.
    ///
    /// Returns `true` when the loop should keep running.
    pub fn sleep(&self, total: Duration) -> bool {
        let deadline = Instant::now() + total;
        while self.is_set() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            std::thread::sleep((deadline - now).min(SLEEP_SLICE));
        }
        self.is_set()
    }
}

// ---------------------------------------------------------------------------
// DetectionThread
// ---------------------------------------------------------------------------

/// At most one background detection thread, plus its running flag.
///
/// `W` is whatever the loop gives back when it exits.
pub struct DetectionThread<W> {
    name: &'static str,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<W>>,
}

impl<W: Send + 'static> DetectionThread<W> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    /// `true` between a successful [`spawn`](Self::spawn) and the matching
    /// [`join`](Self::join).
    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Set the running flag and start `body` on a named OS thread.
    ///
    /// Does nothing when a thread is already live.  If the OS refuses to
    /// create the thread, `body` (and everything it owns) is dropped and
    /// [`WakeWordError::Allocation`] is returned.
    pub fn spawn<F>(&mut self, body: F) -> Result<(), WakeWordError>
    where
        F: FnOnce(RunFlag) -> W + Send + 'static,
    {
        if self.handle.is_some() {
            return Ok(());
        }

        self.running.store(true, Ordering::Release);
        let flag = RunFlag(Arc::clone(&self.running));

        let spawned = std::thread::Builder::new()
            .name(self.name.into())
            .spawn(move || body(flag));

        match spawned {
            Ok(handle) => {
                self.handle = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::Release);
                Err(WakeWordError::Allocation(format!(
                    "cannot spawn {} thread: {e}",
                    self.name
                )))
            }
        }
    }

    /// Clear the running flag and block until the loop exits.
    ///
    /// Returns `None` when no thread was running, or when the loop panicked
    /// (the panic is logged and whatever the loop owned is gone).
    pub fn join(&mut self) -> Option<W> {
        let handle = self.handle.take()?;
        self.running.store(false, Ordering::Release);

        match handle.join() {
            Ok(value) => Some(value),
            Err(_) => {
                log::error!("{}: detection thread panicked", self.name);
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Backoff
// ---------------------------------------------------------------------------

/// Exponential delay for a loop that keeps failing the same way.
///
/// The first failure of a streak is logged at `ERROR`, repeats at `DEBUG`,
/// and the end of the streak at `INFO`, so a dead device does not flood the
/// log or spin a core.
#[derive(Debug)]
pub struct Backoff {
    what: &'static str,
    max: Duration,
    failures: u32,
}

impl Backoff {
    /// `max` below [`BACKOFF_BASE`] is raised to it; a failing loop always
    /// waits.
    pub fn new(what: &'static str, max: Duration) -> Self {
        Self {
            what,
            max: max.max(BACKOFF_BASE),
            failures: 0,
        }
    }

    /// Record one failure and return how long to wait before retrying.
    pub fn fail(&mut self, err: &dyn std::fmt::Display) -> Duration {
        self.failures = self.failures.saturating_add(1);
        if self.failures == 1 {
            log::error!("{}: {err}", self.what);
        } else {
            log::debug!("{}: {err} (failure #{})", self.what, self.failures);
        }
        self.delay()
    }

    /// End the current streak, if any.
    pub fn recover(&mut self) {
        if self.failures > 1 {
            log::info!(
                "{}: recovered after {} consecutive failures",
                self.what,
                self.failures
            );
        }
        self.failures = 0;
    }

    /// Consecutive failures since the last success.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    fn delay(&self) -> Duration {
        if self.failures == 0 {
            return Duration::ZERO;
        }
        let shift = (self.failures - 1).min(16);
        BACKOFF_BASE.saturating_mul(1 << shift).min(self.max)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
