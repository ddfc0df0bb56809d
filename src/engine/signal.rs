//! Wake detection from a button-style signal source.
//!
//! One wake event per edge.  After each event the loop sleeps for a fixed
//! debounce interval and drops any edges that arrived meanwhile, so a
//! bouncing contact or a held key counts once.

use std::sync::Arc;
use std::time::Duration;

use super::listener::{DetectionListener, Dispatcher};
use super::thread::{Backoff, DetectionThread, RunFlag};
use super::{EngineState, WakeWordEngine, WakeWordError};
use crate::signal::{Signal, SignalSource};

const ENGINE: &str = "signal-engine";

/// Timing knobs for [`SignalWakeWordEngine`].
#[derive(Debug, Clone)]
pub struct SignalEngineOptions {
    /// Quiet time after each detection.
    pub debounce: Duration,
    /// Retry delay cap while the source keeps failing.
    pub max_backoff: Duration,
}

impl Default for SignalEngineOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_secs(1),
            max_backoff: Duration::from_millis(500),
        }
    }
}

/// Engine that reports a wake word whenever its [`SignalSource`] fires.
///
/// There is no capture resource: the source is handed to the detection
/// thread on `start()` and handed back when `stop()` joins it, so `pause()`
/// really halts detection and `resume()` picks up with the same source.
pub struct SignalWakeWordEngine {
    dispatcher: Dispatcher,
    options: SignalEngineOptions,
    /// Present whenever the detection thread is not running.
    source: Option<Box<dyn SignalSource>>,
    thread: DetectionThread<Box<dyn SignalSource>>,
    state: EngineState,
}

impl SignalWakeWordEngine {
    /// Create the engine and start watching `source` right away.
    ///
    /// # Errors
    ///
    /// [`WakeWordError::Allocation`] when the detection thread cannot be
    /// spawned.  The error is logged before it is returned.
    pub fn new(
        listener: Arc<dyn DetectionListener>,
        source: Box<dyn SignalSource>,
        options: SignalEngineOptions,
    ) -> Result<Self, WakeWordError> {
        let mut engine = Self {
            dispatcher: Dispatcher::new(ENGINE, listener),
            options,
            source: Some(source),
            thread: DetectionThread::new("signal-wake-word"),
            state: EngineState::NotInitialized,
        };

        if let Err(e) = engine.init() {
            log::error!("{ENGINE}: initialization error: {e}");
            return Err(e);
        }
        Ok(engine)
    }

    /// Swap in a new source, stopping detection first if it is running.
    ///
    /// This is how an engine whose detection thread panicked (and took its
    /// source down with it) gets back to work: `replace_source`, then
    /// `init()`.
    pub fn replace_source(&mut self, source: Box<dyn SignalSource>) {
        if self.thread.is_running() {
            self.stop();
        }
        self.source = Some(source);
    }
}

impl WakeWordEngine for SignalWakeWordEngine {
    /// Nothing to load; initialization starts the detection thread.
    fn init(&mut self) -> Result<(), WakeWordError> {
        if self.state != EngineState::NotInitialized {
            log::info!("{ENGINE}: already initialized");
            return Ok(());
        }
        if self.source.is_none() {
            return Err(WakeWordError::Initialization(
                "no signal source installed".into(),
            ));
        }
        log::debug!("{ENGINE}: initializing");
        self.state = EngineState::Initialized;
        self.start()
    }

    fn start(&mut self) -> Result<(), WakeWordError> {
        if self.thread.is_running() {
            log::info!("{ENGINE}: already started");
            return Ok(());
        }
        if self.state == EngineState::NotInitialized {
            return Err(WakeWordError::NotInitialized);
        }
        let Some(source) = self.source.take() else {
            return Err(WakeWordError::Initialization(
                "no signal source installed".into(),
            ));
        };

        log::debug!("{ENGINE}: starting signal thread");
        let dispatcher = self.dispatcher.clone();
        let options = self.options.clone();
        self.thread
            .spawn(move |flag| detection_loop(source, flag, dispatcher, options))?;
        self.state = EngineState::Running;
        Ok(())
    }

    fn pause(&mut self) {
        log::info!("{ENGINE}: handling pause");
        if self.thread.is_running() {
            self.stop();
            self.state = EngineState::Paused;
        }
    }

    fn resume(&mut self) -> Result<(), WakeWordError> {
        log::info!("{ENGINE}: handling resume");
        self.start().inspect_err(|e| log::error!("{ENGINE}: resume failed: {e}"))
    }

    fn stop(&mut self) {
        if !self.thread.is_running() {
            log::info!("{ENGINE}: already stopped");
            return;
        }
        log::info!("{ENGINE}: joining signal thread");
        match self.thread.join() {
            Some(source) => {
                self.source = Some(source);
                self.state = EngineState::Stopped;
            }
            None => {
                log::error!("{ENGINE}: signal source lost; replace_source() and init() required");
                self.state = EngineState::NotInitialized;
            }
        }
    }

    fn state(&self) -> EngineState {
        self.state
    }
}

impl Drop for SignalWakeWordEngine {
    fn drop(&mut self) {
        if self.thread.is_running() {
            self.stop();
        }
    }
}

fn detection_loop(
    mut source: Box<dyn SignalSource>,
    flag: RunFlag,
    dispatcher: Dispatcher,
    options: SignalEngineOptions,
) -> Box<dyn SignalSource> {
    log::debug!("{ENGINE}: signal thread started");
    let mut backoff = Backoff::new("signal-engine: signal read", options.max_backoff);

    while flag.is_set() {
        match source.wait_for_signal() {
            Ok(Signal::Triggered) => {
                backoff.recover();
                if !flag.is_set() {
                    break;
                }
                dispatcher.wake_word_detected();
                if flag.sleep(options.debounce) {
                    source.discard_pending();
                }
            }
            Ok(Signal::Idle) => backoff.recover(),
            Err(e) => {
                let delay = backoff.fail(&e);
                flag.sleep(delay);
            }
        }
    }

    log::debug!("{ENGINE}: signal thread ended");
    source
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
