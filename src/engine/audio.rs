//! Wake detection by pumping microphone frames through a recognizer.
//!
//! # Detection cycle
//!
//! ```text
//!   ┌────────────── Listening ◀─────────────────────┐
//!   │  read_frame ─fail─▶ log, back off, retry      │
//!   │  feed       ─fail─▶ log, next frame           │
//!   │  status == Done ──▶ exit inner loop           │
//!   ▼                                               │
//! Done ── result() ─ok──▶ log score/text, notify    │
//!   │            └─err──▶ log, no notification      │
//!   └── reset() ────────────────────────────────────┘
//! ```
//!
//! The running flag is checked before each cycle and before each frame, so
//! `stop()` waits for at most one blocking frame read.
//!
//! # Resource ownership
//!
//! `init()` creates the recognition session.  `start()` opens the capture
//! stream, then moves the session and the frame reader onto the detection
//! thread.  `stop()` joins the thread, takes the session back, drops the
//! reader and only then closes the stream.  Dropping the engine stops it
//! and releases the session exactly once.

use std::sync::Arc;
use std::time::Duration;

use super::listener::{DetectionListener, Dispatcher};
use super::thread::{Backoff, DetectionThread, RunFlag};
use super::{EngineState, WakeWordEngine, WakeWordError};
use crate::audio::{AudioSource, CaptureError, CaptureSpec, FrameReader};
use crate::recognition::{
    HistoryRetention, RecogStatus, RecognitionBackend, RecognitionConfig, RecognitionSession,
};

const ENGINE: &str = "audio-engine";

/// Everything the audio engine needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct AudioEngineOptions {
    pub recognition: RecognitionConfig,
    pub capture: CaptureSpec,
    /// Retry delay cap while reads or feeds keep failing.
    pub max_backoff: Duration,
}

impl Default for AudioEngineOptions {
    fn default() -> Self {
        Self {
            recognition: RecognitionConfig::default(),
            capture: CaptureSpec::default(),
            max_backoff: Duration::from_millis(500),
        }
    }
}

/// What the detection thread owns while it runs.
struct AudioWorker {
    reader: Box<dyn FrameReader>,
    session: Box<dyn RecognitionSession>,
}

/// Continuous wake-word spotter over a capture stream.
///
/// # Example
///
/// ```rust,no_run
/// # #[cfg(feature = "capture")]
/// # fn main() {
/// use std::sync::Arc;
/// use wake_word::audio::CpalAudioSource;
/// use wake_word::engine::{AudioEngineOptions, AudioWakeWordEngine, WakeWordEngine};
/// use wake_word::recognition::EnergySpotter;
///
/// let mut engine = AudioWakeWordEngine::new(
///     Arc::new(|| println!("wake word!")),
///     Box::new(EnergySpotter::new(0.1, 30, "ALEXA")),
///     Box::new(CpalAudioSource::new()),
///     AudioEngineOptions::default(),
/// )
/// .expect("recognizer setup failed");
///
/// // ... later, free the microphone for speech capture:
/// engine.pause();
/// # }
/// # #[cfg(not(feature = "capture"))]
/// # fn main() {}
/// ```
pub struct AudioWakeWordEngine {
    dispatcher: Dispatcher,
    backend: Box<dyn RecognitionBackend>,
    source: Box<dyn AudioSource>,
    options: AudioEngineOptions,
    /// Present while initialized and not running.
    session: Option<Box<dyn RecognitionSession>>,
    thread: DetectionThread<AudioWorker>,
    state: EngineState,
}

impl AudioWakeWordEngine {
    /// Create the engine, load the recognizer and start listening.
    ///
    /// A capture device that cannot be opened does not fail construction;
    /// the engine is returned not running and `start()` may be retried.
    ///
    /// # Errors
    ///
    /// [`WakeWordError::Initialization`] when the backend rejects its
    /// resources, [`WakeWordError::Allocation`] when it runs out of memory or
    /// the detection thread cannot be spawned.  Logged before returning.
    pub fn new(
        listener: Arc<dyn DetectionListener>,
        backend: Box<dyn RecognitionBackend>,
        source: Box<dyn AudioSource>,
        options: AudioEngineOptions,
    ) -> Result<Self, WakeWordError> {
        let mut engine = Self {
            dispatcher: Dispatcher::new(ENGINE, listener),
            backend,
            source,
            options,
            session: None,
            thread: DetectionThread::new("audio-wake-word"),
            state: EngineState::NotInitialized,
        };

        if let Err(e) = engine.init().and_then(|()| engine.start()) {
            log::error!("{ENGINE}: initialization error: {e}");
            return Err(e);
        }
        Ok(engine)
    }

    fn open_session(&self) -> Result<Box<dyn RecognitionSession>, WakeWordError> {
        let config = &self.options.recognition;
        let mut session = self.backend.create_session(config)?;

        session.configure(config.spot_delay)?;

        let negotiated = session.sample_rate();
        if negotiated != config.sample_rate {
            log::warn!(
                "{ENGINE}: recognizer runs at {negotiated} Hz but capture delivers {} Hz",
                config.sample_rate
            );
        }

        session.begin(HistoryRetention::None)?;
        Ok(session)
    }
}

impl WakeWordEngine for AudioWakeWordEngine {
    fn init(&mut self) -> Result<(), WakeWordError> {
        if self.session.is_some() || self.thread.is_running() {
            log::info!("{ENGINE}: already initialized");
            return Ok(());
        }

        let display = |p: &Option<std::path::PathBuf>| {
            p.as_ref()
                .map_or_else(|| "-".to_string(), |p| p.display().to_string())
        };
        log::info!(
            "{ENGINE}: initializing recognizer | model: {} | search: {}",
            display(&self.options.recognition.model_path),
            display(&self.options.recognition.search_path)
        );

        let session = self.open_session()?;
        self.session = Some(session);
        if self.state == EngineState::NotInitialized {
            self.state = EngineState::Initialized;
        }
        Ok(())
    }

    fn start(&mut self) -> Result<(), WakeWordError> {
        if self.thread.is_running() {
            log::info!("{ENGINE}: already started");
            return Ok(());
        }
        if self.session.is_none() {
            return Err(WakeWordError::NotInitialized);
        }
        log::debug!("{ENGINE}: starting");

        let reader = match self.source.open(&self.options.capture) {
            Ok(reader) => reader,
            Err(e) => {
                log::error!("{ENGINE}: cannot open capture stream: {e}");
                return Ok(());
            }
        };
        let Some(session) = self.session.take() else {
            return Err(WakeWordError::NotInitialized);
        };

        let worker = AudioWorker { reader, session };
        let dispatcher = self.dispatcher.clone();
        let frame_samples = self.options.capture.frame_samples;
        let max_backoff = self.options.max_backoff;

        if let Err(e) = self.thread.spawn(move |flag| {
            detection_loop(worker, flag, dispatcher, frame_samples, max_backoff)
        }) {
            // The session went down with the closure; init() must run again.
            self.source.close();
            self.state = EngineState::NotInitialized;
            return Err(e);
        }

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
        self.start()
            .inspect_err(|e| log::error!("{ENGINE}: resume failed: {e}"))
    }

    fn stop(&mut self) {
        if !self.thread.is_running() {
            log::info!("{ENGINE}: already stopped");
            return;
        }
        log::info!("{ENGINE}: joining detection thread");

        match self.thread.join() {
            Some(AudioWorker { reader, session }) => {
                drop(reader);
                self.session = Some(session);
                self.state = EngineState::Stopped;
            }
            None => {
                log::error!("{ENGINE}: recognition session lost; init() required");
                self.state = EngineState::NotInitialized;
            }
        }
        self.source.close();
    }

    fn state(&self) -> EngineState {
        self.state
    }
}

impl Drop for AudioWakeWordEngine {
    fn drop(&mut self) {
        self.stop();
        if self.session.take().is_some() {
            log::debug!("{ENGINE}: recognition session released");
        }
    }
}

fn detection_loop(
    mut worker: AudioWorker,
    flag: RunFlag,
    dispatcher: Dispatcher,
    frame_samples: usize,
    max_backoff: Duration,
) -> AudioWorker {
    log::info!("{ENGINE}: detection thread started");

    let mut frame = vec![0i16; frame_samples];
    let mut reads = Backoff::new("audio-engine: frame read", max_backoff);
    let mut feeds = Backoff::new("audio-engine: recognizer feed", max_backoff);

    while flag.is_set() {
        log::debug!("{ENGINE}: listening for wake word");
        let mut status = RecogStatus::Listening;

        while status != RecogStatus::Done && flag.is_set() {
            match worker.reader.read_frame(&mut frame) {
                Ok(()) => reads.recover(),
                Err(CaptureError::Timeout) => continue,
                Err(e) => {
                    let delay = reads.fail(&e);
                    flag.sleep(delay);
                    continue;
                }
            }

            match worker.session.feed(&frame) {
                Ok(next) => {
                    feeds.recover();
                    status = next;
                }
                Err(e) => {
                    let delay = feeds.fail(&e);
                    flag.sleep(delay);
                }
            }
        }

        if status == RecogStatus::Done {
            match worker.session.result() {
                Ok(result) => {
                    log::info!(
                        "{ENGINE}: recognized {} (score {:.2})",
                        result.text,
                        result.score
                    );
                    dispatcher.wake_word_detected();
                }
                Err(e) => log::error!("{ENGINE}: {e}; no wake event for this utterance"),
            }
        } else {
            log::debug!("{ENGINE}: no recognition result");
        }

        worker.session.reset();
    }

    log::info!("{ENGINE}: detection thread ended");
    worker
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
