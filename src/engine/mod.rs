//! Wake-word engines: one lifecycle contract, several detection strategies.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                  WakeWordEngine (trait)                      │
//! │      init · start · pause · resume · stop · state            │
//! │                                                              │
//! │  ┌──────────────────────┐     ┌───────────────────────────┐  │
//! │  │ SignalWakeWordEngine │     │   AudioWakeWordEngine     │  │
//! │  │  SignalSource        │     │   AudioSource → frames    │  │
//! │  │  edge → detect       │     │   RecognitionSession      │  │
//! │  │  debounce            │     │   Done → result → detect  │  │
//! │  └──────────┬───────────┘     └─────────────┬─────────────┘  │
//! │             └──────── DetectionThread ──────┘                │
//! │                  (running flag, join)                        │
//! │                          │                                   │
//! │                          ▼                                   │
//! │          Dispatcher → DetectionListener::on_wake_word_detected│
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every engine runs at most one detection thread.  `stop()` clears the
//! running flag and joins that thread before releasing capture resources,
//! so no callback fires after `stop()` returns.

pub mod audio;
pub mod listener;
pub mod signal;
pub mod thread;

pub use audio::{AudioEngineOptions, AudioWakeWordEngine};
pub use listener::DetectionListener;
pub use signal::{SignalEngineOptions, SignalWakeWordEngine};

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::{EngineKind, SignalTrigger, WakeConfig};
use crate::recognition::BackendError;
use crate::signal::{SignalSource, StdinSignalSource};

// ---------------------------------------------------------------------------
// WakeWordError
// ---------------------------------------------------------------------------

/// Setup failures surfaced to the owner of an engine.
///
/// Steady-state problems inside a detection loop never become errors; they
/// are logged and the loop carries on.
#[derive(Debug, Clone, Error)]
pub enum WakeWordError {
    /// A required resource (model, search file, device) is missing or was
    /// rejected.
    #[error("initialization error: {0}")]
    Initialization(String),

    /// Memory or threads could not be obtained during setup.
    #[error("allocation error: {0}")]
    Allocation(String),

    /// `start()` was called before a successful `init()`.
    #[error("engine is not initialized")]
    NotInitialized,
}

impl From<BackendError> for WakeWordError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::OutOfMemory(_) => Self::Allocation(e.to_string()),
            other => Self::Initialization(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// EngineState
// ---------------------------------------------------------------------------

/// Lifecycle states shared by all engines.
///
/// ```text
/// NotInitialized ──init──▶ Initialized ──start──▶ Running
/// Running ──pause──▶ Paused ──resume──▶ Running
/// Running ──stop───▶ Stopped ──start──▶ Running
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    NotInitialized,
    Initialized,
    Running,
    Paused,
    Stopped,
}

impl EngineState {
    /// A short human-readable label for log lines and status output.
    pub fn label(&self) -> &'static str {
        match self {
            EngineState::NotInitialized => "not initialized",
            EngineState::Initialized => "initialized",
            EngineState::Running => "running",
            EngineState::Paused => "paused",
            EngineState::Stopped => "stopped",
        }
    }
}

impl Default for EngineState {
    fn default() -> Self {
        EngineState::NotInitialized
    }
}

// ---------------------------------------------------------------------------
// WakeWordEngine trait
// ---------------------------------------------------------------------------

/// Lifecycle contract every detection engine implements.
///
/// All methods are synchronous and idempotent: repeating a call in the state
/// it leads to is a logged no-op.
pub trait WakeWordEngine {
    /// Acquire backend resources (models, search files).
    fn init(&mut self) -> Result<(), WakeWordError>;

    /// Start the detection thread.
    ///
    /// A capture device that cannot be opened is logged and leaves the engine
    /// not running, ready for another `start()`; only setup invariant
    /// violations are returned as errors.
    fn start(&mut self) -> Result<(), WakeWordError>;

    /// Halt detection and release the input device until [`resume`](Self::resume).
    fn pause(&mut self);

    /// Re-acquire the input device and restart detection after a pause.
    fn resume(&mut self) -> Result<(), WakeWordError>;

    /// Stop detection, join the thread, then release capture resources.
    fn stop(&mut self);

    fn state(&self) -> EngineState;

    fn is_running(&self) -> bool {
        self.state() == EngineState::Running
    }
}

// Compile-time assertion: Box<dyn WakeWordEngine> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn WakeWordEngine>) {}
};

// ---------------------------------------------------------------------------
// build_engine
// ---------------------------------------------------------------------------

/// Build and start the engine selected by `config.engine`.
///
/// The signal engine reads stdin or a global key; the audio engine captures
/// the microphone through cpal and spots with
/// [`EnergySpotter`](crate::recognition::EnergySpotter).
///
/// # Errors
///
/// Any [`WakeWordError`] raised while constructing the engine, or
/// [`WakeWordError::Initialization`] when the configured input is not
/// available in this build.
pub fn build_engine(
    config: &WakeConfig,
    listener: Arc<dyn DetectionListener>,
) -> Result<Box<dyn WakeWordEngine>, WakeWordError> {
    match config.engine {
        EngineKind::Signal => {
            let source = signal_source(config)?;
            let options = SignalEngineOptions {
                debounce: Duration::from_millis(config.signal.debounce_ms),
                max_backoff: config.max_backoff(),
            };
            Ok(Box::new(SignalWakeWordEngine::new(listener, source, options)?))
        }
        EngineKind::Audio => audio_engine(config, listener),
    }
}

fn signal_source(config: &WakeConfig) -> Result<Box<dyn SignalSource>, WakeWordError> {
    let poll = Duration::from_millis(config.signal.poll_interval_ms);
    let spawn_failed = |e: std::io::Error| {
        WakeWordError::Allocation(format!("cannot spawn signal reader thread: {e}"))
    };

    match config.signal.trigger {
        SignalTrigger::Stdin => Ok(Box::new(StdinSignalSource::spawn(poll).map_err(spawn_failed)?)),
        #[cfg(feature = "keyboard")]
        SignalTrigger::Key => {
            let key = crate::signal::parse_key(&config.signal.key).ok_or_else(|| {
                WakeWordError::Initialization(format!(
                    "unknown trigger key {:?}",
                    config.signal.key
                ))
            })?;
            Ok(Box::new(
                crate::signal::KeySignalSource::spawn(key, poll).map_err(spawn_failed)?,
            ))
        }
        #[cfg(not(feature = "keyboard"))]
        SignalTrigger::Key => Err(WakeWordError::Initialization(
            "key trigger needs the `keyboard` feature".into(),
        )),
    }
}

#[cfg(feature = "capture")]
fn audio_engine(
    config: &WakeConfig,
    listener: Arc<dyn DetectionListener>,
) -> Result<Box<dyn WakeWordEngine>, WakeWordError> {
    use crate::config::AppPaths;
    use crate::recognition::EnergySpotter;

    let rec = &config.recognition;
    let backend = EnergySpotter::new(rec.energy_threshold, rec.min_voiced_frames, &rec.phrase);
    let options = AudioEngineOptions {
        recognition: config.recognition_config(&AppPaths::new()),
        capture: config.capture_spec(),
        max_backoff: config.max_backoff(),
    };

    Ok(Box::new(AudioWakeWordEngine::new(
        listener,
        Box::new(backend),
        Box::new(crate::audio::CpalAudioSource::new()),
        options,
    )?))
}

#[cfg(not(feature = "capture"))]
fn audio_engine(
    _config: &WakeConfig,
    _listener: Arc<dyn DetectionListener>,
) -> Result<Box<dyn WakeWordEngine>, WakeWordError> {
    Err(WakeWordError::Initialization(
        "audio engine needs the `capture` feature".into(),
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
