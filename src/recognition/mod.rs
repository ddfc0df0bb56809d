//! Frame-by-frame recognition backends for the audio engine.
//!
//! # Architecture
//!
//! ```text
//! RecognitionBackend::create_session(&RecognitionConfig)
//!        │   (loads model + search resources)
//!        ▼
//! RecognitionSession ── configure(SpotDelay) ── begin(HistoryRetention)
//!        │
//!        ├─ feed(frame) → Listening | Done     (once per audio frame)
//!        ├─ result()    → Recognition { score, text }
//!        └─ reset()                            (after every cycle)
//! ```
//!
//! A session is created once by the engine's `init`, moved onto the
//! detection thread while running, and dropped exactly once when the engine
//! is torn down.  Backends release their own native resources in `Drop`, in
//! reverse order of acquisition.

pub mod energy;

pub use energy::EnergySpotter;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Policies
// ---------------------------------------------------------------------------

/// How eagerly a phrase spotter reports a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpotDelay {
    /// Report as soon as the phrase is recognized.
    Asap,
    /// Wait this many milliseconds of extra audio to confirm the match.
    Confirm { millis: u32 },
}

impl Default for SpotDelay {
    fn default() -> Self {
        Self::Asap
    }
}

/// What recognizer state survives from one session start to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryRetention {
    /// Start every session from scratch.
    None,
    /// Keep adaptation state (noise floor etc.) across sessions.  For
    /// backends that adapt; the engine itself always asks for `None`, and
    /// stateless backends treat both alike.
    Keep,
}

// ---------------------------------------------------------------------------
// Config / results
// ---------------------------------------------------------------------------

/// Everything a backend needs to build a session.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionConfig {
    /// Acoustic model file, for backends that need one.
    pub model_path: Option<PathBuf>,
    /// Prebuilt search (grammar) file, for backends that need one.
    pub search_path: Option<PathBuf>,
    /// Sample rate the engine will feed, in Hz.
    pub sample_rate: u32,
    /// Samples per fed frame.
    pub frame_samples: usize,
    /// Number of candidate results a vendor decoder should keep.  Only the
    /// top one is ever reported; the energy spotter has a single candidate
    /// and just rejects 0.
    pub n_best: usize,
    pub spot_delay: SpotDelay,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            search_path: None,
            sample_rate: 16_000,
            frame_samples: 160,
            n_best: 1,
            spot_delay: SpotDelay::Asap,
        }
    }
}

/// Status after feeding one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecogStatus {
    /// Still accumulating audio.
    Listening,
    /// An utterance is complete; fetch it with [`RecognitionSession::result`].
    Done,
}

/// Top result of a completed utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
    /// Backend confidence in `[0.0, 1.0]`.
    pub score: f32,
    /// Recognized phrase.
    pub text: String,
}

// ---------------------------------------------------------------------------
// BackendError
// ---------------------------------------------------------------------------

/// Failures reported by a recognition backend.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// A model or search file does not exist.
    #[error("recognition resource not found: {}", .0.display())]
    ResourceMissing(PathBuf),

    /// The backend refused a resource or setting.
    #[error("recognition backend rejected {0}")]
    Rejected(String),

    /// The backend could not allocate its working memory.
    #[error("out of memory while creating {0}")]
    OutOfMemory(String),

    /// A frame could not be processed.
    #[error("cannot feed frame: {0}")]
    Feed(String),

    /// The result of a completed utterance could not be read.
    #[error("cannot read recognition result: {0}")]
    Result(String),
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// A live recognizer: the per-utterance state machine.
pub trait RecognitionSession: Send {
    /// Sample rate the recognizer negotiated, in Hz.
    fn sample_rate(&self) -> u32;

    /// Apply the phrase-spot delay policy.
    fn configure(&mut self, delay: SpotDelay) -> Result<(), BackendError>;

    /// Prepare the recognizer for its first utterance.
    fn begin(&mut self, retention: HistoryRetention) -> Result<(), BackendError>;

    /// Feed one frame of 16-bit PCM.
    fn feed(&mut self, frame: &[i16]) -> Result<RecogStatus, BackendError>;

    /// Top result of the utterance that just reached [`RecogStatus::Done`].
    fn result(&mut self) -> Result<Recognition, BackendError>;

    /// Clear per-utterance buffers before the next cycle.
    fn reset(&mut self);
}

/// Factory for sessions; one backend value can build many sessions.
pub trait RecognitionBackend {
    fn create_session(
        &self,
        config: &RecognitionConfig,
    ) -> Result<Box<dyn RecognitionSession>, BackendError>;
}

// Compile-time assertion: both traits must stay object-safe.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn RecognitionBackend>, _: Box<dyn RecognitionSession>) {}
};
