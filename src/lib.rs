//! Pluggable wake-word detection.
//!
//! An engine watches an input in the background and tells a
//! [`DetectionListener`] each time the wake word is heard.  Two engines share
//! the [`WakeWordEngine`] lifecycle:
//!
//! - [`SignalWakeWordEngine`] treats every edge from a [`signal::SignalSource`]
//!   (a line on stdin, a key press, a test channel) as a detection.
//! - [`AudioWakeWordEngine`] streams microphone frames into a
//!   [`recognition::RecognitionBackend`] session and fires on each completed
//!   utterance.
//!
//! ```text
//! config ──▶ build_engine ──▶ Box<dyn WakeWordEngine>
//!                                   │ detection thread
//!                                   ▼
//!                      DetectionListener::on_wake_word_detected
//! ```

pub mod audio;
pub mod config;
pub mod engine;
pub mod recognition;
pub mod signal;

pub use config::WakeConfig;
pub use engine::{
    build_engine, AudioEngineOptions, AudioWakeWordEngine, DetectionListener, EngineState,
    SignalEngineOptions, SignalWakeWordEngine, WakeWordEngine, WakeWordError,
};
