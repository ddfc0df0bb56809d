//! Audio capture for the audio engine: fixed-size frames of 16-bit PCM.
//!
//! # Pipeline
//!
//! ```text
//! Microphone → cpal callback → Vec<i16> (mpsc) → ChannelFrameReader
//!            → read_frame(&mut [i16; frame_samples]) → recognition session
//! ```
//!
//! An [`AudioSource`] stays with the engine and owns the capture stream.
//! [`AudioSource::open`] hands out a [`FrameReader`] that is moved onto the
//! detection thread; [`AudioSource::close`] releases the stream once the
//! thread has been joined.

#[cfg(feature = "capture")]
pub mod capture;
pub mod reader;

#[cfg(feature = "capture")]
pub use capture::CpalAudioSource;
pub use reader::ChannelFrameReader;

use std::time::Duration;

use thiserror::Error;

// ---------------------------------------------------------------------------
// CaptureSpec
// ---------------------------------------------------------------------------

/// How the capture stream must be opened.  Samples are always signed 16-bit.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSpec {
    /// Sample rate in Hz (16 000 for the stock wake-word models).
    pub sample_rate: u32,
    /// Interleaved channel count.
    pub channels: u16,
    /// Samples per frame handed to the recognizer.
    pub frame_samples: usize,
    /// Longest a single [`FrameReader::read_frame`] may block.
    pub read_timeout: Duration,
    /// Input device name; `None` means the system default.
    pub device: Option<String>,
}

impl Default for CaptureSpec {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            channels: 1,
            frame_samples: 160,
            read_timeout: Duration::from_millis(100),
            device: None,
        }
    }
}

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Errors opening or reading the capture stream.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no input device found on the default audio host")]
    NoDevice,

    #[error("input device {0:?} not found")]
    DeviceNotFound(String),

    /// The device exists but cannot be opened right now.
    #[error("capture device busy: {0}")]
    Busy(String),

    /// The device rejected the requested rate / channels / format.
    #[error("unsupported capture format: {0}")]
    Unsupported(String),

    /// No frame arrived within the read timeout.
    #[error("timed out waiting for audio")]
    Timeout,

    /// The stream behind the reader has gone away.
    #[error("capture stream closed")]
    Disconnected,

    /// Any other per-read failure (overrun, driver error) from a custom
    /// [`FrameReader`].
    #[error("audio read failed: {0}")]
    Read(String),
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Blocking reader of fixed-size frames; lives on the detection thread.
pub trait FrameReader: Send {
    /// Fill `frame` completely, or fail without consuming a partial frame.
    fn read_frame(&mut self, frame: &mut [i16]) -> Result<(), CaptureError>;
}

/// Owner of the capture stream; lives with the engine.
pub trait AudioSource {
    /// Open the stream in blocking-record mode.
    ///
    /// A source holds at most one stream; call [`close`](Self::close) before
    /// opening again.
    fn open(&mut self, spec: &CaptureSpec) -> Result<Box<dyn FrameReader>, CaptureError>;

    /// Release the stream.  No-op when nothing is open.
    fn close(&mut self);
}
