//! Microphone capture via `cpal`.
//!
//! [`CpalAudioSource`] wraps the cpal host/device/stream lifecycle.  The
//! stream is opened with exactly the requested rate and channel count in
//! signed 16-bit samples; no conversion is attempted, a device that cannot
//! deliver that format fails [`AudioSource::open`].
//!
//! `cpal::Stream` is not `Send` on every platform, so the stream itself stays
//! in the source (on the controlling thread) and only the channel-backed
//! [`ChannelFrameReader`] travels to the detection thread.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use super::{AudioSource, CaptureError, CaptureSpec, ChannelFrameReader, FrameReader};

/// [`AudioSource`] backed by the default cpal host.
#[derive(Default)]
pub struct CpalAudioSource {
    stream: Option<cpal::Stream>,
}

impl CpalAudioSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` while a capture stream is open.
    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    fn find_device(spec: &CaptureSpec) -> Result<cpal::Device, CaptureError> {
        let host = cpal::default_host();

        let Some(wanted) = spec.device.as_deref() else {
            return host.default_input_device().ok_or(CaptureError::NoDevice);
        };

        let mut devices = host
            .input_devices()
            .map_err(|e| CaptureError::Busy(e.to_string()))?;
        devices
            .find(|d| d.name().is_ok_and(|name| name == wanted))
            .ok_or_else(|| CaptureError::DeviceNotFound(wanted.to_string()))
    }
}

impl AudioSource for CpalAudioSource {
    fn open(&mut self, spec: &CaptureSpec) -> Result<Box<dyn FrameReader>, CaptureError> {
        if self.stream.is_some() {
            return Err(CaptureError::Busy("capture stream already open".into()));
        }

        let device = Self::find_device(spec)?;
        let config = cpal::StreamConfig {
            channels: spec.channels,
            sample_rate: cpal::SampleRate(spec.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let (tx, reader) = ChannelFrameReader::channel(spec.read_timeout);

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    // The reader may already be gone during shutdown.
                    let _ = tx.send(data.to_vec());
                },
                |err: cpal::StreamError| {
                    log::error!("capture: cpal stream error: {err}");
                },
                None,
            )
            .map_err(|e| match e {
                cpal::BuildStreamError::StreamConfigNotSupported => CaptureError::Unsupported(
                    format!(
                        "{} Hz, {} channel(s), i16",
                        spec.sample_rate, spec.channels
                    ),
                ),
                cpal::BuildStreamError::DeviceNotAvailable => {
                    CaptureError::Busy("device not available".into())
                }
                other => CaptureError::Busy(other.to_string()),
            })?;

        stream
            .play()
            .map_err(|e| CaptureError::Busy(e.to_string()))?;

        log::debug!(
            "capture: recording {} Hz, {} channel(s), {} samples per frame",
            spec.sample_rate,
            spec.channels,
            spec.frame_samples
        );
        self.stream = Some(stream);
        Ok(Box::new(reader))
    }

    fn close(&mut self) {
        if self.stream.take().is_some() {
            log::debug!("capture: stream released");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
