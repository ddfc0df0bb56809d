//! Reassembles variable-size capture callbacks into fixed-size frames.

use std::collections::VecDeque;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use super::{CaptureError, FrameReader};

/// [`FrameReader`] over an mpsc channel of sample chunks.
///
/// Chunks arrive in whatever size the audio host delivers; samples are
/// queued until a whole frame is available.  A timeout leaves any partial
/// frame queued for the next call.
#[derive(Debug)]
pub struct ChannelFrameReader {
    rx: mpsc::Receiver<Vec<i16>>,
    pending: VecDeque<i16>,
    timeout: Duration,
}

impl ChannelFrameReader {
    pub fn new(rx: mpsc::Receiver<Vec<i16>>, timeout: Duration) -> Self {
        Self {
            rx,
            pending: VecDeque::new(),
            timeout,
        }
    }

    /// Create a connected chunk sender / reader pair.
    pub fn channel(timeout: Duration) -> (mpsc::Sender<Vec<i16>>, Self) {
        let (tx, rx) = mpsc::channel();
        (tx, Self::new(rx, timeout))
    }

    /// Samples received but not yet handed out.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

impl FrameReader for ChannelFrameReader {
    fn read_frame(&mut self, frame: &mut [i16]) -> Result<(), CaptureError> {
        while self.pending.len() < frame.len() {
            match self.rx.recv_timeout(self.timeout) {
                Ok(chunk) => self.pending.extend(chunk),
                Err(RecvTimeoutError::Timeout) => return Err(CaptureError::Timeout),
                Err(RecvTimeoutError::Disconnected) => return Err(CaptureError::Disconnected),
            }
        }

        let len = frame.len();
        for (slot, sample) in frame.iter_mut().zip(self.pending.drain(..len)) {
            *slot = sample;
        }
        Ok(())
    }
}
