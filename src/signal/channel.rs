//! In-process signal source fed through an mpsc channel.
//!
//! The stdin and key sources are thin producers on top of this; embedders
//! can also trigger the engine directly through a [`SignalSender`].

use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use super::{Signal, SignalSource, SourceError};

/// Producer half: each [`trigger`](Self::trigger) is one edge.
#[derive(Debug, Clone)]
pub struct SignalSender {
    tx: mpsc::Sender<()>,
}

impl SignalSender {
    /// Send one edge.  Returns `false` when the source has been dropped.
    pub fn trigger(&self) -> bool {
        self.tx.send(()).is_ok()
    }
}

/// Consumer half, waiting up to `poll_interval` per call.
#[derive(Debug)]
pub struct ChannelSignalSource {
    rx: mpsc::Receiver<()>,
    poll_interval: Duration,
}

impl ChannelSignalSource {
    /// Create a connected sender / source pair.
    ///
    /// ```
    /// use std::time::Duration;
    /// use wake_word::signal::{ChannelSignalSource, Signal, SignalSource};
    ///
    /// let (sender, mut source) = ChannelSignalSource::channel(Duration::from_millis(5));
    /// assert_eq!(source.wait_for_signal().unwrap(), Signal::Idle);
    /// sender.trigger();
    /// assert_eq!(source.wait_for_signal().unwrap(), Signal::Triggered);
    /// ```
    pub fn channel(poll_interval: Duration) -> (SignalSender, Self) {
        let (tx, rx) = mpsc::channel();
        (SignalSender { tx }, Self::from_receiver(rx, poll_interval))
    }

    pub(crate) fn from_receiver(rx: mpsc::Receiver<()>, poll_interval: Duration) -> Self {
        Self { rx, poll_interval }
    }
}

impl SignalSource for ChannelSignalSource {
    fn wait_for_signal(&mut self) -> Result<Signal, SourceError> {
        match self.rx.recv_timeout(self.poll_interval) {
            Ok(()) => Ok(Signal::Triggered),
            Err(RecvTimeoutError::Timeout) => Ok(Signal::Idle),
            Err(RecvTimeoutError::Disconnected) => Err(SourceError::Disconnected),
        }
    }

    fn discard_pending(&mut self) {
        let dropped = self.rx.try_iter().count();
        if dropped > 0 {
            log::debug!("signal: discarded {dropped} edge(s) received while debouncing");
        }
    }
}
