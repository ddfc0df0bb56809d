//! Button emulation on standard input: every line read is one edge.
//!
//! Reading stdin cannot be interrupted, so the reader lives on its own
//! detached thread and forwards edges over a channel.  Once stdin reaches EOF
//! the channel closes and the source reports [`SourceError::Disconnected`].
//!
//! [`SourceError::Disconnected`]: super::SourceError::Disconnected

use std::io::BufRead;
use std::sync::mpsc;
use std::time::Duration;

use super::{ChannelSignalSource, Signal, SignalSource, SourceError};

pub struct StdinSignalSource {
    inner: ChannelSignalSource,
    /// Never joined: the thread stays blocked in `read_line` until the
    /// process exits or stdin closes.
    _reader: std::thread::JoinHandle<()>,
}

impl StdinSignalSource {
    /// Spawn the stdin reader thread.
    ///
    /// # Errors
    ///
    /// Returns the OS error when the reader thread cannot be created.
    pub fn spawn(poll_interval: Duration) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel();

        let reader = std::thread::Builder::new()
            .name("stdin-signal".into())
            .spawn(move || {
                let stdin = std::io::stdin();
                for line in stdin.lock().lines() {
                    if let Err(e) = line {
                        log::error!("stdin-signal: read failed: {e}");
                        break;
                    }
                    if tx.send(()).is_err() {
                        break;
                    }
                }
                log::debug!("stdin-signal: reader finished");
            })?;

        Ok(Self {
            inner: ChannelSignalSource::from_receiver(rx, poll_interval),
            _reader: reader,
        })
    }
}

impl SignalSource for StdinSignalSource {
    fn wait_for_signal(&mut self) -> Result<Signal, SourceError> {
        self.inner.wait_for_signal()
    }

    fn discard_pending(&mut self) {
        self.inner.discard_pending()
    }
}
