//! Blocking wake-signal sources for the signal engine.
//!
//! A [`SignalSource`] turns some external edge (a line on stdin, a key
//! press, a message from another part of the program) into
//! [`Signal::Triggered`].  Sources wait at most one poll interval and report
//! [`Signal::Idle`] when nothing arrived, so the detection loop gets to look
//! at its running flag regularly.
//!
//! ```text
//! stdin line ─┐
//! key press  ─┼─▶ mpsc::Sender<()> ─▶ ChannelSignalSource::wait_for_signal
//! SignalSender┘
//! ```

pub mod channel;
#[cfg(feature = "keyboard")]
pub mod key;
pub mod stdin;

pub use channel::{ChannelSignalSource, SignalSender};
#[cfg(feature = "keyboard")]
pub use key::{parse_key, KeySignalSource};
pub use stdin::StdinSignalSource;

use thiserror::Error;

/// Outcome of one wait on a [`SignalSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// An edge arrived: the user asked for the assistant.
    Triggered,
    /// The wait ended without an edge; equivalent to "not yet triggered".
    Idle,
}

/// Failures reading a signal source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Every producer of edges is gone; no edge will ever arrive again.
    #[error("signal source disconnected")]
    Disconnected,

    /// The underlying device reported an error.  None of the in-tree
    /// sources fail this way; it is for device-backed implementations.
    #[error("signal read failed: {0}")]
    Read(String),
}

/// Blocking source of wake edges.
///
/// Implementations are moved onto the detection thread while the engine
/// runs, hence `Send`.
pub trait SignalSource: Send {
    /// Wait for the next edge, or for the source's own poll interval.
    fn wait_for_signal(&mut self) -> Result<Signal, SourceError>;

    /// Drop edges that piled up while the engine was debouncing.
    fn discard_pending(&mut self) {}
}
