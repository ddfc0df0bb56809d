//! Global key press as a wake signal, backed by `rdev`.
//!
//! `rdev::listen` is a blocking OS-level call with no shutdown API, so it
//! runs on a dedicated thread that is never joined.  Dropping the
//! [`KeySignalSource`] sets a stop flag and the callback discards further
//! events; the thread stays parked in the rdev event loop until the process
//! exits.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    mpsc, Arc,
};
use std::time::Duration;

use super::{ChannelSignalSource, Signal, SignalSource, SourceError};

/// Parse a key name from the config into an [`rdev::Key`].
///
/// Supports F1-F12 and a handful of named keys.  Returns `None` for anything
/// else so the caller can report the bad setting.
///
/// ```
/// use wake_word::signal::parse_key;
///
/// assert_eq!(parse_key("F9"), Some(rdev::Key::F9));
/// assert_eq!(parse_key("space"), Some(rdev::Key::Space));
/// assert_eq!(parse_key("Ctrl+V"), None);
/// ```
pub fn parse_key(name: &str) -> Option<rdev::Key> {
    use rdev::Key;

    let key = match name.to_ascii_lowercase().as_str() {
        "f1" => Key::F1,
        "f2" => Key::F2,
        "f3" => Key::F3,
        "f4" => Key::F4,
        "f5" => Key::F5,
        "f6" => Key::F6,
        "f7" => Key::F7,
        "f8" => Key::F8,
        "f9" => Key::F9,
        "f10" => Key::F10,
        "f11" => Key::F11,
        "f12" => Key::F12,
        "space" => Key::Space,
        "return" | "enter" => Key::Return,
        "escape" | "esc" => Key::Escape,
        "pause" => Key::Pause,
        "scrolllock" => Key::ScrollLock,
        _ => return None,
    };
    Some(key)
}

/// Emits one edge per press of the configured key.  Key repeat while held
/// is filtered out; the next edge needs a release first.
pub struct KeySignalSource {
    inner: ChannelSignalSource,
    stop: Arc<AtomicBool>,
    _thread: std::thread::JoinHandle<()>,
}

impl KeySignalSource {
    /// Spawn the rdev listener thread for `key`.
    ///
    /// # Errors
    ///
    /// Returns the OS error when the listener thread cannot be created.
    pub fn spawn(key: rdev::Key, poll_interval: Duration) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let thread = std::thread::Builder::new()
            .name("key-signal".into())
            .spawn(move || {
                let mut held = false;
                let result = rdev::listen(move |event| {
                    if stop_flag.load(Ordering::Relaxed) {
                        return;
                    }
                    match event.event_type {
                        rdev::EventType::KeyPress(k) if k == key && !held => {
                            held = true;
                            let _ = tx.send(());
                        }
                        rdev::EventType::KeyRelease(k) if k == key => held = false,
                        _ => {}
                    }
                });

                if let Err(e) = result {
                    log::error!("key-signal: rdev::listen exited with error: {e:?}");
                }
            })?;

        Ok(Self {
            inner: ChannelSignalSource::from_receiver(rx, poll_interval),
            stop,
            _thread: thread,
        })
    }
}

impl SignalSource for KeySignalSource {
    fn wait_for_signal(&mut self) -> Result<Signal, SourceError> {
        self.inner.wait_for_signal()
    }

    fn discard_pending(&mut self) {
        self.inner.discard_pending()
    }
}

impl Drop for KeySignalSource {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}
