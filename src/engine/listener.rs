//! The detection callback and the single dispatch point that calls it.

use std::sync::Arc;

/// Consumer of wake events.
///
/// Called from the engine's detection thread, once per detection, never
/// concurrently by the same engine.  Keep the body short: the detection loop
/// does not read input while the callback runs.
///
/// Any `Fn() + Send + Sync` closure is a listener:
///
/// ```
/// use std::sync::Arc;
/// use wake_word::DetectionListener;
///
/// let listener: Arc<dyn DetectionListener> = Arc::new(|| println!("wake!"));
/// listener.on_wake_word_detected();
/// ```
pub trait DetectionListener: Send + Sync {
    fn on_wake_word_detected(&self);
}

impl<F> DetectionListener for F
where
    F: Fn() + Send + Sync,
{
    fn on_wake_word_detected(&self) {
        self()
    }
}

/// Shared handle every engine variant clones into its detection loop.
#[derive(Clone)]
pub(crate) struct Dispatcher {
    engine: &'static str,
    listener: Arc<dyn DetectionListener>,
}

impl Dispatcher {
    pub(crate) fn new(engine: &'static str, listener: Arc<dyn DetectionListener>) -> Self {
        Self { engine, listener }
    }

    /// Notify the listener of exactly one detection.
    pub(crate) fn wake_word_detected(&self) {
        log::info!("{}: wake word detected", self.engine);
        self.listener.on_wake_word_detected();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn closure_listener_is_called_once_per_dispatch() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let dispatcher = Dispatcher::new(
            "test-engine",
            Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        dispatcher.wake_word_detected();
        dispatcher.clone().wake_word_detected();

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn listener_is_object_safe_and_send_sync() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn DetectionListener>();
        let _boxed: Box<dyn DetectionListener> = Box::new(|| {});
    }
}
