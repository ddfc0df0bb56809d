//! Shared doubles for the engine integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex, OnceLock};
use std::time::Duration;

use wake_word::audio::{AudioSource, CaptureError, CaptureSpec, ChannelFrameReader, FrameReader};
use wake_word::recognition::{
    BackendError, HistoryRetention, RecogStatus, Recognition, RecognitionBackend,
    RecognitionConfig, RecognitionSession, SpotDelay,
};

// ---------------------------------------------------------------------------
// Listener
// ---------------------------------------------------------------------------

/// Returns a listener closure and the counter it bumps.
pub fn counting_listener() -> (Arc<dyn wake_word::DetectionListener>, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);
    let listener = Arc::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    (listener, count)
}

/// Poll `count` until it reaches `expected` or `timeout` passes.
pub fn wait_for_count(count: &AtomicUsize, expected: usize, timeout: Duration) -> bool {
    let deadline = std::time::Instant::now() + timeout;
    while std::time::Instant::now() < deadline {
        if count.load(Ordering::SeqCst) >= expected {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    count.load(Ordering::SeqCst) >= expected
}

// ---------------------------------------------------------------------------
// Capturing logger
// ---------------------------------------------------------------------------

struct CaptureLogger {
    lines: Mutex<Vec<String>>,
}

impl log::Log for CaptureLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(format!("{} {}", record.level(), record.args()));
        }
    }

    fn flush(&self) {}
}

static LOGGER: OnceLock<CaptureLogger> = OnceLock::new();

/// Install the capturing logger for this test binary (first call wins).
pub fn capture_logs() {
    let logger = LOGGER.get_or_init(|| CaptureLogger {
        lines: Mutex::new(Vec::new()),
    });
    if log::set_logger(logger).is_ok() {
        log::set_max_level(log::LevelFilter::Debug);
    }
}

/// Every captured line containing `needle`.
pub fn logged(needle: &str) -> Vec<String> {
    LOGGER
        .get()
        .and_then(|l| l.lines.lock().ok().map(|lines| lines.clone()))
        .unwrap_or_default()
        .into_iter()
        .filter(|line| line.contains(needle))
        .collect()
}

// ---------------------------------------------------------------------------
// Scripted recognition backend
// ---------------------------------------------------------------------------

/// Counters shared between a [`ScriptedBackend`] and its sessions.
#[derive(Default)]
pub struct BackendStats {
    pub sessions_created: AtomicUsize,
    pub sessions_dropped: AtomicUsize,
    pub frames_fed: AtomicUsize,
    pub feeds_failed: AtomicUsize,
    pub resets: AtomicUsize,
}

/// Backend whose sessions report Done after a fixed number of frames.
pub struct ScriptedBackend {
    pub done_after: usize,
    pub score: f32,
    pub text: String,
    pub fail_result: bool,
    /// Every n-th `feed` call fails; 0 never fails.
    pub fail_feed_every: usize,
    pub reject: Option<BackendError>,
    pub stats: Arc<BackendStats>,
}

impl ScriptedBackend {
    pub fn new(done_after: usize, score: f32, text: &str) -> Self {
        Self {
            done_after,
            score,
            text: text.to_string(),
            fail_result: false,
            fail_feed_every: 0,
            reject: None,
            stats: Arc::new(BackendStats::default()),
        }
    }
}

impl RecognitionBackend for ScriptedBackend {
    fn create_session(
        &self,
        _config: &RecognitionConfig,
    ) -> Result<Box<dyn RecognitionSession>, BackendError> {
        if let Some(e) = &self.reject {
            return Err(e.clone());
        }
        self.stats.sessions_created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedSession {
            done_after: self.done_after,
            score: self.score,
            text: self.text.clone(),
            fail_result: self.fail_result,
            fail_feed_every: self.fail_feed_every,
            calls: 0,
            fed: 0,
            stats: Arc::clone(&self.stats),
        }))
    }
}

struct ScriptedSession {
    done_after: usize,
    score: f32,
    text: String,
    fail_result: bool,
    fail_feed_every: usize,
    calls: usize,
    fed: usize,
    stats: Arc<BackendStats>,
}

impl RecognitionSession for ScriptedSession {
    fn sample_rate(&self) -> u32 {
        16_000
    }

    fn configure(&mut self, _delay: SpotDelay) -> Result<(), BackendError> {
        Ok(())
    }

    fn begin(&mut self, _retention: HistoryRetention) -> Result<(), BackendError> {
        Ok(())
    }

    fn feed(&mut self, _frame: &[i16]) -> Result<RecogStatus, BackendError> {
        self.calls += 1;
        if self.fail_feed_every > 0 && self.calls % self.fail_feed_every == 0 {
            self.stats.feeds_failed.fetch_add(1, Ordering::SeqCst);
            return Err(BackendError::Feed("decoder hiccup".into()));
        }
        self.stats.frames_fed.fetch_add(1, Ordering::SeqCst);
        self.fed += 1;
        Ok(if self.fed >= self.done_after {
            RecogStatus::Done
        } else {
            RecogStatus::Listening
        })
    }

    fn result(&mut self) -> Result<Recognition, BackendError> {
        if self.fail_result {
            return Err(BackendError::Result("no hypothesis".into()));
        }
        Ok(Recognition {
            score: self.score,
            text: self.text.clone(),
        })
    }

    fn reset(&mut self) {
        self.fed = 0;
        self.stats.resets.fetch_add(1, Ordering::SeqCst);
    }
}

impl Drop for ScriptedSession {
    fn drop(&mut self) {
        self.stats.sessions_dropped.fetch_add(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Scripted audio source
// ---------------------------------------------------------------------------

/// Counters shared between a [`ScriptedSource`] and its readers.
#[derive(Default)]
pub struct SourceStats {
    pub opens: AtomicUsize,
    pub reads: AtomicUsize,
    pub reads_failed: AtomicUsize,
    pub closes: AtomicUsize,
    pub live_readers: AtomicUsize,
    pub max_live_readers: AtomicUsize,
    /// Readers still alive when `close()` was called.
    pub closed_while_reading: AtomicUsize,
}

/// Audio source that refuses the first `busy_opens` opens and otherwise
/// hands out channel-fed readers.
pub struct ScriptedSource {
    pub busy_opens: usize,
    /// Every n-th `read_frame` call fails before touching the stream; 0
    /// never fails.
    pub fail_read_every: usize,
    pub stats: Arc<SourceStats>,
    pub feeds: Arc<Mutex<Vec<mpsc::Sender<Vec<i16>>>>>,
}

impl ScriptedSource {
    pub fn new(busy_opens: usize) -> Self {
        Self {
            busy_opens,
            fail_read_every: 0,
            stats: Arc::new(SourceStats::default()),
            feeds: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

/// Push `frames` frames of `samples` zeros into the most recently opened reader.
pub fn push_frames(feeds: &Mutex<Vec<mpsc::Sender<Vec<i16>>>>, frames: usize, samples: usize) {
    let feeds = feeds.lock().unwrap();
    let tx = feeds.last().expect("no capture stream open");
    for _ in 0..frames {
        tx.send(vec![0; samples]).unwrap();
    }
}

impl AudioSource for ScriptedSource {
    fn open(&mut self, spec: &CaptureSpec) -> Result<Box<dyn FrameReader>, CaptureError> {
        let attempt = self.stats.opens.fetch_add(1, Ordering::SeqCst);
        if attempt < self.busy_opens {
            return Err(CaptureError::Busy("device in use".into()));
        }
        let (tx, inner) = ChannelFrameReader::channel(spec.read_timeout);
        self.feeds.lock().unwrap().push(tx);

        let live = self.stats.live_readers.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.max_live_readers.fetch_max(live, Ordering::SeqCst);
        Ok(Box::new(TrackedReader {
            inner,
            fail_every: self.fail_read_every,
            stats: Arc::clone(&self.stats),
        }))
    }

    fn close(&mut self) {
        self.stats.closes.fetch_add(1, Ordering::SeqCst);
        let live = self.stats.live_readers.load(Ordering::SeqCst);
        self.stats.closed_while_reading.fetch_add(live, Ordering::SeqCst);
    }
}

struct TrackedReader {
    inner: ChannelFrameReader,
    fail_every: usize,
    stats: Arc<SourceStats>,
}

impl FrameReader for TrackedReader {
    fn read_frame(&mut self, frame: &mut [i16]) -> Result<(), CaptureError> {
        let n = self.stats.reads.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_every > 0 && n % self.fail_every == 0 {
            self.stats.reads_failed.fetch_add(1, Ordering::SeqCst);
            return Err(CaptureError::Read("overrun".into()));
        }
        self.inner.read_frame(frame)
    }
}

impl Drop for TrackedReader {
    fn drop(&mut self) {
        self.stats.live_readers.fetch_sub(1, Ordering::SeqCst);
    }
}
