//! Wake-word settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files.  Every field has a
//! serde default, so a partial `settings.toml` only overrides what it names.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::audio::CaptureSpec;
use crate::recognition::{RecognitionConfig, SpotDelay};

// ---------------------------------------------------------------------------
// EngineKind
// ---------------------------------------------------------------------------

/// Which detection engine the application runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineKind {
    /// Button-style wake signal (stdin line or key press).
    Signal,
    /// Continuous microphone capture through a recognition backend.
    Audio,
}

impl Default for EngineKind {
    fn default() -> Self {
        Self::Audio
    }
}

// ---------------------------------------------------------------------------
// SignalConfig
// ---------------------------------------------------------------------------

/// Where the signal engine takes its edges from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalTrigger {
    /// Every line on standard input.
    Stdin,
    /// A global key press (needs the `keyboard` feature).
    Key,
}

impl Default for SignalTrigger {
    fn default() -> Self {
        Self::Stdin
    }
}

/// Settings for the signal engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    pub trigger: SignalTrigger,
    /// Key name for [`SignalTrigger::Key`] (e.g. `"F9"`).
    pub key: String,
    /// Quiet time after each trigger; edges arriving meanwhile are dropped.
    pub debounce_ms: u64,
    /// Longest a single wait on the source may block.
    pub poll_interval_ms: u64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            trigger: SignalTrigger::default(),
            key: "F9".into(),
            debounce_ms: 1_000,
            poll_interval_ms: 100,
        }
    }
}

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// Settings for microphone capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Capture and recognizer sample rate in Hz.
    pub sample_rate: u32,
    pub channels: u16,
    /// Frame length fed to the recognizer, in milliseconds.
    pub frame_ms: u32,
    /// Longest a single frame read may block.
    pub read_timeout_ms: u64,
    /// Input device name; `None` means the system default.
    pub device: Option<String>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            channels: 1,
            frame_ms: 10,
            read_timeout_ms: 100,
            device: None,
        }
    }
}

impl AudioConfig {
    /// Samples per recognizer frame (160 at 16 kHz / 10 ms).
    pub fn frame_samples(&self) -> usize {
        (u64::from(self.sample_rate) * u64::from(self.frame_ms) / 1_000) as usize
            * usize::from(self.channels.max(1))
    }
}

// ---------------------------------------------------------------------------
// RecognitionSettings
// ---------------------------------------------------------------------------

/// Settings for the recognition backend and the detection loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionSettings {
    /// Acoustic model file; relative paths resolve under the models dir.
    pub model_path: Option<PathBuf>,
    /// Prebuilt search file; relative paths resolve under the models dir.
    pub search_path: Option<PathBuf>,
    /// Candidates a vendor decoder keeps; must be at least 1.
    pub n_best: usize,
    pub spot_delay: SpotDelay,
    /// Upper bound of the retry delay under sustained read/feed failures.
    pub max_backoff_ms: u64,
    /// RMS gate of the built-in energy spotter, in `[0.0, 1.0]`.
    pub energy_threshold: f32,
    /// Consecutive voiced frames the energy spotter needs.
    pub min_voiced_frames: usize,
    /// Text the energy spotter reports.
    pub phrase: String,
}

impl Default for RecognitionSettings {
    fn default() -> Self {
        Self {
            model_path: None,
            search_path: None,
            n_best: 1,
            spot_delay: SpotDelay::Asap,
            max_backoff_ms: 500,
            energy_threshold: 0.1,
            min_voiced_frames: 30,
            phrase: "ALEXA".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// WakeConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use wake_word::config::WakeConfig;
///
/// // Load (returns Default when file is missing)
/// let config = WakeConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WakeConfig {
    pub engine: EngineKind,
    pub signal: SignalConfig,
    pub audio: AudioConfig,
    pub recognition: RecognitionSettings,
    /// `env_logger` filter used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for WakeConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::default(),
            signal: SignalConfig::default(),
            audio: AudioConfig::default(),
            recognition: RecognitionSettings::default(),
            log_filter: "info".into(),
        }
    }
}

impl WakeConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(WakeConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Capture stream parameters for the audio engine.
    pub fn capture_spec(&self) -> CaptureSpec {
        CaptureSpec {
            sample_rate: self.audio.sample_rate,
            channels: self.audio.channels,
            frame_samples: self.audio.frame_samples(),
            read_timeout: Duration::from_millis(self.audio.read_timeout_ms),
            device: self.audio.device.clone(),
        }
    }

    /// Session parameters for the recognition backend, with resource paths
    /// resolved against `paths`.
    pub fn recognition_config(&self, paths: &AppPaths) -> RecognitionConfig {
        let rec = &self.recognition;
        RecognitionConfig {
            model_path: rec.model_path.as_deref().map(|p| paths.resolve_model(p)),
            search_path: rec.search_path.as_deref().map(|p| paths.resolve_model(p)),
            sample_rate: self.audio.sample_rate,
            frame_samples: self.audio.frame_samples(),
            n_best: rec.n_best,
            spot_delay: rec.spot_delay,
        }
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.recognition.max_backoff_ms)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let original = WakeConfig::default();
        original.save_to(&path).expect("save");
        let loaded = WakeConfig::load_from(&path).expect("load");

        assert_eq!(original.engine, loaded.engine);
        assert_eq!(original.signal.debounce_ms, loaded.signal.debounce_ms);
        assert_eq!(original.signal.trigger, loaded.signal.trigger);
        assert_eq!(original.audio.sample_rate, loaded.audio.sample_rate);
        assert_eq!(original.audio.frame_ms, loaded.audio.frame_ms);
        assert_eq!(original.recognition.spot_delay, loaded.recognition.spot_delay);
        assert_eq!(original.recognition.phrase, loaded.recognition.phrase);
        assert_eq!(original.log_filter, loaded.log_filter);
    }

    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = WakeConfig::load_from(&path).expect("should not error");
        assert_eq!(config.engine, EngineKind::Audio);
        assert_eq!(config.audio.sample_rate, 16_000);
    }

    #[test]
    fn default_values() {
        let cfg = WakeConfig::default();

        assert_eq!(cfg.engine, EngineKind::Audio);
        assert_eq!(cfg.signal.trigger, SignalTrigger::Stdin);
        assert_eq!(cfg.signal.debounce_ms, 1_000);
        assert_eq!(cfg.audio.sample_rate, 16_000);
        assert_eq!(cfg.audio.channels, 1);
        assert_eq!(cfg.audio.frame_samples(), 160);
        assert_eq!(cfg.recognition.n_best, 1);
        assert_eq!(cfg.recognition.spot_delay, SpotDelay::Asap);
        assert!(cfg.recognition.model_path.is_none());
        assert_eq!(cfg.log_filter, "info");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("partial.toml");
        std::fs::write(
            &path,
            "engine = \"Signal\"\n\n[signal]\ndebounce_ms = 250\n",
        )
        .unwrap();

        let cfg = WakeConfig::load_from(&path).expect("load");
        assert_eq!(cfg.engine, EngineKind::Signal);
        assert_eq!(cfg.signal.debounce_ms, 250);
        assert_eq!(cfg.signal.poll_interval_ms, 100);
        assert_eq!(cfg.audio.sample_rate, 16_000);
        assert_eq!(cfg.log_filter, "info");
    }

    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("modified.toml");

        let mut cfg = WakeConfig::default();
        cfg.engine = EngineKind::Signal;
        cfg.signal.trigger = SignalTrigger::Key;
        cfg.signal.key = "F10".into();
        cfg.audio.device = Some("USB Mic".into());
        cfg.recognition.model_path = Some("alexa.model".into());
        cfg.recognition.spot_delay = SpotDelay::Confirm { millis: 250 };

        cfg.save_to(&path).expect("save");
        let loaded = WakeConfig::load_from(&path).expect("load");

        assert_eq!(loaded.engine, EngineKind::Signal);
        assert_eq!(loaded.signal.trigger, SignalTrigger::Key);
        assert_eq!(loaded.signal.key, "F10");
        assert_eq!(loaded.audio.device.as_deref(), Some("USB Mic"));
        assert_eq!(loaded.recognition.model_path, Some(PathBuf::from("alexa.model")));
        assert_eq!(
            loaded.recognition.spot_delay,
            SpotDelay::Confirm { millis: 250 }
        );
    }

    #[test]
    fn capture_and_recognition_agree_on_frame_size() {
        let mut cfg = WakeConfig::default();
        cfg.audio.sample_rate = 8_000;
        cfg.audio.frame_ms = 20;

        let spec = cfg.capture_spec();
        let rec = cfg.recognition_config(&AppPaths::new());
        assert_eq!(spec.frame_samples, 160);
        assert_eq!(rec.frame_samples, spec.frame_samples);
        assert_eq!(rec.sample_rate, 8_000);
        assert_eq!(spec.read_timeout, Duration::from_millis(100));
    }

    #[test]
    fn recognition_paths_resolve_under_models_dir() {
        let paths = AppPaths::new();
        let mut cfg = WakeConfig::default();
        cfg.recognition.search_path = Some("alexa.search".into());

        let rec = cfg.recognition_config(&paths);
        assert_eq!(rec.search_path, Some(paths.models_dir.join("alexa.search")));
        assert!(rec.model_path.is_none());
    }
}
