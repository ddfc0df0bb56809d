//! Energy-gated phrase spotter.
//!
//! A stand-in backend for machines without a vendor keyword model: any
//! sustained burst of voice energy counts as the wake phrase.
//!
//! ## Algorithm
//!
//! Each fed frame is classified as *voiced* when its RMS amplitude (samples
//! scaled to `[-1.0, 1.0]`) exceeds the threshold.  An utterance is complete
//! after `min_voiced_frames` consecutive voiced frames, plus the frames
//! needed to cover a [`SpotDelay::Confirm`] delay.  A silent frame restarts
//! the count.  The score is the mean RMS of the voiced run, clamped to
//! `[0.0, 1.0]`.

use std::path::Path;

use super::{
    BackendError, HistoryRetention, RecogStatus, Recognition, RecognitionBackend,
    RecognitionConfig, RecognitionSession, SpotDelay,
};

/// Factory for energy-gated sessions.
///
/// # Example
///
/// ```rust
/// use wake_word::recognition::{
///     EnergySpotter, RecogStatus, RecognitionBackend, RecognitionConfig,
/// };
///
/// let spotter = EnergySpotter::new(0.1, 3, "ALEXA");
/// let mut session = spotter.create_session(&RecognitionConfig::default()).unwrap();
///
/// let loud = vec![i16::MAX / 2; 160];
/// assert_eq!(session.feed(&loud).unwrap(), RecogStatus::Listening);
/// assert_eq!(session.feed(&loud).unwrap(), RecogStatus::Listening);
/// assert_eq!(session.feed(&loud).unwrap(), RecogStatus::Done);
/// assert_eq!(session.result().unwrap().text, "ALEXA");
/// ```
#[derive(Debug, Clone)]
pub struct EnergySpotter {
    rms_threshold: f32,
    min_voiced_frames: usize,
    phrase: String,
}

impl EnergySpotter {
    /// `rms_threshold` should be in `[0.0, 1.0]`; `0.1` suits a close-talk
    /// microphone in a quiet room.
    pub fn new(rms_threshold: f32, min_voiced_frames: usize, phrase: impl Into<String>) -> Self {
        Self {
            rms_threshold,
            min_voiced_frames: min_voiced_frames.max(1),
            phrase: phrase.into(),
        }
    }

    fn check_resource(path: Option<&Path>) -> Result<(), BackendError> {
        match path {
            Some(p) if !p.exists() => Err(BackendError::ResourceMissing(p.to_path_buf())),
            _ => Ok(()),
        }
    }
}

impl RecognitionBackend for EnergySpotter {
    fn create_session(
        &self,
        config: &RecognitionConfig,
    ) -> Result<Box<dyn RecognitionSession>, BackendError> {
        Self::check_resource(config.model_path.as_deref())?;
        Self::check_resource(config.search_path.as_deref())?;

        if config.frame_samples == 0 {
            return Err(BackendError::Rejected("a frame size of 0 samples".into()));
        }
        if config.n_best == 0 {
            return Err(BackendError::Rejected("an n-best count of 0".into()));
        }
        if !(0.0..=1.0).contains(&self.rms_threshold) {
            return Err(BackendError::Rejected(format!(
                "RMS threshold {} (expected 0.0..=1.0)",
                self.rms_threshold
            )));
        }

        Ok(Box::new(EnergySession {
            rms_threshold: self.rms_threshold,
            min_voiced_frames: self.min_voiced_frames,
            phrase: self.phrase.clone(),
            sample_rate: config.sample_rate,
            frame_samples: config.frame_samples,
            confirm_frames: 0,
            voiced: 0,
            rms_sum: 0.0,
            done: false,
        }))
    }
}

struct EnergySession {
    rms_threshold: f32,
    min_voiced_frames: usize,
    phrase: String,
    sample_rate: u32,
    frame_samples: usize,
    /// Extra voiced frames required by the spot-delay policy.
    confirm_frames: usize,
    voiced: usize,
    rms_sum: f32,
    done: bool,
}

impl EnergySession {
    fn rms(frame: &[i16]) -> f32 {
        if frame.is_empty() {
            return 0.0;
        }
        let mean_sq = frame
            .iter()
            .map(|&s| {
                let x = f32::from(s) / 32_768.0;
                x * x
            })
            .sum::<f32>()
            / frame.len() as f32;
        mean_sq.sqrt()
    }
}

impl RecognitionSession for EnergySession {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn configure(&mut self, delay: SpotDelay) -> Result<(), BackendError> {
        self.confirm_frames = match delay {
            SpotDelay::Asap => 0,
            SpotDelay::Confirm { millis } => {
                let samples = u64::from(millis) * u64::from(self.sample_rate) / 1000;
                usize::try_from(samples / self.frame_samples as u64).map_err(|_| {
                    BackendError::Rejected(format!("a confirmation delay of {millis} ms"))
                })?
            }
        };
        Ok(())
    }

    fn begin(&mut self, _retention: HistoryRetention) -> Result<(), BackendError> {
        // No adaptation state, so both retention modes start clean.
        self.reset();
        Ok(())
    }

    fn feed(&mut self, frame: &[i16]) -> Result<RecogStatus, BackendError> {
        if self.done {
            return Ok(RecogStatus::Done);
        }
        if frame.is_empty() {
            return Err(BackendError::Feed("empty frame".into()));
        }

        let rms = Self::rms(frame);
        if rms > self.rms_threshold {
            self.voiced += 1;
            self.rms_sum += rms;
        } else {
            self.voiced = 0;
            self.rms_sum = 0.0;
        }

        if self.voiced >= self.min_voiced_frames + self.confirm_frames {
            self.done = true;
            Ok(RecogStatus::Done)
        } else {
            Ok(RecogStatus::Listening)
        }
    }

    fn result(&mut self) -> Result<Recognition, BackendError> {
        if !self.done {
            return Err(BackendError::Result("utterance not complete".into()));
        }
        let score = (self.rms_sum / self.voiced as f32).clamp(0.0, 1.0);
        Ok(Recognition {
            score,
            text: self.phrase.clone(),
        })
    }

    fn reset(&mut self) {
        self.voiced = 0;
        self.rms_sum = 0.0;
        self.done = false;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn session(min_voiced: usize) -> Box<dyn RecognitionSession> {
        EnergySpotter::new(0.1, min_voiced, "ALEXA")
            .create_session(&RecognitionConfig::default())
            .unwrap()
    }

    fn loud() -> Vec<i16> {
        vec![16_384; 160] // RMS 0.5
    }

    fn silent() -> Vec<i16> {
        vec![0; 160]
    }

    #[test]
    fn silence_never_completes() {
        let mut s = session(2);
        for _ in 0..100 {
            assert_eq!(s.feed(&silent()).unwrap(), RecogStatus::Listening);
        }
        assert!(matches!(s.result(), Err(BackendError::Result(_))));
    }

    #[test]
    fn silent_frame_restarts_the_run() {
        let mut s = session(3);
        s.feed(&loud()).unwrap();
        s.feed(&loud()).unwrap();
        s.feed(&silent()).unwrap();
        s.feed(&loud()).unwrap();
        assert_eq!(s.feed(&loud()).unwrap(), RecogStatus::Listening);
        assert_eq!(s.feed(&loud()).unwrap(), RecogStatus::Done);
    }

    #[test]
    fn score_is_mean_voiced_rms() {
        let mut s = session(2);
        s.feed(&loud()).unwrap();
        s.feed(&loud()).unwrap();
        let result = s.result().unwrap();
        assert!((result.score - 0.5).abs() < 1e-3, "score {}", result.score);
        assert_eq!(result.text, "ALEXA");
    }

    #[test]
    fn reset_starts_a_new_utterance() {
        let mut s = session(1);
        assert_eq!(s.feed(&loud()).unwrap(), RecogStatus::Done);
        s.reset();
        assert!(s.result().is_err());
        assert_eq!(s.feed(&silent()).unwrap(), RecogStatus::Listening);
    }

    #[test]
    fn confirm_delay_needs_extra_frames() {
        let mut s = session(1);
        // 30 ms at 16 kHz with 160-sample frames = 3 extra frames.
        s.configure(SpotDelay::Confirm { millis: 30 }).unwrap();
        for _ in 0..3 {
            assert_eq!(s.feed(&loud()).unwrap(), RecogStatus::Listening);
        }
        assert_eq!(s.feed(&loud()).unwrap(), RecogStatus::Done);
    }

    #[test]
    fn missing_model_file_is_reported() {
        let config = RecognitionConfig {
            model_path: Some("/nonexistent/wake.model".into()),
            ..RecognitionConfig::default()
        };
        let err = EnergySpotter::new(0.1, 3, "ALEXA")
            .create_session(&config)
            .err()
            .expect("must fail");
        assert!(matches!(err, BackendError::ResourceMissing(_)));
        assert!(err.to_string().contains("/nonexistent/wake.model"));
    }

    #[test]
    fn existing_resources_are_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("model.bin");
        let search = dir.path().join("search.bin");
        std::fs::write(&model, b"m").unwrap();
        std::fs::write(&search, b"s").unwrap();

        let config = RecognitionConfig {
            model_path: Some(model),
            search_path: Some(search),
            ..RecognitionConfig::default()
        };
        assert!(EnergySpotter::new(0.1, 3, "ALEXA")
            .create_session(&config)
            .is_ok());
    }

    #[test]
    fn threshold_bounds_are_inclusive() {
        let config = RecognitionConfig::default();
        assert!(EnergySpotter::new(0.0, 3, "ALEXA").create_session(&config).is_ok());
        assert!(EnergySpotter::new(1.0, 3, "ALEXA").create_session(&config).is_ok());
    }

    #[test]
    fn zero_n_best_is_rejected() {
        let config = RecognitionConfig {
            n_best: 0,
            ..RecognitionConfig::default()
        };
        let result = EnergySpotter::new(0.1, 3, "ALEXA").create_session(&config);
        assert!(matches!(result, Err(BackendError::Rejected(_))));
    }

    #[test]
    fn single_candidate_satisfies_any_n_best() {
        let config = RecognitionConfig {
            n_best: 5,
            ..RecognitionConfig::default()
        };
        let mut s = EnergySpotter::new(0.1, 1, "ALEXA").create_session(&config).unwrap();
        assert_eq!(s.feed(&[i16::MAX / 2; 160]).unwrap(), RecogStatus::Done);
        assert_eq!(s.result().unwrap().text, "ALEXA");
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let result = EnergySpotter::new(1.5, 3, "ALEXA").create_session(&RecognitionConfig::default());
        assert!(matches!(result, Err(BackendError::Rejected(_))));
    }
}
