//! Configuration module.
//!
//! Provides `WakeConfig` (top-level settings), sub-configs for each engine,
//! `AppPaths` for cross-platform directories, and TOML persistence via
//! `WakeConfig::load` / `WakeConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    AudioConfig, EngineKind, RecognitionSettings, SignalConfig, SignalTrigger, WakeConfig,
};
