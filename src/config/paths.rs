//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings):
//!   Windows: %APPDATA%\wake-word\
//!   macOS:   ~/Library/Application Support/wake-word/
//!   Linux:   ~/.config/wake-word/
//!
//! Data dir (recognition models and search files):
//!   Windows: %LOCALAPPDATA%\wake-word\
//!   macOS:   ~/Library/Application Support/wake-word/
//!   Linux:   ~/.local/share/wake-word/

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory holding `settings.toml`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Directory for recognition model and search files.
    pub models_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "wake-word";

    /// Resolves all paths using the `dirs` crate, falling back to the current
    /// directory when the platform has no standard location.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let models_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME)
            .join("models");

        Self {
            settings_file: config_dir.join("settings.toml"),
            config_dir,
            models_dir,
        }
    }

    /// Resolve a configured resource path: relative paths live under
    /// [`models_dir`](Self::models_dir).
    pub fn resolve_model(&self, path: &std::path::Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.models_dir.join(path)
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
