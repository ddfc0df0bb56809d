//! Command-line wake-word listener.
//!
//! # Startup sequence
//!
//! 1. Load [`WakeConfig`] from the path given as the first argument, or from
//!    the platform config dir (defaults on first run).
//! 2. Initialise logging with the configured filter (`RUST_LOG` wins).
//! 3. Build the configured engine; it starts listening immediately.
//! 4. Print one line per detection until interrupted.

use std::path::PathBuf;
use std::sync::{mpsc, Arc};

use anyhow::Context;
use wake_word::{build_engine, WakeConfig};

fn main() -> anyhow::Result<()> {
    // 1. Configuration
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let loaded = match &config_path {
        Some(path) => WakeConfig::load_from(path),
        None => WakeConfig::load(),
    };
    let (config, load_error) = match loaded {
        Ok(config) => (config, None),
        Err(e) => (WakeConfig::default(), Some(e)),
    };

    // 2. Logging
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.log_filter.as_str()),
    )
    .init();
    log::info!("wake-word starting up ({:?} engine)", config.engine);
    if let Some(e) = load_error {
        log::warn!("Failed to load config ({e:#}); using defaults");
    }

    // 3. Engine
    let (tx, rx) = mpsc::channel::<()>();
    let listener = Arc::new(move || {
        let _ = tx.send(());
    });
    let engine = build_engine(&config, listener).context("failed to build wake-word engine")?;
    log::info!("engine state: {}", engine.state().label());

    // 4. Report detections.  The only sender lives in the engine's listener,
    // so this runs until the process is interrupted.
    let mut detections = 0u64;
    for () in rx.iter() {
        detections += 1;
        println!("wake word detected (#{detections})");
    }
    Ok(())
}
