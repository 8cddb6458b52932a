//! Ambimix - Headless ambient sound mixer
//!
//! Entry point and main loop. Commands are read from stdin on a background
//! thread and executed here, between ticks, so all mixing state has a single
//! writer.

mod analyzer;
mod commands;
mod config;
mod now_playing;
mod seed;

use ambimix_audio::{AnalysisWorker, AudioEngine, SilentBackend, FADE_TICK};
use ambimix_core::SystemClock;
use ambimix_mixer::MixSession;
use ambimix_preset::JsonPresetStore;
use anyhow::Result;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::analyzer::SidecarAnalyzer;
use crate::commands::Flow;
use crate::config::AppConfig;
use crate::now_playing::LogNowPlaying;

fn main() -> Result<()> {
    // Optional config path as the first argument
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .or_else(AppConfig::default_path);
    let config = match &config_path {
        Some(path) => AppConfig::load_or_default(path)?,
        None => AppConfig::default(),
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Ambimix starting...");

    let mut engine = AudioEngine::new(Box::new(SilentBackend::new().0), config.sounds_dir())
        .with_fade_duration(config.fade_duration());
    if config.analyze_loudness {
        engine = engine.with_analysis(AnalysisWorker::spawn(Arc::new(SidecarAnalyzer))?);
    }

    let data_dir = config.data_dir();
    info!(data_dir = %data_dir.display(), "Using preset store");
    let mut session = MixSession::new(
        seed::builtin_catalog()?,
        engine,
        config.settings.clone(),
        Box::new(JsonPresetStore::new(&data_dir)),
        config.session_options(),
        Arc::new(SystemClock),
        Box::new(LogNowPlaying),
    )?;

    let lines = spawn_input_reader()?;
    run(&mut session, &lines)?;

    session.shutdown()?;
    if let Some(path) = &config_path {
        if session.settings() != &config.settings {
            let updated = AppConfig {
                settings: session.settings().clone(),
                ..config
            };
            updated.save(path)?;
            info!(path = %path.display(), "Saved settings");
        }
    }
    Ok(())
}

/// Forward stdin lines over a channel until EOF.
fn spawn_input_reader() -> Result<Receiver<String>> {
    let (tx, rx) = crossbeam_channel::unbounded();
    std::thread::Builder::new()
        .name("stdin-reader".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to read input");
                        break;
                    }
                }
            }
        })?;
    Ok(rx)
}

fn run(session: &mut MixSession, lines: &Receiver<String>) -> Result<()> {
    let stdout = std::io::stdout();
    let mut last_tick = Instant::now();

    loop {
        match lines.recv_timeout(FADE_TICK) {
            Ok(line) => {
                let mut out = stdout.lock();
                match commands::parse(&line) {
                    Ok(Some(command)) => match commands::execute(session, command, &mut out) {
                        Ok(Flow::Quit) => break,
                        Ok(Flow::Continue) => {}
                        Err(e) => writeln!(out, "error: {e}")?,
                    },
                    Ok(None) => {}
                    Err(e) => writeln!(out, "error: {e}")?,
                }
                out.flush()?;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        let now = Instant::now();
        if let Err(e) = session.tick(now - last_tick) {
            warn!(error = %e, "Preset write failed");
        }
        last_tick = now;
    }
    Ok(())
}
