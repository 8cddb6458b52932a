//! Integration tests for gain staging, analysis hand-off and now-playing.

use crate::support::{path, Rig};
use ambimix_audio::{soft_limit, AnalysisWorker};
use ambimix_core::{AmbimixError, LoudnessAnalysis, LoudnessAnalyzer, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Reports rain as loud enough to need the limiter; everything else fails.
struct FixedAnalyzer;

impl LoudnessAnalyzer for FixedAnalyzer {
    fn analyze(&self, path: &Path) -> Result<LoudnessAnalysis> {
        match path.file_stem().and_then(|s| s.to_str()) {
            Some("rain") => Ok(LoudnessAnalysis {
                lufs: -26.0,
                normalization_factor: 2.0,
                needs_limiter: true,
            }),
            _ => Err(AmbimixError::ResourceUnavailable(format!(
                "no measurement for {}",
                path.display()
            ))),
        }
    }
}

fn analyzed_rig() -> Rig {
    Rig::with_engine(|engine| {
        engine.with_analysis(AnalysisWorker::spawn(Arc::new(FixedAnalyzer)).unwrap())
    })
}

fn wait_for_rain_factor(rig: &mut Rig) {
    for _ in 0..20 {
        let factor = rig
            .session
            .catalog()
            .by_file_name("rain")
            .unwrap()
            .metadata
            .normalization_factor;
        if factor.is_some() {
            return;
        }
        rig.session.wait_for_analysis(Duration::from_secs(2));
    }
    panic!("rain was never analyzed");
}

fn assert_close(actual: Option<f32>, expected: f32) {
    let actual = actual.expect("sound has no volume");
    assert!(
        (actual - expected).abs() < 1e-5,
        "expected {expected}, got {actual}"
    );
}

// ── Gain staging ───────────────────────────────────────────────

#[test]
fn volume_follows_cubic_curve_and_master() {
    let mut rig = Rig::new();
    rig.select("rain", 0.5);
    rig.settle(Duration::from_secs(1));
    assert_close(rig.probe.volume(path("rain")), 0.125);

    rig.session.set_master_volume(0.5).unwrap();
    assert_close(rig.probe.volume(path("rain")), 0.0625);
}

#[test]
fn mixing_with_other_audio_attenuates() {
    let mut rig = Rig::new();
    rig.select("rain", 1.0);
    rig.settle(Duration::from_secs(1));

    rig.session.set_mix_with_others(true).unwrap();
    assert_close(rig.probe.volume(path("rain")), 0.75);
    rig.session.set_mix_attenuation(0.5).unwrap();
    assert_close(rig.probe.volume(path("rain")), 0.5);
}

#[test]
fn manual_adjustment_replaces_normalization() {
    let mut rig = Rig::new();
    rig.select("rain", 1.0);
    rig.settle(Duration::from_secs(1));
    let rain = rig.id("rain");

    rig.session.set_volume_adjustment(rain, 0.5).unwrap();
    assert_close(rig.probe.volume(path("rain")), 1.0);

    rig.session.set_normalize(rain, false).unwrap();
    assert_close(rig.probe.volume(path("rain")), 0.5);
}

// ── Analysis hand-off ──────────────────────────────────────────

#[test]
fn analysis_result_is_applied_and_limited() {
    let mut rig = analyzed_rig();
    rig.select("rain", 1.0);
    wait_for_rain_factor(&mut rig);
    rig.settle(Duration::from_secs(1));

    let rain = rig.session.catalog().by_file_name("rain").unwrap();
    assert_eq!(rain.metadata.loudness_lufs, Some(-26.0));
    assert!(rain.metadata.needs_limiter);
    assert_close(rig.probe.volume(path("rain")), soft_limit(2.0));

    rig.session.set_mix_with_others(true).unwrap();
    assert_close(rig.probe.volume(path("rain")), soft_limit(1.5));
}

#[test]
fn failed_analysis_leaves_unity_factor() {
    let mut rig = analyzed_rig();
    rig.select("waves", 1.0);
    while rig.session.wait_for_analysis(Duration::from_millis(500)) {}
    rig.settle(Duration::from_secs(1));

    let waves = rig.session.catalog().by_file_name("waves").unwrap();
    assert!(waves.metadata.normalization_factor.is_none());
    assert_close(rig.probe.volume(path("waves")), 1.0);
    assert!(rig.playing("waves"));
}

// ── Now playing ────────────────────────────────────────────────

#[test]
fn now_playing_follows_mode_and_selection() {
    let mut rig = Rig::new();
    rig.select("rain", 0.5);
    assert_eq!(
        rig.now_playing.last(),
        Some(("Default".to_string(), "Rain".to_string(), true))
    );

    let fire = rig.id("fireplace");
    rig.session.enter_solo(fire).unwrap();
    assert_eq!(
        rig.now_playing.last(),
        Some(("Solo".to_string(), "Fire".to_string(), true))
    );

    rig.session.pause_all();
    rig.settle(Duration::from_secs(1));
    assert_eq!(
        rig.now_playing.last(),
        Some(("Solo".to_string(), "Fire".to_string(), false))
    );
}

#[test]
fn now_playing_is_not_repeated() {
    let mut rig = Rig::new();
    rig.select("rain", 0.5);
    let count = rig.now_playing.updates.lock().len();
    rig.settle(Duration::from_secs(1));
    rig.settle(Duration::from_secs(1));
    assert_eq!(rig.now_playing.updates.lock().len(), count);
}

#[test]
fn renaming_the_active_preset_updates_the_title() {
    let mut rig = Rig::new();
    rig.select("rain", 0.5);
    let focus = rig.session.save_current_as("Focus").unwrap();
    rig.session.rename_preset(focus, "Deep Focus").unwrap();
    let (title, _, _) = rig.now_playing.last().unwrap();
    assert_eq!(title, "Deep Focus");
}
