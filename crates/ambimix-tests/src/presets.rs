//! Integration tests for preset synchronization and persistence.

use crate::support::{self, Rig, SOUNDS_DIR};
use ambimix_audio::{AudioEngine, SilentBackend, SilentProbe};
use ambimix_core::{AmbimixError, GlobalSettings, ManualClock, NoNowPlaying};
use ambimix_mixer::{MixSession, SessionOptions};
use ambimix_preset::{JsonPresetStore, MemoryPresetStore, Preset, PresetSoundState, PresetStore};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

fn json_session(data_dir: &Path) -> (MixSession, SilentProbe) {
    let (backend, probe) = SilentBackend::new();
    let session = MixSession::new(
        support::catalog(),
        AudioEngine::new(Box::new(backend), SOUNDS_DIR),
        GlobalSettings::default(),
        Box::new(JsonPresetStore::new(data_dir)),
        SessionOptions::default(),
        Arc::new(ManualClock::new()),
        Box::new(NoNowPlaying),
    )
    .unwrap();
    (session, probe)
}

// ── Scoped write-back ──────────────────────────────────────────

#[test]
fn custom_preset_never_gains_new_sounds() {
    let mut rig = Rig::new();
    rig.select("rain", 0.5);
    rig.select("waves", 0.3);
    let focus = rig.session.save_current_as("Focus").unwrap();

    rig.select("fireplace", 0.9);
    rig.set_volume("rain", 0.7);
    rig.settle(Duration::from_secs(2));
    rig.session.flush().unwrap();

    let stored = rig.store.get(focus).unwrap();
    assert_eq!(stored.sound_states.len(), 2);
    assert!(!stored.contains("fireplace"));
    assert_eq!(stored.state("rain").unwrap().volume, 0.7);
    assert_eq!(stored.state("waves").unwrap().volume, 0.3);
}

#[test]
fn default_preset_tracks_every_sound() {
    let mut rig = Rig::new();
    rig.select("fireplace", 0.6);
    rig.settle(Duration::from_secs(1));

    let default_id = rig.session.library().default_id();
    let stored = rig.store.get(default_id).unwrap();
    assert_eq!(stored.sound_states.len(), 5);
    let fire = stored.state("fireplace").unwrap();
    assert!(fire.is_selected);
    assert_eq!(fire.volume, 0.6);
}

#[test]
fn volume_burst_produces_one_write() {
    let mut rig = Rig::new();
    rig.select("rain", 0.2);
    rig.settle(Duration::from_secs(2));
    let writes = rig.store.save_count();

    for step in 0..20 {
        rig.set_volume("rain", 0.3 + step as f32 * 0.01);
        rig.settle(Duration::from_millis(50));
    }
    assert_eq!(rig.store.save_count(), writes);
    assert!(rig.session.sync_pending());

    rig.settle(Duration::from_secs(1));
    assert_eq!(rig.store.save_count(), writes + 1);
    let stored = rig.store.get(rig.session.library().default_id()).unwrap();
    assert_eq!(stored.state("rain").unwrap().volume, rig.volume("rain"));
}

#[test]
fn modes_do_not_write_back() {
    let mut rig = Rig::new();
    rig.select("rain", 0.5);
    rig.settle(Duration::from_secs(1));
    let writes = rig.store.save_count();

    rig.session.enter_quick_mix(&[]);
    let waves = rig.id("waves");
    rig.session.toggle_quick_mix_sound(waves).unwrap();
    rig.settle(Duration::from_secs(2));
    rig.session.exit_quick_mix();
    rig.settle(Duration::from_secs(2));

    assert_eq!(rig.store.save_count(), writes);
    let stored = rig.store.get(rig.session.library().default_id()).unwrap();
    assert!(!stored.state("waves").unwrap().is_selected);
}

// ── Applying presets ───────────────────────────────────────────

#[test]
fn switching_presets_deselects_unlisted_sounds() {
    let mut rig = Rig::new();
    rig.select("rain", 0.5);
    rig.select("waves", 0.3);
    let focus = rig.session.save_current_as("Focus").unwrap();

    let default_id = rig.session.library().default_id();
    rig.session.activate_preset(default_id).unwrap();
    rig.select("fireplace", 0.9);
    assert!(rig.playing("fireplace"));

    let report = rig.session.activate_preset(focus).unwrap();
    assert_eq!(report.deselected, vec![rig.id("fireplace")]);
    assert!(!rig.is_selected("fireplace"));
    assert!(!rig.playing("fireplace"));
    assert!(rig.playing("rain"));
    assert!(rig.playing("waves"));

    // The switch flushed the default preset first.
    let stored = rig.store.get(default_id).unwrap();
    assert!(stored.state("fireplace").unwrap().is_selected);
}

#[test]
fn invalid_preset_is_rejected_before_any_change() {
    let store = MemoryPresetStore::new();
    let mut broken = Preset::with_sounds("Broken", &support::catalog(), &["rain"]).unwrap();
    broken.sound_states.push(PresetSoundState {
        file_name: "rain".into(),
        is_selected: true,
        volume: 0.5,
    });
    let broken_id = broken.id;
    store.insert(broken);

    let mut rig = Rig::with_store(store);
    rig.select("waves", 0.4);
    let before = rig.snapshot();
    let active = rig.session.library().active_id();

    let err = rig.session.activate_preset(broken_id).unwrap_err();
    assert!(matches!(err, AmbimixError::InvalidPreset(_)));
    assert_eq!(rig.snapshot(), before);
    assert_eq!(rig.session.library().active_id(), active);
    assert!(rig.playing("waves"));
}

#[test]
fn saving_during_a_mode_is_refused() {
    let mut rig = Rig::new();
    let rain = rig.id("rain");
    rig.session.enter_solo(rain).unwrap();
    assert!(rig.session.save_current_as("Nope").is_err());
    assert!(rig.session.library().find_by_name("nope").is_none());
}

// ── Delete and scrub ───────────────────────────────────────────

#[test]
fn preset_deleted_during_quick_mix_leaves_default_mix() {
    let mut rig = Rig::new();
    rig.select("waves", 1.0);
    let beach = rig.session.save_current_as("Beach").unwrap();
    rig.set_volume("waves", 0.3);

    rig.session.enter_quick_mix(&[]);
    rig.session.delete_preset(beach).unwrap();
    rig.session.exit_quick_mix();

    let default_id = rig.session.library().default_id();
    assert_eq!(rig.session.library().active_id(), Some(default_id));
    assert_eq!(rig.volume("waves"), 1.0);
    assert!(rig.playing("waves"));

    rig.set_volume("rain", 0.5);
    rig.settle(Duration::from_secs(2));
    let stored = rig.store.get(default_id).unwrap();
    assert_eq!(stored.state("waves").unwrap().volume, 1.0);
    assert_eq!(stored.state("rain").unwrap().volume, 0.5);
}

#[test]
fn default_preset_cannot_be_deleted() {
    let mut rig = Rig::new();
    let default_id = rig.session.library().default_id();
    assert!(rig.session.delete_preset(default_id).is_err());
    assert!(rig.store.get(default_id).is_some());
}

#[test]
fn removing_a_custom_sound_scrubs_every_preset() {
    let mut rig = Rig::new();
    let custom = rig
        .session
        .import_sound("My Rain", "my-rain", "/home/u/my-rain.mp3")
        .unwrap();
    rig.session.set_selected(custom, true).unwrap();
    rig.select("rain", 0.5);
    let mine = rig.session.save_current_as("Mine").unwrap();
    rig.settle(Duration::from_secs(1));
    assert!(rig.store.get(mine).unwrap().contains("my-rain"));

    rig.session.remove_sound(custom).unwrap();
    rig.settle(Duration::from_secs(1));

    assert!(rig.session.catalog().by_file_name("my-rain").is_none());
    assert!(!rig.probe.is_playing("/home/u/my-rain.mp3"));
    for preset in rig.store.load_presets().unwrap() {
        assert!(!preset.contains("my-rain"), "{} still lists it", preset.name);
    }
    assert!(rig.store.get(mine).unwrap().contains("rain"));
}

#[test]
fn built_in_sounds_cannot_be_removed() {
    let mut rig = Rig::new();
    let rain = rig.id("rain");
    assert!(matches!(
        rig.session.remove_sound(rain),
        Err(AmbimixError::Validation(_))
    ));
}

// ── Persistence ────────────────────────────────────────────────

#[test]
fn presets_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();

    {
        let (mut session, _probe) = json_session(dir.path());
        let rain = session.find_sound("rain").unwrap();
        session.set_volume(rain, 0.4).unwrap();
        session.set_selected(rain, true).unwrap();
        session.save_current_as("Evening").unwrap();
        session.set_volume(rain, 0.6).unwrap();
        session.shutdown().unwrap();
    }

    let (session, probe) = json_session(dir.path());
    assert_eq!(session.library().len(), 2);
    assert_eq!(session.library().active().unwrap().name, "Evening");
    assert!(session.library().find_by_name("evening").is_some());

    let rain = session.catalog().by_file_name("rain").unwrap();
    assert!(rain.is_selected());
    assert_eq!(rain.volume(), 0.6);
    assert!(!session.global_playing());
    assert!(!probe.is_playing(support::path("rain")));
}

#[test]
fn deleting_the_active_preset_falls_back_to_default() {
    let dir = tempfile::tempdir().unwrap();
    let (mut session, _probe) = json_session(dir.path());
    let waves = session.find_sound("waves").unwrap();
    session.set_selected(waves, true).unwrap();
    let beach = session.save_current_as("Beach").unwrap();

    session.delete_preset(beach).unwrap();
    let default_id = session.library().default_id();
    assert_eq!(session.library().active_id(), Some(default_id));

    drop(session);
    let (session, _probe) = json_session(dir.path());
    assert_eq!(session.library().len(), 1);
    assert_eq!(session.library().active_id(), Some(default_id));
}
