//! Integration tests for playback modes.

use crate::support::Rig;
use ambimix_core::SoundId;
use ambimix_mixer::{ModeKind, DEFAULT_SETTLE_DELAY};
use proptest::prelude::*;
use std::time::Duration;

// ── Quick Mix ──────────────────────────────────────────────────

#[test]
fn quick_mix_round_trip_restores_exactly() {
    let mut rig = Rig::new();
    rig.select("rain", 0.5);
    rig.set_volume("waves", 0.2);
    rig.select("fireplace", 0.9);
    let before = rig.snapshot();

    rig.session.enter_quick_mix(&[]);
    assert_eq!(rig.session.mode_kind(), ModeKind::QuickMix);
    for name in ["rain", "waves", "fireplace", "wind", "white-noise"] {
        assert!(!rig.is_selected(name), "{name} still selected");
        assert!(!rig.playing(name), "{name} still playing");
    }
    for name in ["rain", "waves", "fireplace", "wind"] {
        assert_eq!(rig.volume(name), 0.8, "{name} not at quick mix volume");
    }
    assert_eq!(rig.volume("white-noise"), 1.0);

    rig.session.exit_quick_mix();
    assert_eq!(rig.session.mode_kind(), ModeKind::Normal);
    assert_eq!(rig.snapshot(), before);
    assert!(rig.playing("rain"));
    assert!(rig.playing("fireplace"));
    assert!(!rig.playing("waves"));
}

#[test]
fn quick_mix_starts_only_whitelisted_initial_sounds() {
    let mut rig = Rig::new();
    let (rain, noise) = (rig.id("rain"), rig.id("white-noise"));
    let report = rig.session.enter_quick_mix(&[rain, noise]);
    assert_eq!(report.started, vec![rain]);
    assert!(rig.playing("rain"));
    assert!(!rig.is_selected("white-noise"));
    assert!(rig.session.global_playing());
}

#[test]
fn quick_mix_toggle_on_custom_sound_is_noop() {
    let mut rig = Rig::new();
    let custom = rig
        .session
        .import_sound("My Rain", "my-rain", "/home/u/my-rain.mp3")
        .unwrap();
    rig.session.enter_quick_mix(&[custom]);
    assert_eq!(rig.session.toggle_quick_mix_sound(custom).unwrap(), None);
    assert!(!rig.is_selected("my-rain"));
    assert!(!rig.probe.is_playing("/home/u/my-rain.mp3"));
}

#[test]
fn quick_mix_toggle_outside_whitelist_is_noop() {
    let mut rig = Rig::new();
    let noise = rig.id("white-noise");
    rig.session.enter_quick_mix(&[]);
    assert_eq!(rig.session.toggle_quick_mix_sound(noise).unwrap(), None);
    assert!(!rig.is_selected("white-noise"));
}

#[test]
fn sound_hidden_during_quick_mix_stays_silent() {
    let mut rig = Rig::new();
    rig.select("fireplace", 0.9);
    let fire = rig.id("fireplace");

    rig.session.enter_quick_mix(&[]);
    rig.session.set_hidden(fire, true).unwrap();
    assert_eq!(rig.session.toggle_quick_mix_sound(fire).unwrap(), None);
    rig.session.exit_quick_mix();
    assert!(!rig.is_selected("fireplace"));
    assert!(!rig.playing("fireplace"));

    rig.select("rain", 0.5);
    rig.session.pause_all();
    rig.settle(Duration::from_secs(2));
    assert!(rig.probe.playing().is_empty());
    assert!(!rig.session.is_audible());
}

#[test]
fn vehicle_quick_mix_keeps_volumes_and_preset() {
    let mut rig = Rig::new();
    rig.set_volume("white-noise", 0.3);
    let (noise, fire) = (rig.id("white-noise"), rig.id("fireplace"));
    let active = rig.session.library().active_id();

    rig.session.enter_vehicle_quick_mix(&[noise, fire]);
    assert_eq!(rig.session.mode_kind(), ModeKind::VehicleQuickMix);
    assert!(rig.playing("white-noise"));
    assert!(!rig.playing("fireplace"));
    assert_eq!(rig.volume("white-noise"), 0.3);
    assert_eq!(rig.volume("rain"), 1.0);
    assert_eq!(rig.session.library().active_id(), active);

    rig.session.exit_vehicle_quick_mix();
    assert!(!rig.is_selected("white-noise"));
}

// ── Solo ───────────────────────────────────────────────────────

#[test]
fn solo_pauses_others_and_restores_both() {
    let mut rig = Rig::new();
    rig.select("fireplace", 0.9);
    rig.set_volume("rain", 0.4);
    let before = rig.snapshot();
    let rain = rig.id("rain");

    rig.session.enter_solo(rain).unwrap();
    assert!(!rig.playing("fireplace"));
    assert!(rig.is_selected("fireplace"));
    assert!(rig.playing("rain"));
    assert!(rig.is_selected("rain"));
    assert_eq!(rig.volume("rain"), 1.0);
    assert_eq!(rig.clock.sleeps(), vec![DEFAULT_SETTLE_DELAY]);

    rig.session.exit_solo();
    assert_eq!(rig.snapshot(), before);
    assert!(rig.playing("fireplace"));
    assert!(!rig.playing("rain"));
}

#[test]
fn solo_with_missing_file_still_enters_mode() {
    let mut rig = Rig::new();
    rig.probe.mark_missing(crate::support::path("rain"));
    let rain = rig.id("rain");
    let report = rig.session.enter_solo(rain).unwrap();
    assert_eq!(rig.session.mode_kind(), ModeKind::Solo);
    assert_eq!(report.failures.len(), 1);
    assert!(!rig.session.is_audible());
}

#[test]
fn solo_refuses_hidden_sound() {
    let mut rig = Rig::new();
    rig.select("fireplace", 0.9);
    let rain = rig.id("rain");
    rig.session.set_hidden(rain, true).unwrap();

    assert!(rig.session.enter_solo(rain).is_err());
    assert_eq!(rig.session.mode_kind(), ModeKind::Normal);
    assert!(!rig.is_selected("rain"));
    assert!(rig.playing("fireplace"));
}

#[test]
fn exiting_inactive_modes_is_noop() {
    let mut rig = Rig::new();
    rig.select("rain", 0.5);
    let before = rig.snapshot();
    assert!(rig.session.exit_solo().is_noop());
    assert!(rig.session.exit_quick_mix().is_noop());
    assert!(rig.session.exit_vehicle_quick_mix().is_noop());
    assert!(rig.session.exit_mode().is_noop());
    assert_eq!(rig.snapshot(), before);
    assert!(rig.playing("rain"));
}

// ── Invariants ─────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Op {
    EnterSolo(usize),
    ExitSolo,
    EnterQuickMix(Vec<usize>),
    ExitQuickMix,
    EnterVehicle(Vec<usize>),
    ExitVehicle,
    Toggle(usize),
    ExitMode,
}

const NAMES: [&str; 5] = ["rain", "waves", "fireplace", "wind", "white-noise"];

fn op() -> impl Strategy<Value = Op> {
    let index = 0..NAMES.len();
    prop_oneof![
        index.clone().prop_map(Op::EnterSolo),
        Just(Op::ExitSolo),
        prop::collection::vec(index.clone(), 0..3).prop_map(Op::EnterQuickMix),
        Just(Op::ExitQuickMix),
        prop::collection::vec(index.clone(), 0..3).prop_map(Op::EnterVehicle),
        Just(Op::ExitVehicle),
        index.prop_map(Op::Toggle),
        Just(Op::ExitMode),
    ]
}

fn ids(rig: &Rig, list: &[usize]) -> Vec<SoundId> {
    list.iter().map(|&i| rig.id(NAMES[i])).collect()
}

fn apply(rig: &mut Rig, op: &Op) {
    match op {
        Op::EnterSolo(i) => {
            let id = rig.id(NAMES[*i]);
            rig.session.enter_solo(id).unwrap();
        }
        Op::ExitSolo => {
            rig.session.exit_solo();
        }
        Op::EnterQuickMix(list) => {
            let initial = ids(rig, list);
            rig.session.enter_quick_mix(&initial);
        }
        Op::ExitQuickMix => {
            rig.session.exit_quick_mix();
        }
        Op::EnterVehicle(list) => {
            let initial = ids(rig, list);
            rig.session.enter_vehicle_quick_mix(&initial);
        }
        Op::ExitVehicle => {
            rig.session.exit_vehicle_quick_mix();
        }
        Op::Toggle(i) => {
            let id = rig.id(NAMES[*i]);
            rig.session.toggle_quick_mix_sound(id).unwrap();
        }
        Op::ExitMode => {
            rig.session.exit_mode();
        }
    }
}

fn check_audible_state(rig: &Rig) -> Result<(), TestCaseError> {
    match rig.session.mode_kind() {
        ModeKind::Solo => {
            let solo = rig.session.mode().solo_sound();
            for name in NAMES {
                let expected = solo == Some(rig.id(name));
                prop_assert_eq!(rig.playing(name), expected, "{} in solo", name);
            }
            prop_assert!(rig.session.library().active_id().is_some());
        }
        ModeKind::QuickMix => {
            for name in NAMES {
                prop_assert_eq!(rig.playing(name), rig.is_selected(name), "{} in quick mix", name);
            }
            prop_assert!(rig.session.library().active_id().is_none());
        }
        ModeKind::Normal | ModeKind::VehicleQuickMix => {
            for name in NAMES {
                prop_assert_eq!(rig.playing(name), rig.is_selected(name), "{}", name);
            }
            prop_assert!(rig.session.library().active_id().is_some());
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn any_transition_sequence_keeps_state_consistent(ops in prop::collection::vec(op(), 1..12)) {
        let mut rig = Rig::new();
        rig.select("rain", 0.5);
        rig.set_volume("waves", 0.2);
        rig.select("fireplace", 0.9);
        let before = rig.snapshot();

        for op in &ops {
            apply(&mut rig, op);
            rig.settle(Duration::from_secs(1));
            check_audible_state(&rig)?;
        }

        rig.session.exit_mode();
        rig.settle(Duration::from_secs(1));
        prop_assert_eq!(rig.session.mode_kind(), ModeKind::Normal);
        prop_assert_eq!(rig.snapshot(), before);
        check_audible_state(&rig)?;
    }
}
