//! Capturing and restoring per-sound selection and volume.

use ambimix_audio::AudioEngine;
use ambimix_core::{AmbimixError, GlobalSettings, Sound, SoundCatalog, SoundId};
use tracing::debug;

/// Selection and volume of one sound at capture time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoundSnapshot {
    pub sound: SoundId,
    pub is_selected: bool,
    pub volume: f32,
}

impl SoundSnapshot {
    pub fn of(sound: &Sound) -> Self {
        Self {
            sound: sound.id(),
            is_selected: sound.is_selected(),
            volume: sound.volume(),
        }
    }
}

/// Read the state of every given sound.
pub fn capture<'a>(sounds: impl IntoIterator<Item = &'a Sound>) -> Vec<SoundSnapshot> {
    sounds.into_iter().map(SoundSnapshot::of).collect()
}

#[derive(Debug, Default)]
pub struct RestoreReport {
    pub restored: Vec<SoundId>,
    /// Snapshots whose sound no longer exists.
    pub skipped: Vec<SoundId>,
    pub started: Vec<SoundId>,
    pub failures: Vec<(SoundId, AmbimixError)>,
}

/// Write snapshots back, consuming them.
///
/// With `resume`, every restored sound that is selected is started. Sounds
/// hidden since the capture stay deselected. Restoring the same states twice
/// leaves the catalog unchanged.
pub fn restore(
    snapshots: Vec<SoundSnapshot>,
    catalog: &mut SoundCatalog,
    engine: &mut AudioEngine,
    settings: &GlobalSettings,
    resume: bool,
) -> RestoreReport {
    let mut report = RestoreReport::default();

    for snapshot in snapshots {
        let Some(sound) = catalog.get_mut(snapshot.sound) else {
            debug!(sound = %snapshot.sound, "Skipping snapshot of removed sound");
            report.skipped.push(snapshot.sound);
            continue;
        };
        if let Err(e) = sound.set_volume(snapshot.volume) {
            report.failures.push((snapshot.sound, e));
            continue;
        }
        let selected = snapshot.is_selected && !sound.is_hidden();
        sound.set_selected(selected);
        engine.update_gain(sound, settings);
        report.restored.push(snapshot.sound);

        if resume && selected {
            let was_playing = engine.is_playing(snapshot.sound);
            match engine.play(sound, settings, true) {
                Ok(()) if !was_playing => report.started.push(snapshot.sound),
                Ok(()) => {}
                Err(e) => report.failures.push((snapshot.sound, e)),
            }
        }
    }

    report
}
