//! Keeps the active preset in step with live sound state.
//!
//! Live changes are debounced and written back to the active preset; applying
//! a preset pushes its states onto the catalog. Guards keep the two
//! directions from feeding each other.

use ambimix_audio::AudioEngine;
use ambimix_core::{AmbimixError, GlobalSettings, PresetId, Result, SoundCatalog, SoundId};
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, info, trace};

use crate::debounce::{ChangeSource, DebounceWindows, Debouncer};
use crate::library::PresetLibrary;
use crate::preset::{Preset, PresetSoundState};
use crate::store::PresetStore;

/// Result of a write-back attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Nothing was due.
    Idle,
    /// Writes are suspended.
    Suppressed,
    NoActivePreset,
    /// The active preset already matched live state.
    Unchanged,
    Persisted { preset: PresetId, revision: u64 },
}

/// What applying a preset did to the catalog and engine.
#[derive(Debug)]
pub struct ApplyReport {
    pub preset: PresetId,
    /// Selected sounds the preset does not mention.
    pub deselected: Vec<SoundId>,
    /// Sounds whose state came from the preset.
    pub applied: Vec<SoundId>,
    /// Entries naming sounds the catalog does not have.
    pub missing: Vec<String>,
    pub started: Vec<SoundId>,
    pub failures: Vec<(SoundId, AmbimixError)>,
}

impl ApplyReport {
    fn new(preset: PresetId) -> Self {
        Self {
            preset,
            deselected: Vec::new(),
            applied: Vec::new(),
            missing: Vec::new(),
            started: Vec::new(),
            failures: Vec::new(),
        }
    }
}

/// Compute the preset that reflects live state, or `None` if nothing changed.
///
/// The default preset follows the whole catalog and its order. A custom
/// preset keeps its membership and order and only takes the live selection
/// and volume of its members.
pub fn reconcile(preset: &Preset, catalog: &SoundCatalog) -> Option<Preset> {
    let mut states: Vec<PresetSoundState> = preset
        .sound_states
        .iter()
        .filter_map(|state| catalog.by_file_name(&state.file_name))
        .map(PresetSoundState::of)
        .collect();

    let order = if preset.is_default {
        let known: HashSet<String> = states.iter().map(|s| s.file_name.clone()).collect();
        states.extend(
            catalog
                .iter()
                .filter(|s| !known.contains(s.file_name()))
                .map(PresetSoundState::of),
        );
        Some(catalog.ordered_file_names())
    } else {
        preset.sound_order.clone()
    };

    if states == preset.sound_states && order == preset.sound_order {
        return None;
    }
    let mut updated = preset.clone();
    updated.sound_states = states;
    updated.sound_order = order;
    updated.touch();
    Some(updated)
}

/// Debounced, guarded bridge between live state and the active preset.
#[derive(Debug, Default)]
pub struct PresetSynchronizer {
    windows: DebounceWindows,
    debouncer: Debouncer,
    loading: bool,
    suspended: bool,
}

impl PresetSynchronizer {
    pub fn new(windows: DebounceWindows) -> Self {
        Self {
            windows,
            ..Self::default()
        }
    }

    /// Ignore changes until `finish_initial_load`.
    pub fn begin_initial_load(&mut self) {
        self.loading = true;
        self.debouncer.cancel();
    }

    pub fn finish_initial_load(&mut self) {
        self.loading = false;
    }

    /// Suspend write-back while a temporary playback mode owns the mix.
    pub fn set_suspended(&mut self, suspended: bool) {
        if suspended != self.suspended {
            debug!(suspended, "Preset write-back");
        }
        self.suspended = suspended;
        if suspended {
            self.debouncer.cancel();
        }
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Record a live change. Returns false when a guard swallowed it.
    pub fn notify_change(&mut self, source: ChangeSource, now: Instant) -> bool {
        if self.loading || self.suspended {
            trace!(?source, "Change ignored by preset guard");
            return false;
        }
        self.debouncer.signal(now, self.windows.window(source));
        true
    }

    /// Write back if the quiet period has elapsed.
    pub fn poll(
        &mut self,
        now: Instant,
        library: &mut PresetLibrary,
        catalog: &SoundCatalog,
        store: &mut dyn PresetStore,
    ) -> Result<SyncOutcome> {
        if !self.debouncer.take_due(now) {
            return Ok(SyncOutcome::Idle);
        }
        self.write_back(library, catalog, store)
    }

    /// Write back immediately if anything is pending or unsaved.
    pub fn flush(
        &mut self,
        library: &mut PresetLibrary,
        catalog: &SoundCatalog,
        store: &mut dyn PresetStore,
    ) -> Result<SyncOutcome> {
        let pending = self.debouncer.take();
        let unsaved = library
            .active_id()
            .is_some_and(|id| library.is_unsaved(id));
        if !pending && !unsaved {
            return Ok(SyncOutcome::Idle);
        }
        self.write_back(library, catalog, store)
    }

    fn write_back(
        &mut self,
        library: &mut PresetLibrary,
        catalog: &SoundCatalog,
        store: &mut dyn PresetStore,
    ) -> Result<SyncOutcome> {
        if self.suspended || self.loading {
            return Ok(SyncOutcome::Suppressed);
        }
        let Some(active) = library.active() else {
            return Ok(SyncOutcome::NoActivePreset);
        };
        let id = active.id;

        match reconcile(active, catalog) {
            Some(updated) => {
                let revision = updated.revision;
                library.replace(updated)?;
                library.save(id, store)?;
                debug!(preset = %id, revision, "Active preset updated from live state");
                Ok(SyncOutcome::Persisted {
                    preset: id,
                    revision,
                })
            }
            None if library.is_unsaved(id) => {
                library.save(id, store)?;
                let revision = library.require(id)?.revision;
                Ok(SyncOutcome::Persisted {
                    preset: id,
                    revision,
                })
            }
            None => Ok(SyncOutcome::Unchanged),
        }
    }

    /// Push a preset onto the catalog and engine.
    ///
    /// The preset is validated first; an invalid preset changes nothing.
    /// Pending write-backs are dropped since live state now matches the
    /// preset. With `resume`, every selected sound is (re)started.
    pub fn apply(
        &mut self,
        preset: &Preset,
        catalog: &mut SoundCatalog,
        engine: &mut AudioEngine,
        settings: &GlobalSettings,
        resume: bool,
    ) -> Result<ApplyReport> {
        preset.validate()?;
        let report = apply_states(preset, catalog, engine, settings, resume);
        self.debouncer.cancel();
        info!(
            preset = %preset.id,
            name = %preset.name,
            applied = report.applied.len(),
            started = report.started.len(),
            failures = report.failures.len(),
            "Applied preset"
        );
        Ok(report)
    }
}

fn apply_states(
    preset: &Preset,
    catalog: &mut SoundCatalog,
    engine: &mut AudioEngine,
    settings: &GlobalSettings,
    resume: bool,
) -> ApplyReport {
    let mut report = ApplyReport::new(preset.id);

    for id in catalog.selected_ids() {
        let Some(sound) = catalog.get_mut(id) else {
            continue;
        };
        if !preset.contains(sound.file_name()) {
            sound.set_selected(false);
            engine.pause(id, true);
            report.deselected.push(id);
        }
    }

    for state in &preset.sound_states {
        let Some(sound) = catalog.by_file_name_mut(&state.file_name) else {
            debug!(file = %state.file_name, "Preset names an unknown sound");
            report.missing.push(state.file_name.clone());
            continue;
        };
        let id = sound.id();
        if let Err(e) = sound.set_volume(state.volume) {
            report.failures.push((id, e));
            continue;
        }
        let selected = state.is_selected && !sound.is_hidden();
        sound.set_selected(selected);
        engine.update_gain(sound, settings);
        if !selected {
            engine.pause(id, true);
        }
        report.applied.push(id);
    }

    if let Some(order) = &preset.sound_order {
        catalog.apply_order(order);
    }

    if resume {
        for id in catalog.selected_ids() {
            let Some(sound) = catalog.get(id) else {
                continue;
            };
            let was_playing = engine.is_playing(id);
            match engine.play(sound, settings, true) {
                Ok(()) if !was_playing => report.started.push(id),
                Ok(()) => {}
                Err(e) => report.failures.push((id, e)),
            }
        }
    }

    report
}
