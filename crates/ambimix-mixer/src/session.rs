//! The mixing session: one serialized owner for catalog, engine, modes and
//! presets.
//!
//! Every user-facing operation goes through an explicit setter here, which
//! validates, performs the side effects, and tells the synchronizer what
//! changed.

use ambimix_audio::{AnalysisReport, AudioEngine};
use ambimix_core::{
    AmbimixError, Clock, GlobalSettings, NowPlaying, PresetId, Result, SoundCatalog, SoundId,
};
use ambimix_preset::{
    ApplyReport, ChangeSource, DebounceWindows, Preset, PresetLibrary, PresetStore,
    PresetSynchronizer, SyncOutcome,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::controller::{MixContext, ModeController, TransitionReport, DEFAULT_SETTLE_DELAY};
use crate::mode::{ModeKind, PlaybackMode};
use crate::quick_mix::QuickMixConfig;

/// Title shown when no preset is active.
pub const FALLBACK_TITLE: &str = "Ambimix";

/// Tunables for a session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub quick_mix: QuickMixConfig,
    pub settle_delay: Duration,
    pub debounce: DebounceWindows,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            quick_mix: QuickMixConfig::default(),
            settle_delay: DEFAULT_SETTLE_DELAY,
            debounce: DebounceWindows::default(),
        }
    }
}

/// Last state pushed to the now-playing surface.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub title: String,
    pub subtitle: String,
    pub is_playing: bool,
}

pub type PlaybackFailures = Vec<(SoundId, AmbimixError)>;

pub struct MixSession {
    catalog: SoundCatalog,
    engine: AudioEngine,
    settings: GlobalSettings,
    controller: ModeController,
    library: PresetLibrary,
    sync: PresetSynchronizer,
    store: Box<dyn PresetStore>,
    now_playing: Box<dyn NowPlaying>,
    clock: Arc<dyn Clock>,
    global_playing: bool,
    last_notice: Option<Notice>,
    /// The active preset changed underneath a mode and must be applied on
    /// the way back to Normal.
    reapply_active: bool,
}

impl MixSession {
    /// Load presets and apply the active one without starting playback.
    pub fn new(
        catalog: SoundCatalog,
        engine: AudioEngine,
        settings: GlobalSettings,
        mut store: Box<dyn PresetStore>,
        options: SessionOptions,
        clock: Arc<dyn Clock>,
        now_playing: Box<dyn NowPlaying>,
    ) -> Result<Self> {
        settings.validate()?;
        options.quick_mix.validate()?;
        let library = PresetLibrary::load(store.as_mut(), &catalog)?;

        let mut session = Self {
            catalog,
            engine,
            settings,
            controller: ModeController::new(options.quick_mix, Arc::clone(&clock))
                .with_settle_delay(options.settle_delay),
            library,
            sync: PresetSynchronizer::new(options.debounce),
            store,
            now_playing,
            clock,
            global_playing: false,
            last_notice: None,
            reapply_active: false,
        };

        session.sync.begin_initial_load();
        if let Some(preset) = session.library.active().cloned() {
            match session.sync.apply(
                &preset,
                &mut session.catalog,
                &mut session.engine,
                &session.settings,
                false,
            ) {
                Ok(report) if !report.missing.is_empty() => {
                    debug!(missing = ?report.missing, "Active preset names unknown sounds");
                }
                Ok(_) => {}
                Err(e) => warn!(preset = %preset.id, error = %e, "Active preset could not be applied"),
            }
        }
        session.sync.finish_initial_load();
        session.refresh_now_playing();
        info!(
            sounds = session.catalog.len(),
            presets = session.library.len(),
            "Session ready"
        );
        Ok(session)
    }

    // ── Accessors ──────────────────────────────────────────────

    pub fn catalog(&self) -> &SoundCatalog {
        &self.catalog
    }

    pub fn engine(&self) -> &AudioEngine {
        &self.engine
    }

    pub fn settings(&self) -> &GlobalSettings {
        &self.settings
    }

    pub fn library(&self) -> &PresetLibrary {
        &self.library
    }

    pub fn mode(&self) -> &PlaybackMode {
        self.controller.mode()
    }

    pub fn mode_kind(&self) -> ModeKind {
        self.controller.kind()
    }

    pub fn global_playing(&self) -> bool {
        self.global_playing
    }

    /// Some selected sound is actually playing.
    pub fn is_audible(&self) -> bool {
        self.controller.is_audible(&self.catalog, &self.engine)
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.last_notice.as_ref()
    }

    pub fn sync_pending(&self) -> bool {
        self.sync.is_pending()
    }

    /// Resolve a sound by file name, falling back to a case-insensitive title match.
    pub fn find_sound(&self, name: &str) -> Option<SoundId> {
        self.catalog
            .by_file_name(name)
            .or_else(|| {
                self.catalog
                    .iter()
                    .find(|s| s.title().eq_ignore_ascii_case(name))
            })
            .map(|s| s.id())
    }

    fn split(&mut self) -> (&mut ModeController, MixContext<'_>) {
        (
            &mut self.controller,
            MixContext {
                catalog: &mut self.catalog,
                engine: &mut self.engine,
                settings: &self.settings,
                global_playing: self.global_playing,
            },
        )
    }

    fn notify(&mut self, source: ChangeSource) {
        self.sync.notify_change(source, self.clock.now());
    }

    // ── Sound state ────────────────────────────────────────────

    /// Select or deselect a sound.
    ///
    /// Inside Quick Mix this is a whitelist toggle; during Solo selection is
    /// locked. Selecting while paused starts global playback when
    /// `auto_play_on_select` is on.
    pub fn set_selected(&mut self, id: SoundId, selected: bool) -> Result<()> {
        match self.controller.kind() {
            ModeKind::Normal => {}
            ModeKind::Solo => {
                return Err(AmbimixError::Validation(
                    "selection is locked while solo is active".into(),
                ))
            }
            ModeKind::QuickMix | ModeKind::VehicleQuickMix => {
                if self.catalog.require(id)?.is_selected() != selected {
                    self.toggle_quick_mix_sound(id)?;
                }
                return Ok(());
            }
        }

        let sound = self.catalog.require_mut(id)?;
        if selected && sound.is_hidden() {
            return Err(AmbimixError::Validation(format!(
                "'{}' is hidden",
                sound.file_name()
            )));
        }
        if !sound.set_selected(selected) {
            return Ok(());
        }

        let result = if !selected {
            self.engine.pause(id, false);
            Ok(())
        } else if self.global_playing {
            self.engine.play(sound, &self.settings, true)
        } else if self.settings.auto_play_on_select {
            info!(sound = %id, "Selection started playback");
            self.global_playing = true;
            self.start_playable()
                .into_iter()
                .find(|(failed, _)| *failed == id)
                .map_or(Ok(()), |(_, e)| Err(e))
        } else {
            Ok(())
        };

        self.notify(ChangeSource::Selection);
        self.refresh_now_playing();
        result
    }

    pub fn set_volume(&mut self, id: SoundId, volume: f32) -> Result<()> {
        let sound = self.catalog.require_mut(id)?;
        if !sound.set_volume(volume)? {
            return Ok(());
        }
        self.engine.update_gain(sound, &self.settings);
        self.notify(ChangeSource::Volume);
        Ok(())
    }

    pub fn set_normalize(&mut self, id: SoundId, normalize: bool) -> Result<()> {
        let sound = self.catalog.require_mut(id)?;
        if sound.set_normalize(normalize) {
            self.engine.update_gain(sound, &self.settings);
        }
        Ok(())
    }

    pub fn set_volume_adjustment(&mut self, id: SoundId, adjustment: f32) -> Result<()> {
        let sound = self.catalog.require_mut(id)?;
        if sound.set_volume_adjustment(adjustment)? {
            self.engine.update_gain(sound, &self.settings);
        }
        Ok(())
    }

    // ── Global settings ────────────────────────────────────────

    /// Replace the global settings and recompute every loaded sound's gain.
    pub fn update_settings(&mut self, settings: GlobalSettings) -> Result<()> {
        settings.validate()?;
        self.settings = settings;
        for sound in self.catalog.iter() {
            if self.engine.is_loaded(sound.id()) {
                self.engine.update_gain(sound, &self.settings);
            }
        }
        Ok(())
    }

    pub fn set_master_volume(&mut self, volume: f32) -> Result<()> {
        let mut settings = self.settings.clone();
        settings.master_volume = volume;
        self.update_settings(settings)
    }

    pub fn set_mix_with_others(&mut self, enabled: bool) -> Result<()> {
        let mut settings = self.settings.clone();
        settings.mix_with_others = enabled;
        self.update_settings(settings)
    }

    pub fn set_mix_attenuation(&mut self, attenuation: f32) -> Result<()> {
        let mut settings = self.settings.clone();
        settings.mix_attenuation = attenuation;
        self.update_settings(settings)
    }

    pub fn set_auto_play_on_select(&mut self, enabled: bool) -> Result<()> {
        let mut settings = self.settings.clone();
        settings.auto_play_on_select = enabled;
        self.update_settings(settings)
    }

    // ── Transport ──────────────────────────────────────────────

    pub fn play_all(&mut self) -> PlaybackFailures {
        self.global_playing = true;
        let failures = self.start_playable();
        self.refresh_now_playing();
        failures
    }

    /// Fade out everything playable; players pause when their fades finish.
    pub fn pause_all(&mut self) {
        self.global_playing = false;
        for id in self.controller.playable(&self.catalog) {
            self.engine.pause(id, false);
        }
        self.refresh_now_playing();
    }

    pub fn toggle_playback(&mut self) -> PlaybackFailures {
        if self.global_playing {
            self.pause_all();
            Vec::new()
        } else {
            self.play_all()
        }
    }

    fn start_playable(&mut self) -> PlaybackFailures {
        let mut failures = Vec::new();
        for id in self.controller.playable(&self.catalog) {
            let Some(sound) = self.catalog.get(id) else {
                continue;
            };
            if let Err(e) = self.engine.play(sound, &self.settings, true) {
                warn!(sound = %id, error = %e, "Sound failed to start");
                failures.push((id, e));
            }
        }
        failures
    }

    // ── Modes ──────────────────────────────────────────────────

    /// Pending edits belong to the preset that was active before the mode.
    fn before_mode_entry(&mut self) {
        if self.controller.mode().is_normal() {
            self.flush_logged();
        }
    }

    fn after_transition(&mut self, report: &TransitionReport) {
        if report.from == ModeKind::QuickMix && report.to != ModeKind::QuickMix {
            let remembered = report.restored_preset;
            if remembered.is_some_and(|id| self.library.get(id).is_none()) {
                info!("Preset deleted during quick mix, falling back to default");
                self.reapply_active = true;
            }
            self.library.restore_active(remembered);
        }
        self.sync.set_suspended(!self.controller.mode().is_normal());
        if self.reapply_active && self.controller.mode().is_normal() {
            self.reapply_active = false;
            self.apply_active_logged();
        }
        for (id, e) in &report.failures {
            warn!(sound = %id, error = %e, "Sound failed during mode change");
        }
        self.refresh_now_playing();
    }

    pub fn enter_solo(&mut self, id: SoundId) -> Result<TransitionReport> {
        self.before_mode_entry();
        let (controller, mut ctx) = self.split();
        let report = controller.enter_solo(&mut ctx, id);
        if let Ok(report) = &report {
            self.global_playing = true;
            self.after_transition(report);
        } else {
            self.sync.set_suspended(!self.controller.mode().is_normal());
        }
        report
    }

    pub fn exit_solo(&mut self) -> TransitionReport {
        let (controller, mut ctx) = self.split();
        let report = controller.exit_solo(&mut ctx);
        self.after_transition(&report);
        report
    }

    /// Enter Quick Mix. The active preset is detached until exit.
    pub fn enter_quick_mix(&mut self, initial: &[SoundId]) -> TransitionReport {
        self.before_mode_entry();
        let preceding = if self.controller.kind() == ModeKind::QuickMix {
            None
        } else {
            self.library.clear_active()
        };
        let (controller, mut ctx) = self.split();
        let report = controller.enter_quick_mix(&mut ctx, initial, preceding);
        if !report.started.is_empty() {
            self.global_playing = true;
        }
        self.after_transition(&report);
        report
    }

    pub fn exit_quick_mix(&mut self) -> TransitionReport {
        let (controller, mut ctx) = self.split();
        let report = controller.exit_quick_mix(&mut ctx);
        self.after_transition(&report);
        report
    }

    pub fn enter_vehicle_quick_mix(&mut self, initial: &[SoundId]) -> TransitionReport {
        self.before_mode_entry();
        let (controller, mut ctx) = self.split();
        let report = controller.enter_vehicle_quick_mix(&mut ctx, initial);
        if !report.started.is_empty() {
            self.global_playing = true;
        }
        self.after_transition(&report);
        report
    }

    pub fn exit_vehicle_quick_mix(&mut self) -> TransitionReport {
        let (controller, mut ctx) = self.split();
        let report = controller.exit_vehicle_quick_mix(&mut ctx);
        self.after_transition(&report);
        report
    }

    /// Leave whichever mode is active, resuming the restored mix.
    pub fn exit_mode(&mut self) -> TransitionReport {
        let (controller, mut ctx) = self.split();
        let report = controller.exit_current(&mut ctx, true);
        self.after_transition(&report);
        report
    }

    pub fn toggle_quick_mix_sound(&mut self, id: SoundId) -> Result<Option<bool>> {
        let (controller, mut ctx) = self.split();
        let toggled = controller.toggle_quick_mix_sound(&mut ctx, id);
        if let Ok(Some(true)) = toggled {
            self.global_playing = true;
        }
        self.refresh_now_playing();
        toggled
    }

    // ── Presets ────────────────────────────────────────────────

    /// Make a preset active and apply it. Any temporary mode is left first.
    pub fn activate_preset(&mut self, id: PresetId) -> Result<ApplyReport> {
        let preset = self.library.require(id)?.clone();
        preset.validate()?;

        if !self.controller.mode().is_normal() {
            let (controller, mut ctx) = self.split();
            let report = controller.exit_current(&mut ctx, false);
            self.after_transition(&report);
        }
        self.flush_logged();

        self.library.set_active(id, self.store.as_mut())?;
        let report = self.sync.apply(
            &preset,
            &mut self.catalog,
            &mut self.engine,
            &self.settings,
            self.global_playing,
        )?;
        self.refresh_now_playing();
        Ok(report)
    }

    /// Save the current selection as a new preset and make it active.
    pub fn save_current_as(&mut self, name: &str) -> Result<PresetId> {
        if !self.controller.mode().is_normal() {
            return Err(AmbimixError::Validation(format!(
                "cannot save a preset during {}",
                self.controller.kind()
            )));
        }
        self.flush_logged();
        let preset = Preset::from_selection(name.trim(), &self.catalog);
        let id = self.library.create(preset, self.store.as_mut())?;
        self.library.set_active(id, self.store.as_mut())?;
        self.refresh_now_playing();
        Ok(id)
    }

    pub fn rename_preset(&mut self, id: PresetId, name: &str) -> Result<()> {
        self.library.rename(id, name, self.store.as_mut())?;
        self.refresh_now_playing();
        Ok(())
    }

    /// Delete a custom preset. If it was active the default preset is applied,
    /// immediately in Normal mode and otherwise once the mode is left.
    pub fn delete_preset(&mut self, id: PresetId) -> Result<()> {
        let was_active = self.library.active_id() == Some(id);
        self.library.delete(id, self.store.as_mut())?;
        if was_active {
            if self.controller.mode().is_normal() {
                if let Some(default) = self.library.active().cloned() {
                    self.sync.apply(
                        &default,
                        &mut self.catalog,
                        &mut self.engine,
                        &self.settings,
                        self.global_playing,
                    )?;
                }
            } else {
                self.reapply_active = true;
            }
        }
        self.refresh_now_playing();
        Ok(())
    }

    fn apply_active_logged(&mut self) {
        let Some(preset) = self.library.active().cloned() else {
            return;
        };
        if let Err(e) = self.sync.apply(
            &preset,
            &mut self.catalog,
            &mut self.engine,
            &self.settings,
            self.global_playing,
        ) {
            warn!(preset = %preset.id, error = %e, "Active preset could not be applied");
        }
    }

    // ── Catalog ────────────────────────────────────────────────

    pub fn import_sound(
        &mut self,
        title: &str,
        file_name: &str,
        file_path: impl Into<PathBuf>,
    ) -> Result<SoundId> {
        let id = self.catalog.import_custom(title, file_name, file_path)?;
        self.notify(ChangeSource::Catalog);
        Ok(id)
    }

    /// Delete a custom sound, its player, and every preset reference to it.
    pub fn remove_sound(&mut self, id: SoundId) -> Result<()> {
        if !self.catalog.require(id)?.is_custom() {
            return Err(AmbimixError::Validation(format!(
                "{id} is built in and can only be hidden"
            )));
        }
        if self.controller.mode().solo_sound() == Some(id) {
            self.exit_solo();
        }
        self.engine.unload(id);
        let removed = self.catalog.remove_custom(id)?;
        self.notify(ChangeSource::Catalog);
        let scrubbed = self
            .library
            .scrub_sound(removed.file_name(), self.store.as_mut());
        self.refresh_now_playing();
        debug!(sound = %id, presets = ?scrubbed.as_ref().ok(), "Scrubbed removed sound");
        scrubbed.map(|_| ())
    }

    pub fn set_hidden(&mut self, id: SoundId, hidden: bool) -> Result<()> {
        let sound = self.catalog.require_mut(id)?;
        if !sound.set_hidden(hidden) {
            return Ok(());
        }
        if hidden {
            self.engine.pause(id, true);
        }
        self.notify(ChangeSource::Selection);
        self.refresh_now_playing();
        Ok(())
    }

    pub fn move_sound(&mut self, id: SoundId, to_index: usize) -> Result<()> {
        self.catalog.move_sound(id, to_index)?;
        self.notify(ChangeSource::Order);
        Ok(())
    }

    pub fn reset_order(&mut self) {
        self.catalog.reset_order();
        self.notify(ChangeSource::Order);
    }

    // ── Housekeeping ───────────────────────────────────────────

    /// Advance fades, hand back analysis results, and run due preset writes.
    pub fn tick(&mut self, dt: Duration) -> Result<SyncOutcome> {
        self.engine.tick(dt);
        for report in self.engine.drain_analysis() {
            self.apply_analysis(report);
        }
        let outcome = self.sync.poll(
            self.clock.now(),
            &mut self.library,
            &self.catalog,
            self.store.as_mut(),
        );
        self.refresh_now_playing();
        outcome
    }

    /// Block up to `timeout` for one analysis result and apply it.
    pub fn wait_for_analysis(&mut self, timeout: Duration) -> bool {
        match self.engine.wait_analysis(timeout) {
            Some(report) => {
                self.apply_analysis(report);
                true
            }
            None => false,
        }
    }

    fn apply_analysis(&mut self, report: AnalysisReport) {
        let Some(sound) = self.catalog.get_mut(report.sound) else {
            debug!(sound = %report.sound, "Discarding analysis for removed sound");
            return;
        };
        match report.result {
            Ok(analysis) => {
                sound.apply_analysis(&analysis);
                self.engine.update_gain(sound, &self.settings);
                info!(
                    sound = %report.sound,
                    lufs = analysis.lufs,
                    factor = analysis.normalization_factor,
                    "Loudness analysis applied"
                );
            }
            Err(e) => {
                warn!(sound = %report.sound, error = %e, "Loudness analysis failed");
                self.engine.give_up_analysis(report.sound);
            }
        }
    }

    /// Write pending preset changes now.
    pub fn flush(&mut self) -> Result<SyncOutcome> {
        self.sync
            .flush(&mut self.library, &self.catalog, self.store.as_mut())
    }

    fn flush_logged(&mut self) {
        if let Err(e) = self.flush() {
            warn!(error = %e, "Pending preset changes could not be saved");
        }
    }

    /// Flush pending writes and stop every player.
    pub fn shutdown(&mut self) -> Result<SyncOutcome> {
        let outcome = self.flush();
        let stopped = self.engine.stop_all();
        info!(stopped = stopped.len(), "Session shut down");
        outcome
    }

    fn refresh_now_playing(&mut self) {
        let title = match self.controller.kind() {
            ModeKind::Normal => self
                .library
                .active()
                .map(|p| p.name.clone())
                .unwrap_or_else(|| FALLBACK_TITLE.to_string()),
            kind => kind.name().to_string(),
        };
        let subtitle = self
            .controller
            .playable(&self.catalog)
            .into_iter()
            .filter_map(|id| self.catalog.get(id))
            .map(|s| s.title())
            .collect::<Vec<_>>()
            .join(", ");
        let notice = Notice {
            title,
            subtitle,
            is_playing: self.is_audible(),
        };
        if self.last_notice.as_ref() != Some(&notice) {
            self.now_playing
                .notify(&notice.title, &notice.subtitle, notice.is_playing);
            self.last_notice = Some(notice);
        }
    }
}
