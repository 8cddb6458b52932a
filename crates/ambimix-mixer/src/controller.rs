//! The playback mode state machine.
//!
//! Every transition runs in the same order: snapshot, stop, apply, resume.
//! The mode field is assigned on every path, so a failed sound load never
//! leaves the machine between modes; failures are collected in the
//! [`TransitionReport`] instead.

use ambimix_audio::AudioEngine;
use ambimix_core::limits::{MAX_SETTLE_DELAY_MS, MAX_VOLUME};
use ambimix_core::{AmbimixError, Clock, GlobalSettings, PresetId, Result, SoundCatalog, SoundId};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::mode::{ModeKind, PlaybackMode};
use crate::quick_mix::QuickMixConfig;
use crate::snapshot::{self, SoundSnapshot};

/// Default pause between stopping everything and starting a solo sound.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(150);

/// State a transition reads and mutates.
pub struct MixContext<'a> {
    pub catalog: &'a mut SoundCatalog,
    pub engine: &'a mut AudioEngine,
    pub settings: &'a GlobalSettings,
    /// Whether the user wants sound playing at all.
    pub global_playing: bool,
}

/// What a transition did.
#[derive(Debug)]
pub struct TransitionReport {
    pub from: ModeKind,
    pub to: ModeKind,
    pub stopped: Vec<SoundId>,
    pub started: Vec<SoundId>,
    pub failures: Vec<(SoundId, AmbimixError)>,
    /// Set when leaving Quick Mix: the preset that was active on entry.
    pub restored_preset: Option<PresetId>,
}

impl TransitionReport {
    fn new(from: ModeKind) -> Self {
        Self {
            from,
            to: from,
            stopped: Vec::new(),
            started: Vec::new(),
            failures: Vec::new(),
            restored_preset: None,
        }
    }

    /// True when the call changed nothing.
    pub fn is_noop(&self) -> bool {
        self.from == self.to
            && self.stopped.is_empty()
            && self.started.is_empty()
            && self.failures.is_empty()
    }

    pub fn first_failure(&self) -> Option<&AmbimixError> {
        self.failures.first().map(|(_, e)| e)
    }

    fn absorb(&mut self, earlier: TransitionReport) {
        self.from = earlier.from;
        self.stopped.extend(earlier.stopped);
        self.started.extend(earlier.started);
        self.failures.extend(earlier.failures);
        if earlier.restored_preset.is_some() {
            self.restored_preset = earlier.restored_preset;
        }
    }
}

/// Owns the current [`PlaybackMode`] and performs transitions between modes.
pub struct ModeController {
    mode: PlaybackMode,
    quick_mix: QuickMixConfig,
    settle_delay: Duration,
    clock: Arc<dyn Clock>,
}

impl ModeController {
    pub fn new(quick_mix: QuickMixConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            mode: PlaybackMode::Normal,
            quick_mix,
            settle_delay: DEFAULT_SETTLE_DELAY,
            clock,
        }
    }

    /// Clamped to the maximum allowed settle delay.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay.min(Duration::from_millis(MAX_SETTLE_DELAY_MS));
        self
    }

    pub fn mode(&self) -> &PlaybackMode {
        &self.mode
    }

    pub fn kind(&self) -> ModeKind {
        self.mode.kind()
    }

    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    pub fn quick_mix_config(&self) -> &QuickMixConfig {
        &self.quick_mix
    }

    /// Sounds that should be audible in the current mode when playback is on.
    pub fn playable(&self, catalog: &SoundCatalog) -> Vec<SoundId> {
        match &self.mode {
            PlaybackMode::Solo { sound, .. } => vec![*sound],
            _ => catalog
                .selected_ids()
                .into_iter()
                .filter(|id| catalog.get(*id).is_some_and(|s| !s.is_hidden()))
                .collect(),
        }
    }

    /// True when some selected sound's player is actually playing.
    pub fn is_audible(&self, catalog: &SoundCatalog, engine: &AudioEngine) -> bool {
        catalog
            .iter()
            .any(|s| s.is_selected() && engine.is_playing(s.id()))
    }

    /// Play one sound alone at full volume.
    pub fn enter_solo(&mut self, ctx: &mut MixContext<'_>, sound: SoundId) -> Result<TransitionReport> {
        let target = ctx.catalog.require(sound)?;
        if target.is_hidden() {
            return Err(AmbimixError::Validation(format!(
                "'{}' is hidden",
                target.file_name()
            )));
        }
        if self.mode.solo_sound() == Some(sound) {
            return Ok(TransitionReport::new(ModeKind::Solo));
        }
        let earlier = self.leave_for_new_mode(ctx);

        let mut report = TransitionReport::new(ModeKind::Normal);
        report.absorb(earlier);

        let target = ctx.catalog.require_mut(sound)?;
        let saved = SoundSnapshot::of(target);
        report.stopped.extend(ctx.engine.stop_all());

        target.set_volume(MAX_VOLUME)?;
        target.set_selected(true);
        self.mode = PlaybackMode::Solo { sound, saved };
        report.to = ModeKind::Solo;

        self.clock.sleep(self.settle_delay);
        match ctx.engine.play(target, ctx.settings, true) {
            Ok(()) => report.started.push(sound),
            Err(e) => {
                warn!(sound = %sound, error = %e, "Solo sound failed to start");
                report.failures.push((sound, e));
            }
        }
        info!(sound = %sound, file = %target.file_name(), "Entered solo");
        Ok(report)
    }

    /// Leave Solo, restoring the soloed sound and resuming the mix if
    /// global playback is on.
    pub fn exit_solo(&mut self, ctx: &mut MixContext<'_>) -> TransitionReport {
        self.exit_solo_inner(ctx, true)
    }

    fn exit_solo_inner(&mut self, ctx: &mut MixContext<'_>, resume: bool) -> TransitionReport {
        let mut report = TransitionReport::new(self.kind());
        let PlaybackMode::Solo { sound, saved } = self.mode else {
            return report;
        };
        self.mode = PlaybackMode::Normal;
        report.to = ModeKind::Normal;

        ctx.engine.pause(sound, true);
        report.stopped.push(sound);
        let restored = snapshot::restore(vec![saved], ctx.catalog, ctx.engine, ctx.settings, false);
        report.failures.extend(restored.failures);

        if resume && ctx.global_playing {
            self.resume_selected(ctx, &mut report);
        }
        info!(sound = %sound, resumed = report.started.len(), "Exited solo");
        report
    }

    /// Start Quick Mix with the standard whitelist.
    pub fn enter_quick_mix(
        &mut self,
        ctx: &mut MixContext<'_>,
        initial: &[SoundId],
        active_preset: Option<PresetId>,
    ) -> TransitionReport {
        if matches!(self.mode, PlaybackMode::QuickMix { .. }) {
            return TransitionReport::new(ModeKind::QuickMix);
        }
        let earlier = self.leave_for_new_mode(ctx);
        let (mut report, saved) = self.start_mix(ctx, initial, false);
        report.absorb(earlier);
        self.mode = PlaybackMode::QuickMix {
            saved,
            preceding_preset: active_preset,
        };
        report.to = ModeKind::QuickMix;
        info!(started = report.started.len(), "Entered quick mix");
        report
    }

    /// Start Quick Mix with the vehicle whitelist; volumes are left alone.
    pub fn enter_vehicle_quick_mix(
        &mut self,
        ctx: &mut MixContext<'_>,
        initial: &[SoundId],
    ) -> TransitionReport {
        if matches!(self.mode, PlaybackMode::VehicleQuickMix { .. }) {
            return TransitionReport::new(ModeKind::VehicleQuickMix);
        }
        let earlier = self.leave_for_new_mode(ctx);
        let (mut report, saved) = self.start_mix(ctx, initial, true);
        report.absorb(earlier);
        self.mode = PlaybackMode::VehicleQuickMix { saved };
        report.to = ModeKind::VehicleQuickMix;
        info!(started = report.started.len(), "Entered vehicle quick mix");
        report
    }

    fn start_mix(
        &self,
        ctx: &mut MixContext<'_>,
        initial: &[SoundId],
        vehicle: bool,
    ) -> (TransitionReport, Vec<SoundSnapshot>) {
        let mut report = TransitionReport::new(ModeKind::Normal);
        let saved = snapshot::capture(ctx.catalog.iter());
        report.stopped.extend(ctx.engine.stop_all());

        for sound in ctx.catalog.iter_mut() {
            sound.set_selected(false);
            if !vehicle && self.quick_mix.allows(sound, false) {
                if let Err(e) = sound.set_volume(self.quick_mix.volume) {
                    report.failures.push((sound.id(), e));
                }
            }
            ctx.engine.update_gain(sound, ctx.settings);
        }

        for &id in initial {
            let Some(sound) = ctx.catalog.get_mut(id) else {
                continue;
            };
            if !self.quick_mix.allows(sound, vehicle) {
                debug!(sound = %id, "Initial quick mix sound not allowed");
                continue;
            }
            sound.set_selected(true);
            match ctx.engine.play(sound, ctx.settings, true) {
                Ok(()) => report.started.push(id),
                Err(e) => report.failures.push((id, e)),
            }
        }
        (report, saved)
    }

    /// Flip one sound inside Quick Mix. Returns the new selection, or `None`
    /// when the toggle was ignored (wrong mode, custom or not whitelisted).
    pub fn toggle_quick_mix_sound(
        &mut self,
        ctx: &mut MixContext<'_>,
        sound: SoundId,
    ) -> Result<Option<bool>> {
        let vehicle = match self.mode {
            PlaybackMode::QuickMix { .. } => false,
            PlaybackMode::VehicleQuickMix { .. } => true,
            _ => return Ok(None),
        };
        let target = ctx.catalog.require_mut(sound)?;
        if !self.quick_mix.allows(target, vehicle) {
            debug!(sound = %sound, "Quick mix toggle ignored");
            return Ok(None);
        }

        let selected = !target.is_selected();
        target.set_selected(selected);
        if selected {
            ctx.engine.play(target, ctx.settings, true)?;
        } else {
            ctx.engine.pause(sound, false);
        }
        debug!(sound = %sound, selected, "Quick mix toggle");
        Ok(Some(selected))
    }

    pub fn exit_quick_mix(&mut self, ctx: &mut MixContext<'_>) -> TransitionReport {
        if !matches!(self.mode, PlaybackMode::QuickMix { .. }) {
            return TransitionReport::new(self.kind());
        }
        self.exit_mix(ctx, true)
    }

    pub fn exit_vehicle_quick_mix(&mut self, ctx: &mut MixContext<'_>) -> TransitionReport {
        if !matches!(self.mode, PlaybackMode::VehicleQuickMix { .. }) {
            return TransitionReport::new(self.kind());
        }
        self.exit_mix(ctx, true)
    }

    fn exit_mix(&mut self, ctx: &mut MixContext<'_>, resume: bool) -> TransitionReport {
        let mut report = TransitionReport::new(self.kind());
        let (saved, preceding) = match std::mem::take(&mut self.mode) {
            PlaybackMode::QuickMix {
                saved,
                preceding_preset,
            } => (saved, preceding_preset),
            PlaybackMode::VehicleQuickMix { saved } => (saved, None),
            other => {
                self.mode = other;
                return report;
            }
        };
        report.to = ModeKind::Normal;
        report.restored_preset = preceding;

        report.stopped.extend(ctx.engine.stop_all());
        let restored = snapshot::restore(
            saved,
            ctx.catalog,
            ctx.engine,
            ctx.settings,
            resume && ctx.global_playing,
        );
        report.started.extend(restored.started);
        report.failures.extend(restored.failures);
        info!(from = %report.from, resumed = report.started.len(), "Exited quick mix");
        report
    }

    /// Return to Normal from whatever mode is active.
    pub fn exit_current(&mut self, ctx: &mut MixContext<'_>, resume: bool) -> TransitionReport {
        match self.mode {
            PlaybackMode::Normal => TransitionReport::new(ModeKind::Normal),
            PlaybackMode::Solo { .. } => self.exit_solo_inner(ctx, resume),
            PlaybackMode::QuickMix { .. } | PlaybackMode::VehicleQuickMix { .. } => {
                self.exit_mix(ctx, resume)
            }
        }
    }

    fn leave_for_new_mode(&mut self, ctx: &mut MixContext<'_>) -> TransitionReport {
        self.exit_current(ctx, false)
    }

    fn resume_selected(&self, ctx: &mut MixContext<'_>, report: &mut TransitionReport) {
        for id in self.playable(ctx.catalog) {
            let Some(sound) = ctx.catalog.get(id) else {
                continue;
            };
            let was_playing = ctx.engine.is_playing(id);
            match ctx.engine.play(sound, ctx.settings, true) {
                Ok(()) if !was_playing => report.started.push(id),
                Ok(()) => {}
                Err(e) => report.failures.push((id, e)),
            }
        }
    }
}
