//! Playback engine: owns the backend handles and applies gains and fades.

use crate::analysis::{AnalysisReport, AnalysisWorker};
use crate::fade::{FadeBank, FadeEnd};
use crate::gain::{compute_gain, GainOutcome};
use ambimix_core::{
    AmbimixError, GlobalSettings, PlaybackBackend, PlayerHandle, Result, Sound, SoundId,
};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default fade length for play/pause ramps.
pub const DEFAULT_FADE: Duration = Duration::from_millis(400);

/// Smallest gain change worth sending to the backend.
const GAIN_EPSILON: f32 = 1e-6;

/// Drives the playback primitive for every loaded sound.
pub struct AudioEngine {
    backend: Box<dyn PlaybackBackend>,
    sounds_dir: PathBuf,
    fade_duration: Duration,
    players: HashMap<SoundId, PlayerHandle>,
    /// Latest pipeline output per sound.
    gains: HashMap<SoundId, f32>,
    /// Fade envelope per sound; absent means 1.0.
    envelopes: HashMap<SoundId, f32>,
    /// Last volume written to the backend.
    applied: HashMap<SoundId, f32>,
    fades: FadeBank,
    analysis: Option<AnalysisWorker>,
    /// Sounds whose analysis failed; not requested again.
    unanalyzable: HashSet<SoundId>,
}

impl AudioEngine {
    /// Create an engine resolving built-in sounds against `sounds_dir`.
    pub fn new(backend: Box<dyn PlaybackBackend>, sounds_dir: impl Into<PathBuf>) -> Self {
        info!("Initializing audio engine");
        Self {
            backend,
            sounds_dir: sounds_dir.into(),
            fade_duration: DEFAULT_FADE,
            players: HashMap::new(),
            gains: HashMap::new(),
            envelopes: HashMap::new(),
            applied: HashMap::new(),
            fades: FadeBank::new(),
            analysis: None,
            unanalyzable: HashSet::new(),
        }
    }

    /// Set the play/pause ramp length. Zero disables fades.
    pub fn with_fade_duration(mut self, fade: Duration) -> Self {
        self.fade_duration = fade;
        self
    }

    /// Attach a loudness analysis worker.
    pub fn with_analysis(mut self, worker: AnalysisWorker) -> Self {
        self.analysis = Some(worker);
        self
    }

    pub fn sounds_dir(&self) -> &Path {
        &self.sounds_dir
    }

    pub fn fade_duration(&self) -> Duration {
        self.fade_duration
    }

    fn ensure_loaded(&mut self, sound: &Sound) -> Result<PlayerHandle> {
        if let Some(&handle) = self.players.get(&sound.id()) {
            return Ok(handle);
        }
        let path = sound.resource_path(&self.sounds_dir);
        let handle = self.backend.load(&path).map_err(|e| {
            warn!(sound = %sound.id(), path = %path.display(), error = %e, "Failed to load sound");
            match e {
                AmbimixError::ResourceUnavailable(msg) => AmbimixError::ResourceUnavailable(msg),
                other => AmbimixError::ResourceUnavailable(format!(
                    "{}: {}",
                    path.display(),
                    other
                )),
            }
        })?;
        self.backend.set_loop(handle, true);
        self.players.insert(sound.id(), handle);
        debug!(sound = %sound.id(), path = %path.display(), "Loaded sound");
        Ok(handle)
    }

    /// Recompute a sound's gain and push it to the backend if it changed.
    ///
    /// Missing loudness data triggers a fire-and-forget analysis request.
    pub fn update_gain(&mut self, sound: &Sound, settings: &GlobalSettings) -> GainOutcome {
        let outcome = compute_gain(sound, settings);
        self.gains.insert(sound.id(), outcome.gain);
        if outcome.needs_analysis() {
            self.request_analysis(sound);
        }
        self.write_volume(sound.id());
        outcome
    }

    fn request_analysis(&mut self, sound: &Sound) {
        if self.unanalyzable.contains(&sound.id()) {
            return;
        }
        let path = sound.resource_path(&self.sounds_dir);
        if let Some(worker) = self.analysis.as_mut() {
            if worker.request(sound.id(), path) {
                debug!(sound = %sound.id(), "Requested loudness analysis");
            }
        }
    }

    fn write_volume(&mut self, id: SoundId) {
        let Some(&handle) = self.players.get(&id) else {
            return;
        };
        let gain = self.gains.get(&id).copied().unwrap_or(0.0);
        let envelope = self.envelopes.get(&id).copied().unwrap_or(1.0);
        let target = gain * envelope;
        let unchanged = self
            .applied
            .get(&id)
            .is_some_and(|&prev| (prev - target).abs() <= GAIN_EPSILON);
        if unchanged {
            return;
        }
        self.backend.set_volume(handle, target);
        self.applied.insert(id, target);
    }

    /// Start (or keep) playing a sound. With `fade`, ramps in from silence
    /// (or from the current level of a fade-out in progress).
    pub fn play(&mut self, sound: &Sound, settings: &GlobalSettings, fade: bool) -> Result<()> {
        let id = sound.id();
        let handle = self.ensure_loaded(sound)?;
        let was_playing = self.backend.is_playing(handle);

        if fade && !self.fade_duration.is_zero() {
            let from = match self.fades.level(id) {
                Some(level) => level,
                None if was_playing => 1.0,
                None => 0.0,
            };
            self.envelopes.insert(id, from);
            if from < 1.0 {
                self.fades
                    .start(id, from, 1.0, self.fade_duration, FadeEnd::Hold);
            } else {
                self.fades.cancel(id);
            }
        } else {
            self.fades.cancel(id);
            self.envelopes.remove(&id);
        }

        self.update_gain(sound, settings);
        if !was_playing {
            self.backend.play(handle);
            debug!(sound = %id, fade, "Playing");
        }
        Ok(())
    }

    /// Pause a sound. Non-immediate pauses fade out first and pause on
    /// completion; an immediate pause cancels any fade.
    pub fn pause(&mut self, id: SoundId, immediate: bool) {
        let Some(&handle) = self.players.get(&id) else {
            return;
        };
        if immediate || self.fade_duration.is_zero() {
            self.fades.cancel(id);
            self.envelopes.remove(&id);
            if self.backend.is_playing(handle) {
                self.backend.pause(handle, true);
                debug!(sound = %id, "Paused");
            }
            return;
        }
        if !self.backend.is_playing(handle) {
            return;
        }
        let from = self
            .fades
            .level(id)
            .or_else(|| self.envelopes.get(&id).copied())
            .unwrap_or(1.0);
        self.fades
            .start(id, from, 0.0, self.fade_duration, FadeEnd::Pause);
    }

    /// Immediately pause every playing sound and cancel all fades.
    /// Returns the sounds that were playing.
    pub fn stop_all(&mut self) -> Vec<SoundId> {
        self.fades.cancel_all();
        self.envelopes.clear();
        let mut stopped = Vec::new();
        for (&id, &handle) in &self.players {
            if self.backend.is_playing(handle) {
                self.backend.pause(handle, true);
                stopped.push(id);
            }
        }
        stopped.sort();
        if !stopped.is_empty() {
            debug!(count = stopped.len(), "Stopped all sounds");
        }
        stopped
    }

    /// Cancel every in-flight fade, leaving players where they are.
    pub fn cancel_fades(&mut self) {
        self.fades.cancel_all();
        let ids: Vec<SoundId> = self.envelopes.drain().map(|(id, _)| id).collect();
        for id in ids {
            self.write_volume(id);
        }
    }

    /// Whether the backend reports the sound as playing.
    pub fn is_playing(&self, id: SoundId) -> bool {
        self.players
            .get(&id)
            .is_some_and(|&h| self.backend.is_playing(h))
    }

    pub fn is_loaded(&self, id: SoundId) -> bool {
        self.players.contains_key(&id)
    }

    pub fn is_fading(&self, id: SoundId) -> bool {
        self.fades.is_fading(id)
    }

    /// Last volume written to the backend.
    pub fn applied_volume(&self, id: SoundId) -> Option<f32> {
        self.applied.get(&id).copied()
    }

    pub fn position(&self, id: SoundId) -> Option<Duration> {
        self.players
            .get(&id)
            .map(|&h| self.backend.current_position(h))
    }

    /// Advance fades by `dt`. Returns sounds paused by a finished fade-out.
    pub fn tick(&mut self, dt: Duration) -> Vec<SoundId> {
        let mut paused = Vec::new();
        for step in self.fades.advance(dt) {
            self.envelopes.insert(step.sound, step.level);
            self.write_volume(step.sound);
            match step.completed {
                Some(FadeEnd::Pause) => {
                    if let Some(&handle) = self.players.get(&step.sound) {
                        self.backend.pause(handle, true);
                    }
                    self.envelopes.remove(&step.sound);
                    paused.push(step.sound);
                }
                Some(FadeEnd::Hold) => {
                    self.envelopes.remove(&step.sound);
                }
                None => {}
            }
        }
        paused
    }

    /// Release a sound's player, e.g. after the sound was deleted.
    pub fn unload(&mut self, id: SoundId) {
        self.fades.cancel(id);
        self.envelopes.remove(&id);
        self.gains.remove(&id);
        self.applied.remove(&id);
        self.unanalyzable.remove(&id);
        if let Some(handle) = self.players.remove(&id) {
            self.backend.unload(handle);
            debug!(sound = %id, "Unloaded sound");
        }
    }

    /// Stop requesting analysis for a sound, e.g. after the analyzer failed on it.
    pub fn give_up_analysis(&mut self, id: SoundId) {
        self.unanalyzable.insert(id);
    }

    /// Collect finished loudness analyses.
    pub fn drain_analysis(&mut self) -> Vec<AnalysisReport> {
        self.analysis
            .as_mut()
            .map(AnalysisWorker::drain)
            .unwrap_or_default()
    }

    /// Block up to `timeout` for one analysis report.
    pub fn wait_analysis(&mut self, timeout: Duration) -> Option<AnalysisReport> {
        self.analysis.as_mut()?.wait(timeout)
    }
}
