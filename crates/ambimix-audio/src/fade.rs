//! Volume fades driven by a fixed-cadence timer.
//!
//! A fade is a linear envelope from one level to another. The session calls
//! [`FadeBank::advance`] with wall-clock deltas; the bank converts them into
//! whole ~60 Hz ticks so the ramp is the same regardless of how irregularly
//! it is driven. Starting a fade on a sound replaces the one in flight, and a
//! cancelled fade never reports completion.

use ambimix_core::SoundId;
use std::collections::HashMap;
use std::time::Duration;

/// Fade timer cadence (~60 Hz).
pub const FADE_TICK: Duration = Duration::from_micros(16_667);

/// What happens when a fade reaches its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeEnd {
    /// Keep playing at the target level.
    Hold,
    /// Pause the player once silent.
    Pause,
}

/// Identifies one specific fade; stale once replaced or cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FadeToken {
    pub sound: SoundId,
    generation: u64,
}

#[derive(Debug, Clone)]
struct Fade {
    from: f32,
    to: f32,
    duration: Duration,
    elapsed: Duration,
    end: FadeEnd,
    generation: u64,
}

impl Fade {
    fn level(&self) -> f32 {
        if self.duration.is_zero() || self.elapsed >= self.duration {
            return self.to;
        }
        let t = self.elapsed.as_secs_f32() / self.duration.as_secs_f32();
        self.from + (self.to - self.from) * t
    }

    fn done(&self) -> bool {
        self.elapsed >= self.duration
    }
}

/// One envelope update produced by [`FadeBank::advance`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeStep {
    pub sound: SoundId,
    /// Envelope level (0.0 to 1.0) to multiply the sound's gain by.
    pub level: f32,
    /// Set on the step that finishes the fade.
    pub completed: Option<FadeEnd>,
}

/// All in-flight fades, at most one per sound.
#[derive(Debug, Default)]
pub struct FadeBank {
    fades: HashMap<SoundId, Fade>,
    next_generation: u64,
    carry: Duration,
}

impl FadeBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fade, cancelling any fade already running on `sound`.
    pub fn start(
        &mut self,
        sound: SoundId,
        from: f32,
        to: f32,
        duration: Duration,
        end: FadeEnd,
    ) -> FadeToken {
        self.next_generation += 1;
        let generation = self.next_generation;
        self.fades.insert(
            sound,
            Fade {
                from: from.clamp(0.0, 1.0),
                to: to.clamp(0.0, 1.0),
                duration,
                elapsed: Duration::ZERO,
                end,
                generation,
            },
        );
        FadeToken { sound, generation }
    }

    /// Cancel the fade on `sound`. Returns whether one was running.
    pub fn cancel(&mut self, sound: SoundId) -> bool {
        self.fades.remove(&sound).is_some()
    }

    /// Cancel every fade. Returns how many were running.
    pub fn cancel_all(&mut self) -> usize {
        let n = self.fades.len();
        self.fades.clear();
        self.carry = Duration::ZERO;
        n
    }

    pub fn is_fading(&self, sound: SoundId) -> bool {
        self.fades.contains_key(&sound)
    }

    /// Whether `token` still names the fade in flight.
    pub fn is_current(&self, token: FadeToken) -> bool {
        self.fades
            .get(&token.sound)
            .is_some_and(|f| f.generation == token.generation)
    }

    /// Current envelope level of a running fade.
    pub fn level(&self, sound: SoundId) -> Option<f32> {
        self.fades.get(&sound).map(Fade::level)
    }

    pub fn len(&self) -> usize {
        self.fades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fades.is_empty()
    }

    /// Advance all fades by the whole ticks contained in `dt` (plus any
    /// remainder carried from earlier calls).
    pub fn advance(&mut self, dt: Duration) -> Vec<FadeStep> {
        if self.fades.is_empty() {
            self.carry = Duration::ZERO;
            return Vec::new();
        }
        self.carry += dt;
        let ticks = (self.carry.as_nanos() / FADE_TICK.as_nanos()) as u32;
        if ticks == 0 {
            return Vec::new();
        }
        self.carry -= FADE_TICK * ticks;
        let step = FADE_TICK * ticks;

        let mut steps = Vec::with_capacity(self.fades.len());
        let mut finished = Vec::new();
        for (&sound, fade) in self.fades.iter_mut() {
            fade.elapsed += step;
            let completed = if fade.done() {
                finished.push(sound);
                Some(fade.end)
            } else {
                None
            };
            steps.push(FadeStep {
                sound,
                level: fade.level(),
                completed,
            });
        }
        for sound in finished {
            self.fades.remove(&sound);
        }
        steps.sort_by_key(|s| s.sound);
        steps
    }
}
