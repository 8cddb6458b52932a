//! Volume normalization pipeline.
//!
//! Turns a sound's raw slider volume, the global settings and the sound's
//! loudness metadata into the single gain handed to the playback primitive.
//! Everything here is pure; the engine decides whether to apply the result.
//!
//! Stages, in order:
//! 1. cubic perceptual curve
//! 2. master volume
//! 3. mix-with-others attenuation
//! 4. loudness normalization, or 5. manual volume adjustment (never both)
//! 6. tanh soft limiter above [`SOFT_LIMIT_THRESHOLD`]

use ambimix_core::{GlobalSettings, Sound};

/// Gain above which the soft limiter starts compressing.
pub const SOFT_LIMIT_THRESHOLD: f32 = 0.85;

/// Loudness every sound is normalized towards.
pub const TARGET_LUFS: f32 = -20.0;

/// Bounds of the LUFS-derived normalization factor.
pub const MIN_NORMALIZATION_FACTOR: f32 = 0.1;
pub const MAX_NORMALIZATION_FACTOR: f32 = 4.0;

/// Which of the two mutually exclusive gain-correction stages ran.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GainPath {
    /// Loudness normalization with the given factor.
    Normalized { factor: f32, source: FactorSource },
    /// Manual adjustment with the given multiplier.
    Adjusted { multiplier: f32 },
}

/// Where the normalization factor came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactorSource {
    /// Precomputed factor stored on the sound.
    Cached,
    /// Derived from the measured LUFS.
    Lufs,
    /// No loudness data yet; unity gain used.
    Missing,
}

/// Output of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainOutcome {
    /// Final gain, always finite and `>= 0`.
    pub gain: f32,
    pub path: GainPath,
    /// Whether the soft limiter changed the gain.
    pub limited: bool,
}

impl GainOutcome {
    /// True when the caller should request a loudness measurement.
    pub fn needs_analysis(&self) -> bool {
        matches!(
            self.path,
            GainPath::Normalized {
                source: FactorSource::Missing,
                ..
            }
        )
    }
}

/// Cubic response so the slider feels linear to the ear.
pub fn perceptual_curve(raw_volume: f32) -> f32 {
    raw_volume.powi(3)
}

/// Map measured loudness to a linear gain towards [`TARGET_LUFS`].
///
/// Monotonic in the loudness deficit: quieter sounds get more gain.
pub fn normalization_factor_from_lufs(lufs: f32) -> f32 {
    if !lufs.is_finite() {
        return 1.0;
    }
    let deficit_db = TARGET_LUFS - lufs;
    10f32
        .powf(deficit_db / 20.0)
        .clamp(MIN_NORMALIZATION_FACTOR, MAX_NORMALIZATION_FACTOR)
}

/// tanh soft-knee limiter. Identity at or below the threshold.
pub fn soft_limit(gain: f32) -> f32 {
    if gain <= SOFT_LIMIT_THRESHOLD {
        return gain;
    }
    let headroom = 1.0 - SOFT_LIMIT_THRESHOLD;
    let excess = (gain - SOFT_LIMIT_THRESHOLD) / headroom;
    SOFT_LIMIT_THRESHOLD + headroom * (2.0 * excess).tanh()
}

fn normalization_factor(sound: &Sound) -> (f32, FactorSource) {
    match (
        sound.metadata.normalization_factor,
        sound.metadata.loudness_lufs,
    ) {
        (Some(factor), _) if factor.is_finite() && factor >= 0.0 => (factor, FactorSource::Cached),
        (_, Some(lufs)) => (normalization_factor_from_lufs(lufs), FactorSource::Lufs),
        _ => (1.0, FactorSource::Missing),
    }
}

/// Run the full pipeline for one sound.
pub fn compute_gain(sound: &Sound, settings: &GlobalSettings) -> GainOutcome {
    let mut gain = perceptual_curve(sound.volume()) * settings.master_volume;

    if settings.mix_with_others {
        gain *= settings.mix_attenuation;
    }

    let path = if sound.normalize() {
        let (factor, source) = normalization_factor(sound);
        gain *= factor;
        GainPath::Normalized { factor, source }
    } else {
        let multiplier = sound.volume_adjustment();
        gain *= multiplier;
        GainPath::Adjusted { multiplier }
    };

    let mut limited = false;
    if sound.metadata.needs_limiter && gain > SOFT_LIMIT_THRESHOLD {
        gain = soft_limit(gain);
        limited = true;
    }

    if !gain.is_finite() {
        gain = 0.0;
    }

    GainOutcome {
        gain: gain.max(0.0),
        path,
        limited,
    }
}
