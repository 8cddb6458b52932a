//! Ambimix Audio - Gain and playback engine
//!
//! Everything between a sound's mixing state and the external playback
//! primitive.
//!
//! Architecture:
//! - `gain`: pure volume normalization pipeline (curve, master, attenuation,
//!   loudness normalization or manual adjustment, soft limiter)
//! - `fade`: fixed-cadence volume ramps with cancellation
//! - `analysis`: background loudness measurement with message hand-off
//! - `AudioEngine`: owns player handles and applies gains and fades
//! - `SilentBackend`: in-memory playback primitive for dry runs and tests

pub mod analysis;
pub mod engine;
pub mod fade;
pub mod gain;
pub mod silent;

pub use analysis::{AnalysisReport, AnalysisWorker, UnavailableAnalyzer};
pub use engine::{AudioEngine, DEFAULT_FADE};
pub use fade::{FadeBank, FadeEnd, FadeStep, FadeToken, FADE_TICK};
pub use gain::{
    compute_gain, normalization_factor_from_lufs, soft_limit, FactorSource, GainOutcome, GainPath,
    SOFT_LIMIT_THRESHOLD,
};
pub use silent::{BackendEvent, SilentBackend, SilentProbe};
