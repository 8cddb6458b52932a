//! Ambimix Core - Foundation types for the ambient mixer
//!
//! This crate provides the types shared by every other Ambimix crate:
//! - Sounds and the catalog that owns them
//! - Global mixing settings
//! - Error taxonomy
//! - Collaborator interfaces (playback primitive, loudness analyzer, now-playing)
//! - A clock abstraction so settle delays and debouncing are testable

pub mod catalog;
pub mod clock;
pub mod error;
pub mod id;
pub mod playback;
pub mod settings;
pub mod sound;

pub use catalog::SoundCatalog;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{AmbimixError, Result};
pub use id::{PresetId, SoundId};
pub use playback::{
    LoudnessAnalysis, LoudnessAnalyzer, NoNowPlaying, NowPlaying, PlaybackBackend, PlayerHandle,
};
pub use settings::GlobalSettings;
pub use sound::{Sound, SoundMetadata, SoundSource};

/// Volume bounds shared by sounds, presets and settings.
pub mod limits {
    /// Lowest accepted volume.
    pub const MIN_VOLUME: f32 = 0.0;

    /// Highest accepted volume.
    pub const MAX_VOLUME: f32 = 1.0;

    /// Upper bound of the per-sound manual volume adjustment multiplier.
    pub const MAX_VOLUME_ADJUSTMENT: f32 = 4.0;

    /// Longest settle delay a mode transition may wait for.
    pub const MAX_SETTLE_DELAY_MS: u64 = 300;

    /// Returns true when `volume` is a finite value inside `[MIN_VOLUME, MAX_VOLUME]`.
    pub fn is_valid_volume(volume: f32) -> bool {
        volume.is_finite() && (MIN_VOLUME..=MAX_VOLUME).contains(&volume)
    }
}
