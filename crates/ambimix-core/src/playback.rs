//! Interfaces of the external collaborators the mixer drives.
//!
//! Audio decoding, loudness measurement and media-control surfaces live
//! outside this workspace. The mixer only needs these narrow traits.

use crate::error::Result;
use std::path::Path;
use std::time::Duration;

/// Opaque handle to a loaded player in the playback primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlayerHandle(pub u64);

/// The playback primitive: loads a file, loops it, and controls its gain.
pub trait PlaybackBackend: Send {
    /// Load an audio file. Fails with `ResourceUnavailable` when the file
    /// cannot be opened or decoded.
    fn load(&mut self, path: &Path) -> Result<PlayerHandle>;

    /// Release a player. Unknown handles are ignored.
    fn unload(&mut self, handle: PlayerHandle);

    fn play(&mut self, handle: PlayerHandle);

    /// Pause playback. `immediate` skips any backend-side ramp.
    fn pause(&mut self, handle: PlayerHandle, immediate: bool);

    fn set_volume(&mut self, handle: PlayerHandle, volume: f32);

    fn set_loop(&mut self, handle: PlayerHandle, looping: bool);

    fn current_position(&self, handle: PlayerHandle) -> Duration;

    fn is_playing(&self, handle: PlayerHandle) -> bool;
}

/// Result of measuring a sound's loudness.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoudnessAnalysis {
    /// Integrated loudness in LUFS.
    pub lufs: f32,
    /// Linear gain that brings the sound to the target loudness.
    pub normalization_factor: f32,
    /// Normalized peaks would exceed the limiter threshold.
    pub needs_limiter: bool,
}

/// Loudness analyzer. Called from a background worker, never from the
/// serialized mixing context.
pub trait LoudnessAnalyzer: Send + Sync {
    fn analyze(&self, path: &Path) -> Result<LoudnessAnalysis>;
}

/// Best-effort now-playing surface (media keys, lock screen, tray).
pub trait NowPlaying: Send {
    fn notify(&mut self, title: &str, subtitle: &str, is_playing: bool);
}

/// Now-playing sink that drops every update.
#[derive(Debug, Default)]
pub struct NoNowPlaying;

impl NowPlaying for NoNowPlaying {
    fn notify(&mut self, _title: &str, _subtitle: &str, _is_playing: bool) {}
}
