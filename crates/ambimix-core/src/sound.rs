//! Sound entity: one loopable ambient track and its mixing state.

use crate::error::{AmbimixError, Result};
use crate::id::SoundId;
use crate::limits::{is_valid_volume, MAX_VOLUME_ADJUSTMENT};
use crate::playback::LoudnessAnalysis;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Where a sound's audio comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SoundSource {
    /// Shipped with the application, resolved against the sounds directory.
    Builtin {
        /// Grouping shown in the UI (e.g. "nature", "noise").
        category: String,
    },
    /// Imported by the user from an arbitrary location.
    Custom {
        /// Absolute path of the imported file.
        file_path: PathBuf,
        /// Name of the file before import, if it differed.
        original_file_name: Option<String>,
    },
}

/// Loudness and file metadata filled in asynchronously by the analyzer.
///
/// Every field may be absent; consumers must tolerate that.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SoundMetadata {
    /// Integrated loudness in LUFS.
    pub loudness_lufs: Option<f32>,
    /// Cached linear gain that brings the sound to the target loudness.
    pub normalization_factor: Option<f32>,
    /// Whether the soft limiter should act on this sound.
    pub needs_limiter: bool,
    pub channel_count: Option<u16>,
    pub duration: Option<Duration>,
    pub file_size: Option<u64>,
}

/// A single ambient sound.
///
/// Identity fields are immutable after construction. The mutable mixing
/// fields go through validating setters; the catalog is the only owner.
#[derive(Debug, Clone, PartialEq)]
pub struct Sound {
    id: SoundId,
    title: String,
    file_name: String,
    file_extension: String,
    source: SoundSource,
    default_order: usize,

    is_selected: bool,
    volume: f32,
    custom_order: usize,
    is_hidden: bool,

    normalize: bool,
    volume_adjustment: f32,

    /// Analyzer output.
    pub metadata: SoundMetadata,
}

impl Sound {
    pub(crate) fn new(
        id: SoundId,
        title: impl Into<String>,
        file_name: impl Into<String>,
        file_extension: impl Into<String>,
        source: SoundSource,
        default_order: usize,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            file_name: file_name.into(),
            file_extension: file_extension.into(),
            source,
            default_order,
            is_selected: false,
            volume: 1.0,
            custom_order: default_order,
            is_hidden: false,
            normalize: true,
            volume_adjustment: 1.0,
            metadata: SoundMetadata::default(),
        }
    }

    pub fn id(&self) -> SoundId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// File name without extension; the key presets refer to.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn file_extension(&self) -> &str {
        &self.file_extension
    }

    pub fn source(&self) -> &SoundSource {
        &self.source
    }

    /// True for user-imported sounds.
    pub fn is_custom(&self) -> bool {
        matches!(self.source, SoundSource::Custom { .. })
    }

    pub fn default_order(&self) -> usize {
        self.default_order
    }

    pub fn is_selected(&self) -> bool {
        self.is_selected
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn custom_order(&self) -> usize {
        self.custom_order
    }

    pub fn is_hidden(&self) -> bool {
        self.is_hidden
    }

    /// Whether loudness normalization is applied instead of the manual adjustment.
    pub fn normalize(&self) -> bool {
        self.normalize
    }

    /// Manual linear gain used when normalization is off.
    pub fn volume_adjustment(&self) -> f32 {
        self.volume_adjustment
    }

    /// Set the volume. Values outside `[0, 1]` (or NaN) are rejected and the
    /// previous volume is kept. Returns whether the value changed.
    pub fn set_volume(&mut self, volume: f32) -> Result<bool> {
        if !is_valid_volume(volume) {
            warn!(sound = %self.id, volume, "Rejected out-of-range volume");
            return Err(AmbimixError::Validation(format!(
                "volume {} for '{}' is outside [0, 1]",
                volume, self.file_name
            )));
        }
        let changed = self.volume.to_bits() != volume.to_bits();
        self.volume = volume;
        Ok(changed)
    }

    /// Set the selection flag. Returns whether the value changed.
    pub fn set_selected(&mut self, selected: bool) -> bool {
        let changed = self.is_selected != selected;
        self.is_selected = selected;
        changed
    }

    /// Hide or unhide. Hidden sounds are also deselected.
    pub fn set_hidden(&mut self, hidden: bool) -> bool {
        let changed = self.is_hidden != hidden;
        self.is_hidden = hidden;
        if hidden {
            self.is_selected = false;
        }
        changed
    }

    pub(crate) fn set_custom_order(&mut self, order: usize) {
        self.custom_order = order;
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn set_normalize(&mut self, normalize: bool) -> bool {
        let changed = self.normalize != normalize;
        self.normalize = normalize;
        changed
    }

    /// Set the manual volume adjustment (`0.0..=4.0`).
    pub fn set_volume_adjustment(&mut self, adjustment: f32) -> Result<bool> {
        if !adjustment.is_finite() || !(0.0..=MAX_VOLUME_ADJUSTMENT).contains(&adjustment) {
            return Err(AmbimixError::Validation(format!(
                "volume adjustment {} for '{}' is outside [0, {}]",
                adjustment, self.file_name, MAX_VOLUME_ADJUSTMENT
            )));
        }
        let changed = self.volume_adjustment.to_bits() != adjustment.to_bits();
        self.volume_adjustment = adjustment;
        Ok(changed)
    }

    /// Store a loudness analysis result.
    pub fn apply_analysis(&mut self, analysis: &LoudnessAnalysis) {
        self.metadata.loudness_lufs = Some(analysis.lufs);
        self.metadata.normalization_factor = Some(analysis.normalization_factor);
        self.metadata.needs_limiter = analysis.needs_limiter;
    }

    /// Full path of the audio file.
    pub fn resource_path(&self, sounds_dir: &Path) -> PathBuf {
        match &self.source {
            SoundSource::Builtin { .. } => {
                sounds_dir.join(format!("{}.{}", self.file_name, self.file_extension))
            }
            SoundSource::Custom { file_path, .. } => file_path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rain() -> Sound {
        Sound::new(
            SoundId::from_raw(1),
            "Rain",
            "rain",
            "m4a",
            SoundSource::Builtin {
                category: "nature".into(),
            },
            0,
        )
    }

    #[test]
    fn test_defaults() {
        let s = rain();
        assert!(!s.is_selected());
        assert_eq!(s.volume(), 1.0);
        assert!(s.normalize());
        assert_eq!(s.volume_adjustment(), 1.0);
        assert!(!s.is_custom());
        assert_eq!(s.custom_order(), s.default_order());
    }

    #[test]
    fn test_set_volume_boundaries() {
        let mut s = rain();
        assert!(s.set_volume(0.0).unwrap());
        assert!(s.set_volume(1.0).unwrap());
        assert!(!s.set_volume(1.0).unwrap());
    }

    #[test]
    fn test_set_volume_rejects_nan() {
        let mut s = rain();
        s.set_volume(0.4).unwrap();
        assert!(matches!(s.set_volume(f32::NAN), Err(AmbimixError::Validation(_))));
        assert_eq!(s.volume(), 0.4);
    }

    #[test]
    fn test_hide_deselects() {
        let mut s = rain();
        s.set_selected(true);
        s.set_hidden(true);
        assert!(!s.is_selected());
        assert!(s.is_hidden());
    }

    #[test]
    fn test_volume_adjustment_range() {
        let mut s = rain();
        assert!(s.set_volume_adjustment(2.5).is_ok());
        assert!(s.set_volume_adjustment(-0.1).is_err());
        assert!(s.set_volume_adjustment(4.5).is_err());
        assert_eq!(s.volume_adjustment(), 2.5);
    }

    #[test]
    fn test_resource_path() {
        let s = rain();
        assert_eq!(s.resource_path(Path::new("/snd")), PathBuf::from("/snd/rain.m4a"));

        let custom = Sound::new(
            SoundId::from_raw(2),
            "Mine",
            "mine",
            "wav",
            SoundSource::Custom {
                file_path: PathBuf::from("/home/me/mine.wav"),
                original_file_name: None,
            },
            1,
        );
        assert_eq!(
            custom.resource_path(Path::new("/snd")),
            PathBuf::from("/home/me/mine.wav")
        );
    }

    proptest! {
        #[test]
        fn out_of_range_volume_is_rejected(start in 0.0f32..=1.0, bad in prop_oneof![
            (1.0001f32..1000.0),
            (-1000.0f32..-0.0001),
        ]) {
            let mut s = rain();
            s.set_volume(start).unwrap();
            prop_assert!(s.set_volume(bad).is_err());
            prop_assert_eq!(s.volume().to_bits(), start.to_bits());
        }
    }
}
