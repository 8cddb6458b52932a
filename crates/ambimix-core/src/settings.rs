//! Global mixing settings consumed read-only by the gain pipeline.

use crate::error::{AmbimixError, Result};
use crate::limits::is_valid_volume;
use serde::{Deserialize, Serialize};

/// Application-wide mixing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalSettings {
    /// Master volume (0.0 to 1.0).
    pub master_volume: f32,
    /// Keep playing underneath other applications' audio.
    pub mix_with_others: bool,
    /// Extra attenuation applied while mixing with others (0.0 to 1.0).
    pub mix_attenuation: f32,
    /// Selecting a sound while paused starts global playback.
    pub auto_play_on_select: bool,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            master_volume: 1.0,
            mix_with_others: false,
            mix_attenuation: 0.75,
            auto_play_on_select: true,
        }
    }
}

impl GlobalSettings {
    /// Check every numeric field is in range.
    pub fn validate(&self) -> Result<()> {
        if !is_valid_volume(self.master_volume) {
            return Err(AmbimixError::Validation(format!(
                "master volume {} is outside [0, 1]",
                self.master_volume
            )));
        }
        if !is_valid_volume(self.mix_attenuation) {
            return Err(AmbimixError::Validation(format!(
                "mix attenuation {} is outside [0, 1]",
                self.mix_attenuation
            )));
        }
        Ok(())
    }
}
