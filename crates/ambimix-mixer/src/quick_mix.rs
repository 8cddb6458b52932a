//! Quick Mix whitelists.

use ambimix_core::limits::is_valid_volume;
use ambimix_core::{AmbimixError, Result, Sound};
use serde::{Deserialize, Serialize};

/// Which built-in sounds each Quick Mix flavor offers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuickMixConfig {
    pub standard: Vec<String>,
    pub vehicle: Vec<String>,
    /// Volume forced onto standard whitelist sounds on entry.
    pub volume: f32,
}

impl Default for QuickMixConfig {
    fn default() -> Self {
        let names = |list: &[&str]| list.iter().map(|s| s.to_string()).collect();
        Self {
            standard: names(&["rain", "waves", "fireplace", "forest", "wind", "stream"]),
            vehicle: names(&["rain", "white-noise", "brown-noise", "road"]),
            volume: 0.8,
        }
    }
}

impl QuickMixConfig {
    pub fn validate(&self) -> Result<()> {
        if !is_valid_volume(self.volume) {
            return Err(AmbimixError::Validation(format!(
                "quick mix volume {} is outside 0..=1",
                self.volume
            )));
        }
        Ok(())
    }

    pub fn whitelist(&self, vehicle: bool) -> &[String] {
        if vehicle {
            &self.vehicle
        } else {
            &self.standard
        }
    }

    /// Custom and hidden sounds are never allowed, whatever the lists say.
    pub fn allows(&self, sound: &Sound, vehicle: bool) -> bool {
        !sound.is_custom()
            && !sound.is_hidden()
            && self
                .whitelist(vehicle)
                .iter()
                .any(|name| name == sound.file_name())
    }
}
