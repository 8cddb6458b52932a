//! Preset types.

use ambimix_core::limits::is_valid_volume;
use ambimix_core::{AmbimixError, PresetId, Result, Sound, SoundCatalog};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Name given to the synthesized default preset.
pub const DEFAULT_PRESET_NAME: &str = "Default";

/// Recorded state of one sound inside a preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetSoundState {
    /// Sound file name (without extension).
    pub file_name: String,
    pub is_selected: bool,
    /// Volume (0.0 to 1.0).
    pub volume: f32,
}

impl PresetSoundState {
    /// Capture the live state of a sound.
    pub fn of(sound: &Sound) -> Self {
        Self {
            file_name: sound.file_name().to_string(),
            is_selected: sound.is_selected(),
            volume: sound.volume(),
        }
    }
}

/// A named mix: which sounds are selected and at what volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    /// Unique preset ID
    pub id: PresetId,
    /// Display name
    pub name: String,
    /// The default preset spans the whole catalog and cannot be deleted.
    pub is_default: bool,
    /// At most one entry per file name.
    pub sound_states: Vec<PresetSoundState>,
    /// Display order of sounds, by file name.
    #[serde(default)]
    pub sound_order: Option<Vec<String>>,
    #[serde(default)]
    pub creator_name: Option<String>,
    /// Reference to artwork stored elsewhere.
    #[serde(default)]
    pub artwork_id: Option<Uuid>,
    /// Bumped on every synchronized change.
    #[serde(default)]
    pub revision: u64,
    /// Unix seconds of the last change.
    #[serde(default)]
    pub modified_at: Option<u64>,
}

impl Preset {
    fn blank(name: impl Into<String>, is_default: bool) -> Self {
        Self {
            id: PresetId::new(),
            name: name.into(),
            is_default,
            sound_states: Vec::new(),
            sound_order: None,
            creator_name: None,
            artwork_id: None,
            revision: 0,
            modified_at: Some(unix_now()),
        }
    }

    /// The default preset: every catalog sound, in catalog order.
    pub fn default_for(catalog: &SoundCatalog) -> Self {
        let mut preset = Self::blank(DEFAULT_PRESET_NAME, true);
        preset.sound_states = catalog.iter().map(PresetSoundState::of).collect();
        preset.sound_order = Some(catalog.ordered_file_names());
        preset
    }

    /// A custom preset containing the currently selected sounds.
    pub fn from_selection(name: impl Into<String>, catalog: &SoundCatalog) -> Self {
        let mut preset = Self::blank(name, false);
        preset.sound_states = catalog
            .ordered()
            .into_iter()
            .filter(|s| s.is_selected())
            .map(PresetSoundState::of)
            .collect();
        preset
    }

    /// A custom preset containing the named sounds at their live state.
    pub fn with_sounds(
        name: impl Into<String>,
        catalog: &SoundCatalog,
        file_names: &[&str],
    ) -> Result<Self> {
        let mut preset = Self::blank(name, false);
        for file_name in file_names {
            let sound = catalog
                .by_file_name(file_name)
                .ok_or_else(|| AmbimixError::NotFound(format!("sound '{file_name}'")))?;
            if !preset.contains(file_name) {
                preset.sound_states.push(PresetSoundState::of(sound));
            }
        }
        Ok(preset)
    }

    /// Structural check run before a preset is stored or applied.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AmbimixError::InvalidPreset("preset name is empty".into()));
        }
        let mut seen = HashSet::new();
        for state in &self.sound_states {
            if !seen.insert(state.file_name.as_str()) {
                return Err(AmbimixError::InvalidPreset(format!(
                    "'{}' lists '{}' more than once",
                    self.name, state.file_name
                )));
            }
            if !is_valid_volume(state.volume) {
                return Err(AmbimixError::InvalidPreset(format!(
                    "'{}' has volume {} for '{}'",
                    self.name, state.volume, state.file_name
                )));
            }
        }
        if let Some(order) = &self.sound_order {
            let mut seen = HashSet::new();
            if let Some(dup) = order.iter().find(|name| !seen.insert(name.as_str())) {
                return Err(AmbimixError::InvalidPreset(format!(
                    "'{}' orders '{}' more than once",
                    self.name, dup
                )));
            }
        }
        Ok(())
    }

    pub fn contains(&self, file_name: &str) -> bool {
        self.state(file_name).is_some()
    }

    pub fn state(&self, file_name: &str) -> Option<&PresetSoundState> {
        self.sound_states.iter().find(|s| s.file_name == file_name)
    }

    /// File names of the sounds this preset selects.
    pub fn selected_file_names(&self) -> Vec<&str> {
        self.sound_states
            .iter()
            .filter(|s| s.is_selected)
            .map(|s| s.file_name.as_str())
            .collect()
    }

    /// Drop a sound from the states and the order. Returns whether it was present.
    pub fn remove_sound(&mut self, file_name: &str) -> bool {
        let before = self.sound_states.len();
        self.sound_states.retain(|s| s.file_name != file_name);
        if let Some(order) = self.sound_order.as_mut() {
            order.retain(|name| name != file_name);
        }
        self.sound_states.len() != before
    }

    /// Record a modification.
    pub fn touch(&mut self) {
        self.revision += 1;
        self.modified_at = Some(unix_now());
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
