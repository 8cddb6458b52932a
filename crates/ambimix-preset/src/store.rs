//! Preset persistence.
//!
//! Layout of the JSON store:
//! ```text
//! data_dir/
//!   presets/
//!     {preset-uuid}.json    # versioned PresetFile
//!   last_active.json        # { "preset_id": "..." }
//! ```

use ambimix_core::{AmbimixError, PresetId, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::file::PresetFile;
use crate::preset::Preset;

/// Storage collaborator for presets and the last-active preset id.
pub trait PresetStore: Send {
    fn load_presets(&self) -> Result<Vec<Preset>>;
    fn save_preset(&mut self, preset: &Preset) -> Result<()>;
    fn delete_preset(&mut self, id: PresetId) -> Result<()>;
    fn load_last_active_preset_id(&self) -> Result<Option<PresetId>>;
    fn save_last_active_preset_id(&mut self, id: PresetId) -> Result<()>;
}

#[derive(Debug, Serialize, Deserialize)]
struct LastActive {
    preset_id: PresetId,
}

/// One JSON file per preset under a data directory.
pub struct JsonPresetStore {
    root: PathBuf,
}

impl JsonPresetStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            root: data_dir.to_path_buf(),
        }
    }

    fn presets_dir(&self) -> PathBuf {
        self.root.join("presets")
    }

    fn preset_path(&self, id: PresetId) -> PathBuf {
        self.presets_dir().join(format!("{id}.json"))
    }

    fn last_active_path(&self) -> PathBuf {
        self.root.join("last_active.json")
    }

    fn ensure_dir(&self) -> Result<()> {
        std::fs::create_dir_all(self.presets_dir())?;
        Ok(())
    }
}

impl PresetStore for JsonPresetStore {
    /// Unreadable files are skipped with a warning so one bad preset does not
    /// hide the rest.
    fn load_presets(&self) -> Result<Vec<Preset>> {
        let dir = self.presets_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut presets = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match PresetFile::load_from_file(&path) {
                Ok(file) => presets.push(file.preset),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable preset"),
            }
        }
        presets.sort_by(|a, b| b.is_default.cmp(&a.is_default).then(a.name.cmp(&b.name)));
        debug!(count = presets.len(), "Loaded presets");
        Ok(presets)
    }

    fn save_preset(&mut self, preset: &Preset) -> Result<()> {
        self.ensure_dir()?;
        PresetFile::new(preset.clone())
            .save_to_file(&self.preset_path(preset.id))
            .map_err(|e| AmbimixError::Persistence(format!("saving '{}': {e}", preset.name)))
    }

    fn delete_preset(&mut self, id: PresetId) -> Result<()> {
        let path = self.preset_path(id);
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        Ok(())
    }

    fn load_last_active_preset_id(&self) -> Result<Option<PresetId>> {
        let path = self.last_active_path();
        if !path.exists() {
            return Ok(None);
        }
        let data = std::fs::read(&path)?;
        match serde_json::from_slice::<LastActive>(&data) {
            Ok(last) => Ok(Some(last.preset_id)),
            Err(e) => {
                warn!(error = %e, "Ignoring corrupt last-active record");
                Ok(None)
            }
        }
    }

    fn save_last_active_preset_id(&mut self, id: PresetId) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        let json = serde_json::to_vec_pretty(&LastActive { preset_id: id })
            .map_err(|e| AmbimixError::Serialization(e.to_string()))?;
        std::fs::write(self.last_active_path(), json)?;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    presets: HashMap<PresetId, Preset>,
    last_active: Option<PresetId>,
    saves: usize,
    fail_saves: bool,
}

/// In-memory store. Clones share state, so a test can keep one handle for
/// inspection while the library owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryPresetStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryPresetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a preset without counting it as a save.
    pub fn insert(&self, preset: Preset) {
        self.state.lock().presets.insert(preset.id, preset);
    }

    pub fn get(&self, id: PresetId) -> Option<Preset> {
        self.state.lock().presets.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.lock().presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of successful `save_preset` calls.
    pub fn save_count(&self) -> usize {
        self.state.lock().saves
    }

    pub fn last_active(&self) -> Option<PresetId> {
        self.state.lock().last_active
    }

    /// Make every following `save_preset` fail until switched off again.
    pub fn set_failing(&self, failing: bool) {
        self.state.lock().fail_saves = failing;
    }
}

impl PresetStore for MemoryPresetStore {
    fn load_presets(&self) -> Result<Vec<Preset>> {
        let mut presets: Vec<Preset> = self.state.lock().presets.values().cloned().collect();
        presets.sort_by(|a, b| b.is_default.cmp(&a.is_default).then(a.name.cmp(&b.name)));
        Ok(presets)
    }

    fn save_preset(&mut self, preset: &Preset) -> Result<()> {
        let mut state = self.state.lock();
        if state.fail_saves {
            return Err(AmbimixError::Persistence(format!(
                "store unavailable while saving '{}'",
                preset.name
            )));
        }
        state.presets.insert(preset.id, preset.clone());
        state.saves += 1;
        Ok(())
    }

    fn delete_preset(&mut self, id: PresetId) -> Result<()> {
        self.state.lock().presets.remove(&id);
        Ok(())
    }

    fn load_last_active_preset_id(&self) -> Result<Option<PresetId>> {
        Ok(self.state.lock().last_active)
    }

    fn save_last_active_preset_id(&mut self, id: PresetId) -> Result<()> {
        self.state.lock().last_active = Some(id);
        Ok(())
    }
}
