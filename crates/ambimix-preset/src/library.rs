//! The in-memory preset collection and its active selection.

use ambimix_core::{AmbimixError, PresetId, Result, SoundCatalog};
use std::collections::HashSet;
use tracing::{info, warn};

use crate::preset::Preset;
use crate::store::PresetStore;

/// All known presets. Exactly one is the default; at most one is active.
#[derive(Debug, Clone)]
pub struct PresetLibrary {
    presets: Vec<Preset>,
    default_id: PresetId,
    active: Option<PresetId>,
    /// Presets whose last save failed.
    unsaved: HashSet<PresetId>,
}

impl PresetLibrary {
    /// Load presets from the store, synthesizing the default preset if none
    /// exists, and pick the last active preset (falling back to the default).
    pub fn load(store: &mut dyn PresetStore, catalog: &SoundCatalog) -> Result<Self> {
        let mut presets = store.load_presets()?;
        let mut unsaved = HashSet::new();

        let mut default_id = None;
        for preset in &mut presets {
            if !preset.is_default {
                continue;
            }
            if default_id.is_none() {
                default_id = Some(preset.id);
            } else {
                warn!(preset = %preset.id, name = %preset.name, "Demoting extra default preset");
                preset.is_default = false;
                unsaved.insert(preset.id);
            }
        }

        let default_id = match default_id {
            Some(id) => id,
            None => {
                let preset = Preset::default_for(catalog);
                let id = preset.id;
                if let Err(e) = store.save_preset(&preset) {
                    warn!(error = %e, "Could not persist synthesized default preset");
                    unsaved.insert(id);
                }
                info!(preset = %id, "Created default preset");
                presets.insert(0, preset);
                id
            }
        };

        let active = match store.load_last_active_preset_id()? {
            Some(id) if presets.iter().any(|p| p.id == id) => id,
            Some(id) => {
                warn!(preset = %id, "Last active preset no longer exists");
                default_id
            }
            None => default_id,
        };

        Ok(Self {
            presets,
            default_id,
            active: Some(active),
            unsaved,
        })
    }

    pub fn presets(&self) -> &[Preset] {
        &self.presets
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    pub fn get(&self, id: PresetId) -> Option<&Preset> {
        self.presets.iter().find(|p| p.id == id)
    }

    pub fn require(&self, id: PresetId) -> Result<&Preset> {
        self.get(id)
            .ok_or_else(|| AmbimixError::NotFound(format!("preset {id}")))
    }

    /// Case-insensitive lookup by display name.
    pub fn find_by_name(&self, name: &str) -> Option<&Preset> {
        self.presets
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name.trim()))
    }

    pub fn default_id(&self) -> PresetId {
        self.default_id
    }

    pub fn active_id(&self) -> Option<PresetId> {
        self.active
    }

    pub fn active(&self) -> Option<&Preset> {
        self.active.and_then(|id| self.get(id))
    }

    /// Mark a preset active and remember it across restarts.
    pub fn set_active(&mut self, id: PresetId, store: &mut dyn PresetStore) -> Result<()> {
        self.require(id)?;
        self.active = Some(id);
        store.save_last_active_preset_id(id)
    }

    /// Drop the active marker without persisting. Returns the previous one.
    pub fn clear_active(&mut self) -> Option<PresetId> {
        self.active.take()
    }

    /// Reinstate a marker taken by `clear_active`. A preset deleted in the
    /// meantime falls back to the default.
    pub fn restore_active(&mut self, id: Option<PresetId>) {
        self.active = match id {
            Some(id) if self.get(id).is_some() => Some(id),
            Some(_) => Some(self.default_id),
            None => None,
        };
    }

    /// Add a new custom preset.
    pub fn create(&mut self, mut preset: Preset, store: &mut dyn PresetStore) -> Result<PresetId> {
        preset.is_default = false;
        preset.validate()?;
        if self.get(preset.id).is_some() {
            return Err(AmbimixError::InvalidPreset(format!(
                "preset {} already exists",
                preset.id
            )));
        }
        store.save_preset(&preset)?;
        let id = preset.id;
        info!(preset = %id, name = %preset.name, sounds = preset.sound_states.len(), "Created preset");
        self.presets.push(preset);
        Ok(id)
    }

    pub fn rename(
        &mut self,
        id: PresetId,
        name: &str,
        store: &mut dyn PresetStore,
    ) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AmbimixError::Validation("preset name is empty".into()));
        }
        let preset = self
            .presets
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| AmbimixError::NotFound(format!("preset {id}")))?;
        preset.name = name.to_string();
        preset.touch();
        self.save(id, store)
    }

    /// Delete a custom preset. Deleting the active preset activates the default.
    pub fn delete(&mut self, id: PresetId, store: &mut dyn PresetStore) -> Result<Preset> {
        let index = self
            .presets
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| AmbimixError::NotFound(format!("preset {id}")))?;
        if self.presets[index].is_default {
            return Err(AmbimixError::InvalidPreset(
                "the default preset cannot be deleted".into(),
            ));
        }
        store.delete_preset(id)?;
        let removed = self.presets.remove(index);
        self.unsaved.remove(&id);
        info!(preset = %id, name = %removed.name, "Deleted preset");
        if self.active == Some(id) {
            self.set_active(self.default_id, store)?;
        }
        Ok(removed)
    }

    /// Swap in a new version of an existing preset (same id).
    pub fn replace(&mut self, preset: Preset) -> Result<()> {
        let slot = self
            .presets
            .iter_mut()
            .find(|p| p.id == preset.id)
            .ok_or_else(|| AmbimixError::NotFound(format!("preset {}", preset.id)))?;
        *slot = preset;
        Ok(())
    }

    /// Persist one preset, tracking failures so a later write retries it.
    pub fn save(&mut self, id: PresetId, store: &mut dyn PresetStore) -> Result<()> {
        let preset = self.require(id)?;
        match store.save_preset(preset) {
            Ok(()) => {
                self.unsaved.remove(&id);
                Ok(())
            }
            Err(e) => {
                warn!(preset = %id, error = %e, "Preset save failed");
                self.unsaved.insert(id);
                Err(e)
            }
        }
    }

    pub fn is_unsaved(&self, id: PresetId) -> bool {
        self.unsaved.contains(&id)
    }

    /// Remove every reference to a sound. Returns how many presets changed.
    pub fn scrub_sound(&mut self, file_name: &str, store: &mut dyn PresetStore) -> Result<usize> {
        let touched: Vec<PresetId> = self
            .presets
            .iter_mut()
            .filter_map(|p| {
                if p.remove_sound(file_name) {
                    p.touch();
                    Some(p.id)
                } else {
                    None
                }
            })
            .collect();

        let mut first_error = None;
        for id in &touched {
            if let Err(e) = self.save(*id, store) {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(touched.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryPresetStore;

    fn catalog() -> SoundCatalog {
        let mut c = SoundCatalog::new();
        for name in ["rain", "waves", "fireplace"] {
            c.add_builtin(name, name, "m4a", "nature").unwrap();
        }
        c
    }

    #[test]
    fn test_load_synthesizes_default() {
        let handle = MemoryPresetStore::new();
        let mut store = handle.clone();
        let lib = PresetLibrary::load(&mut store, &catalog()).unwrap();
        assert_eq!(lib.len(), 1);
        assert_eq!(lib.active_id(), Some(lib.default_id()));
        assert!(handle.get(lib.default_id()).is_some());
    }

    #[test]
    fn test_load_restores_last_active() {
        let c = catalog();
        let handle = MemoryPresetStore::new();
        let beach = Preset::with_sounds("Beach", &c, &["waves"]).unwrap();
        handle.insert(Preset::default_for(&c));
        handle.insert(beach.clone());
        let mut store = handle.clone();
        store.save_last_active_preset_id(beach.id).unwrap();

        let lib = PresetLibrary::load(&mut store, &c).unwrap();
        assert_eq!(lib.len(), 2);
        assert_eq!(lib.active_id(), Some(beach.id));
    }

    #[test]
    fn test_load_demotes_extra_default() {
        let c = catalog();
        let handle = MemoryPresetStore::new();
        handle.insert(Preset::default_for(&c));
        handle.insert(Preset::default_for(&c));
        let mut store = handle.clone();
        let lib = PresetLibrary::load(&mut store, &c).unwrap();
        assert_eq!(lib.presets().iter().filter(|p| p.is_default).count(), 1);
    }

    #[test]
    fn test_delete_default_rejected() {
        let mut store = MemoryPresetStore::new();
        let mut lib = PresetLibrary::load(&mut store, &catalog()).unwrap();
        let err = lib.delete(lib.default_id(), &mut store).unwrap_err();
        assert!(matches!(err, AmbimixError::InvalidPreset(_)));
    }

    #[test]
    fn test_delete_active_falls_back_to_default() {
        let c = catalog();
        let handle = MemoryPresetStore::new();
        let mut store = handle.clone();
        let mut lib = PresetLibrary::load(&mut store, &c).unwrap();
        let id = lib
            .create(Preset::with_sounds("Beach", &c, &["waves"]).unwrap(), &mut store)
            .unwrap();
        lib.set_active(id, &mut store).unwrap();

        lib.delete(id, &mut store).unwrap();
        assert_eq!(lib.active_id(), Some(lib.default_id()));
        assert_eq!(handle.last_active(), Some(lib.default_id()));
        assert!(handle.get(id).is_none());
    }

    #[test]
    fn test_rename_validates_and_persists() {
        let c = catalog();
        let handle = MemoryPresetStore::new();
        let mut store = handle.clone();
        let mut lib = PresetLibrary::load(&mut store, &c).unwrap();
        let id = lib
            .create(Preset::with_sounds("Beach", &c, &["waves"]).unwrap(), &mut store)
            .unwrap();
        assert!(lib.rename(id, "  ", &mut store).is_err());
        lib.rename(id, "Shore", &mut store).unwrap();
        assert_eq!(handle.get(id).unwrap().name, "Shore");
        assert!(lib.find_by_name("shore").is_some());
    }

    #[test]
    fn test_clear_and_restore_active() {
        let c = catalog();
        let mut store = MemoryPresetStore::new();
        let mut lib = PresetLibrary::load(&mut store, &c).unwrap();
        let id = lib
            .create(Preset::with_sounds("Beach", &c, &["waves"]).unwrap(), &mut store)
            .unwrap();
        lib.set_active(id, &mut store).unwrap();

        let previous = lib.clear_active();
        assert_eq!(lib.active_id(), None);
        lib.restore_active(previous);
        assert_eq!(lib.active_id(), Some(id));

        lib.clear_active();
        lib.delete(id, &mut store).unwrap();
        lib.restore_active(Some(id));
        assert_eq!(lib.active_id(), Some(lib.default_id()));
    }

    #[test]
    fn test_scrub_sound_from_all_presets() {
        let c = catalog();
        let mut store = MemoryPresetStore::new();
        let mut lib = PresetLibrary::load(&mut store, &c).unwrap();
        lib.create(Preset::with_sounds("A", &c, &["rain", "waves"]).unwrap(), &mut store)
            .unwrap();
        lib.create(Preset::with_sounds("B", &c, &["fireplace"]).unwrap(), &mut store)
            .unwrap();

        let changed = lib.scrub_sound("rain", &mut store).unwrap();
        assert_eq!(changed, 2);
        assert!(lib.presets().iter().all(|p| !p.contains("rain")));
    }

    #[test]
    fn test_failed_save_marks_unsaved() {
        let c = catalog();
        let handle = MemoryPresetStore::new();
        let mut store = handle.clone();
        let mut lib = PresetLibrary::load(&mut store, &c).unwrap();
        let id = lib.default_id();
        handle.set_failing(true);
        assert!(lib.save(id, &mut store).is_err());
        assert!(lib.is_unsaved(id));
        handle.set_failing(false);
        lib.save(id, &mut store).unwrap();
        assert!(!lib.is_unsaved(id));
    }
}
