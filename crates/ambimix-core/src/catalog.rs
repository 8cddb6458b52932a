//! The sound catalog: sole owner of every `Sound`.
//!
//! Other components refer to sounds by [`SoundId`] and may mutate the
//! fields of existing sounds, but only the catalog adds or removes them.

use crate::error::{AmbimixError, Result};
use crate::id::SoundId;
use crate::sound::{Sound, SoundSource};
use std::path::PathBuf;
use tracing::{debug, info};

/// Ordered collection of sounds.
#[derive(Debug, Clone, Default)]
pub struct SoundCatalog {
    sounds: Vec<Sound>,
    next_id: u64,
}

impl SoundCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> SoundId {
        let id = SoundId::from_raw(self.next_id);
        self.next_id += 1;
        id
    }

    /// Register a built-in sound.
    pub fn add_builtin(
        &mut self,
        title: impl Into<String>,
        file_name: impl Into<String>,
        file_extension: impl Into<String>,
        category: impl Into<String>,
    ) -> Result<SoundId> {
        let file_name = file_name.into();
        self.ensure_unique(&file_name)?;
        let id = self.allocate_id();
        let order = self.sounds.len();
        self.sounds.push(Sound::new(
            id,
            title,
            file_name,
            file_extension,
            SoundSource::Builtin {
                category: category.into(),
            },
            order,
        ));
        Ok(id)
    }

    /// Register a user-imported sound.
    pub fn import_custom(
        &mut self,
        title: impl Into<String>,
        file_name: impl Into<String>,
        file_path: impl Into<PathBuf>,
    ) -> Result<SoundId> {
        let file_name = file_name.into();
        self.ensure_unique(&file_name)?;
        let file_path = file_path.into();
        let extension = file_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_string();
        let original_file_name = file_path
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|stem| *stem != file_name)
            .map(str::to_string);

        let id = self.allocate_id();
        let order = self.sounds.len();
        self.sounds.push(Sound::new(
            id,
            title,
            file_name.clone(),
            extension,
            SoundSource::Custom {
                file_path,
                original_file_name,
            },
            order,
        ));
        info!(sound = %id, file = %file_name, "Imported custom sound");
        Ok(id)
    }

    /// Remove a custom sound. Built-in sounds can only be hidden.
    pub fn remove_custom(&mut self, id: SoundId) -> Result<Sound> {
        let index = self
            .index_of(id)
            .ok_or_else(|| AmbimixError::NotFound(format!("{id}")))?;
        if !self.sounds[index].is_custom() {
            return Err(AmbimixError::Validation(format!(
                "'{}' is built in and cannot be deleted",
                self.sounds[index].file_name()
            )));
        }
        let removed = self.sounds.remove(index);
        self.renumber_after_removal();
        info!(sound = %id, file = %removed.file_name(), "Removed custom sound");
        Ok(removed)
    }

    fn ensure_unique(&self, file_name: &str) -> Result<()> {
        if file_name.trim().is_empty() {
            return Err(AmbimixError::Validation("sound file name is empty".into()));
        }
        if self.by_file_name(file_name).is_some() {
            return Err(AmbimixError::Validation(format!(
                "a sound named '{file_name}' already exists"
            )));
        }
        Ok(())
    }

    fn index_of(&self, id: SoundId) -> Option<usize> {
        self.sounds.iter().position(|s| s.id() == id)
    }

    pub fn get(&self, id: SoundId) -> Option<&Sound> {
        self.sounds.iter().find(|s| s.id() == id)
    }

    pub fn get_mut(&mut self, id: SoundId) -> Option<&mut Sound> {
        self.sounds.iter_mut().find(|s| s.id() == id)
    }

    /// Like `get`, but a missing sound is a `NotFound` error.
    pub fn require(&self, id: SoundId) -> Result<&Sound> {
        self.get(id)
            .ok_or_else(|| AmbimixError::NotFound(format!("{id}")))
    }

    pub fn require_mut(&mut self, id: SoundId) -> Result<&mut Sound> {
        self.get_mut(id)
            .ok_or_else(|| AmbimixError::NotFound(format!("{id}")))
    }

    pub fn by_file_name(&self, file_name: &str) -> Option<&Sound> {
        self.sounds.iter().find(|s| s.file_name() == file_name)
    }

    pub fn by_file_name_mut(&mut self, file_name: &str) -> Option<&mut Sound> {
        self.sounds.iter_mut().find(|s| s.file_name() == file_name)
    }

    pub fn contains(&self, id: SoundId) -> bool {
        self.index_of(id).is_some()
    }

    /// Sounds in insertion (default) order.
    pub fn iter(&self) -> impl Iterator<Item = &Sound> {
        self.sounds.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Sound> {
        self.sounds.iter_mut()
    }

    pub fn ids(&self) -> Vec<SoundId> {
        self.sounds.iter().map(Sound::id).collect()
    }

    /// Ids of all currently selected sounds.
    pub fn selected_ids(&self) -> Vec<SoundId> {
        self.sounds
            .iter()
            .filter(|s| s.is_selected())
            .map(Sound::id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sounds.is_empty()
    }

    /// Sounds sorted by their user-visible order.
    pub fn ordered(&self) -> Vec<&Sound> {
        let mut sorted: Vec<&Sound> = self.sounds.iter().collect();
        sorted.sort_by_key(|s| (s.custom_order(), s.default_order()));
        sorted
    }

    /// File names in user-visible order.
    pub fn ordered_file_names(&self) -> Vec<String> {
        self.ordered()
            .into_iter()
            .map(|s| s.file_name().to_string())
            .collect()
    }

    /// Visible sounds in user-visible order.
    pub fn visible(&self) -> Vec<&Sound> {
        self.ordered().into_iter().filter(|s| !s.is_hidden()).collect()
    }

    /// Move a sound to `to_index` within the user-visible order.
    pub fn move_sound(&mut self, id: SoundId, to_index: usize) -> Result<()> {
        let mut order: Vec<SoundId> = self.ordered().iter().map(|s| s.id()).collect();
        let from = order
            .iter()
            .position(|&sid| sid == id)
            .ok_or_else(|| AmbimixError::NotFound(format!("{id}")))?;
        let moved = order.remove(from);
        let to = to_index.min(order.len());
        order.insert(to, moved);
        self.assign_order(&order);
        debug!(sound = %id, from, to, "Moved sound");
        Ok(())
    }

    /// Apply an ordering expressed as file names. Names not in the catalog
    /// are ignored; sounds not named keep their relative order at the end.
    pub fn apply_order(&mut self, file_names: &[String]) {
        let mut order: Vec<SoundId> = file_names
            .iter()
            .filter_map(|name| self.by_file_name(name).map(Sound::id))
            .collect();
        order.dedup();
        let rest: Vec<SoundId> = self
            .ordered()
            .iter()
            .map(|s| s.id())
            .filter(|id| !order.contains(id))
            .collect();
        order.extend(rest);
        self.assign_order(&order);
    }

    /// Restore the shipped ordering.
    pub fn reset_order(&mut self) {
        for sound in &mut self.sounds {
            let default = sound.default_order();
            sound.set_custom_order(default);
        }
    }

    fn assign_order(&mut self, order: &[SoundId]) {
        for (position, id) in order.iter().enumerate() {
            if let Some(sound) = self.get_mut(*id) {
                sound.set_custom_order(position);
            }
        }
    }

    fn renumber_after_removal(&mut self) {
        let order: Vec<SoundId> = self.ordered().iter().map(|s| s.id()).collect();
        self.assign_order(&order);
    }
}
