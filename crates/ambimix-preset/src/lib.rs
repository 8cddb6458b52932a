//! Ambimix Preset - Named mixes, their persistence and live synchronization.
//!
//! A [`PresetLibrary`] holds every preset and marks one active. The
//! [`PresetSynchronizer`] writes debounced live changes back to the active
//! preset and applies presets onto the catalog. Presets are stored through
//! the [`PresetStore`] trait as versioned JSON files.

pub mod debounce;
pub mod file;
pub mod library;
pub mod preset;
pub mod store;
pub mod sync;

pub use debounce::{ChangeSource, DebounceWindows, Debouncer};
pub use file::{PresetFile, CURRENT_VERSION};
pub use library::PresetLibrary;
pub use preset::{Preset, PresetSoundState, DEFAULT_PRESET_NAME};
pub use store::{JsonPresetStore, MemoryPresetStore, PresetStore};
pub use sync::{reconcile, ApplyReport, PresetSynchronizer, SyncOutcome};
