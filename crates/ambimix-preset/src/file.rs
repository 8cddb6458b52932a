//! Preset file format with versioning and migration.

use ambimix_core::{AmbimixError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::preset::Preset;

/// Current preset schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Versioned preset file wrapper.
#[derive(Debug, Serialize, Deserialize)]
pub struct PresetFile {
    pub version: u32,
    pub preset: Preset,
    /// Application version that wrote this file.
    pub app_version: String,
}

impl PresetFile {
    pub fn new(preset: Preset) -> Self {
        Self {
            version: CURRENT_VERSION,
            preset,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| AmbimixError::Serialization(format!("Failed to serialize preset: {e}")))
    }

    /// Deserialize, migrating older layouts first.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let raw: serde_json::Value = serde_json::from_slice(data)
            .map_err(|e| AmbimixError::Serialization(format!("Invalid JSON: {e}")))?;

        let version = raw.get("version").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
        if version > CURRENT_VERSION {
            return Err(AmbimixError::Serialization(format!(
                "Preset file version {version} is newer than supported version {CURRENT_VERSION}"
            )));
        }

        let migrated = migrate(raw, version)?;
        serde_json::from_value(migrated)
            .map_err(|e| AmbimixError::Serialization(format!("Failed to parse preset: {e}")))
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_json(&data)
    }
}

fn migrate(mut data: serde_json::Value, from_version: u32) -> Result<serde_json::Value> {
    let mut version = from_version;

    while version < CURRENT_VERSION {
        match version {
            0 => {
                // v0 files were a bare preset without the default flag
                if data.get("preset").is_none() {
                    if let Some(obj) = data.as_object_mut() {
                        obj.entry("is_default").or_insert(serde_json::Value::Bool(false));
                    }
                    data = serde_json::json!({
                        "version": 1,
                        "preset": data,
                        "app_version": "0.0.0",
                    });
                }
                version = 1;
            }
            _ => {
                return Err(AmbimixError::Serialization(format!(
                    "No migration path from version {version}"
                )));
            }
        }
    }

    Ok(data)
}
