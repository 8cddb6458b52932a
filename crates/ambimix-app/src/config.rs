//! Application configuration with versioning and migration.

use ambimix_core::limits::MAX_SETTLE_DELAY_MS;
use ambimix_core::{AmbimixError, GlobalSettings, Result};
use ambimix_mixer::{QuickMixConfig, SessionOptions};
use ambimix_preset::DebounceWindows;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Current config schema version.
pub const CURRENT_VERSION: u32 = 1;

const APP_DIR: &str = "ambimix";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub settings: GlobalSettings,
    /// Presets and last-active record. Defaults to the platform data dir.
    pub data_dir: Option<PathBuf>,
    /// Built-in sound files. Defaults to `<data_dir>/sounds`.
    pub sounds_dir: Option<PathBuf>,
    pub quick_mix: QuickMixConfig,
    pub settle_delay_ms: u64,
    pub fade_ms: u64,
    pub debounce: DebounceWindows,
    /// Read `<file>.loudness.json` sidecars for normalization.
    pub analyze_loudness: bool,
    /// Filter used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            settings: GlobalSettings::default(),
            data_dir: None,
            sounds_dir: None,
            quick_mix: QuickMixConfig::default(),
            settle_delay_ms: 150,
            fade_ms: 400,
            debounce: DebounceWindows::default(),
            analyze_loudness: true,
            log_level: "info".into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ConfigFile {
    version: u32,
    config: AppConfig,
    app_version: String,
}

impl AppConfig {
    /// `<config dir>/ambimix/config.json`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.json"))
    }

    /// Load from `path`, or return defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let data = std::fs::read(path)?;
        let config = Self::from_json(&data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(data: &[u8]) -> Result<Self> {
        let raw: serde_json::Value = serde_json::from_slice(data)
            .map_err(|e| AmbimixError::Serialization(format!("Invalid JSON: {e}")))?;
        let version = raw.get("version").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
        if version > CURRENT_VERSION {
            return Err(AmbimixError::Serialization(format!(
                "Config version {version} is newer than supported version {CURRENT_VERSION}"
            )));
        }
        let migrated = migrate(raw, version)?;
        let file: ConfigFile = serde_json::from_value(migrated)
            .map_err(|e| AmbimixError::Serialization(format!("Failed to parse config: {e}")))?;
        Ok(file.config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = ConfigFile {
            version: CURRENT_VERSION,
            config: self.clone(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
        };
        let json = serde_json::to_vec_pretty(&file)
            .map_err(|e| AmbimixError::Serialization(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.settings.validate()?;
        self.quick_mix.validate()?;
        if self.settle_delay_ms > MAX_SETTLE_DELAY_MS {
            warn!(
                requested = self.settle_delay_ms,
                max = MAX_SETTLE_DELAY_MS,
                "Settle delay will be clamped"
            );
        }
        Ok(())
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR)
        })
    }

    pub fn sounds_dir(&self) -> PathBuf {
        self.sounds_dir
            .clone()
            .unwrap_or_else(|| self.data_dir().join("sounds"))
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms.min(MAX_SETTLE_DELAY_MS))
    }

    pub fn fade_duration(&self) -> Duration {
        Duration::from_millis(self.fade_ms)
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            quick_mix: self.quick_mix.clone(),
            settle_delay: self.settle_delay(),
            debounce: self.debounce,
        }
    }
}

fn migrate(mut data: serde_json::Value, from_version: u32) -> Result<serde_json::Value> {
    let mut version = from_version;

    while version < CURRENT_VERSION {
        match version {
            0 => {
                // v0 was the bare config object
                if data.get("config").is_none() {
                    data = serde_json::json!({
                        "version": 1,
                        "config": data,
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
