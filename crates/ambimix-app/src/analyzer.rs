//! Loudness from JSON sidecar files written by an offline measuring tool.
//!
//! Format (`<sound file>.loudness.json`):
//! ```text
//! { "lufs": -23.5, "true_peak_db": -1.2 }
//! ```

use ambimix_audio::{normalization_factor_from_lufs, SOFT_LIMIT_THRESHOLD};
use ambimix_core::{AmbimixError, LoudnessAnalysis, LoudnessAnalyzer, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct Sidecar {
    lufs: f32,
    #[serde(default)]
    true_peak_db: Option<f32>,
}

#[derive(Debug, Default)]
pub struct SidecarAnalyzer;

impl SidecarAnalyzer {
    pub fn sidecar_path(audio: &Path) -> PathBuf {
        let mut name = audio.as_os_str().to_os_string();
        name.push(".loudness.json");
        PathBuf::from(name)
    }
}

impl LoudnessAnalyzer for SidecarAnalyzer {
    fn analyze(&self, path: &Path) -> Result<LoudnessAnalysis> {
        let sidecar = Self::sidecar_path(path);
        let data = std::fs::read(&sidecar).map_err(|e| {
            AmbimixError::ResourceUnavailable(format!("{}: {e}", sidecar.display()))
        })?;
        let parsed: Sidecar = serde_json::from_slice(&data)
            .map_err(|e| AmbimixError::Serialization(format!("{}: {e}", sidecar.display())))?;
        if !parsed.lufs.is_finite() {
            return Err(AmbimixError::Validation(format!(
                "{}: loudness is not a number",
                sidecar.display()
            )));
        }

        let factor = normalization_factor_from_lufs(parsed.lufs);
        // Peaks pushed past the limiter threshold by normalization need limiting
        let needs_limiter = parsed
            .true_peak_db
            .map(|db| 10f32.powf(db / 20.0) * factor > SOFT_LIMIT_THRESHOLD)
            .unwrap_or(factor > 1.0);

        Ok(LoudnessAnalysis {
            lufs: parsed.lufs,
            normalization_factor: factor,
            needs_limiter,
        })
    }
}
