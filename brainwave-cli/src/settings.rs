//! Persistent application settings (JSON file in the data directory).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct AppSettings {
    pub preferred_input_device: Option<String>,
    /// Sample rate clips are analyzed at (Hz).
    pub analysis_sample_rate: u32,
    /// Fixed transcript seed; `None` means fresh entropy per run.
    pub transcript_seed: Option<u64>,
    pub history_enabled: bool,
    pub retention_days: usize,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            preferred_input_device: None,
            analysis_sample_rate: brainwave_core::DEFAULT_SAMPLE_RATE,
            transcript_seed: None,
            history_enabled: true,
            retention_days: 90,
        }
    }
}

impl AppSettings {
    pub fn normalize(&mut self) {
        self.analysis_sample_rate = self.analysis_sample_rate.clamp(8_000, 192_000);
        self.retention_days = self.retention_days.clamp(1, 3650);
        self.preferred_input_device = self
            .preferred_input_device
            .as_ref()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
    }
}

pub fn default_settings_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Brainwave Labs")
            .join("Brainwave")
            .join("settings.json")
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                std::env::var_os("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
                    .join(".local")
                    .join("share")
            })
            .join("brainwave")
            .join("settings.json")
    }
}

/// Missing or unreadable files fall back to defaults; corrupt files are
/// not an error either, so a bad edit never bricks the tool.
pub fn load_settings(path: &Path) -> AppSettings {
    let mut settings = fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str::<AppSettings>(&raw).ok())
        .unwrap_or_default();
    settings.normalize();
    settings
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings).map_err(std::io::Error::other)?;
    fs::write(path, json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings(&dir.path().join("nope.json"));
        assert_eq!(settings.analysis_sample_rate, 44_100);
        assert!(settings.history_enabled);
    }

    #[test]
    fn corrupt_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{not json").unwrap();
        let settings = load_settings(&path);
        assert_eq!(settings.retention_days, 90);
    }

    #[test]
    fn save_then_load_round_trips_and_normalizes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = AppSettings {
            preferred_input_device: Some("  USB Mic  ".into()),
            analysis_sample_rate: 1_000, // below the floor
            transcript_seed: Some(7),
            history_enabled: false,
            retention_days: 30,
        };
        save_settings(&path, &settings).unwrap();

        let loaded = load_settings(&path);
        assert_eq!(loaded.preferred_input_device.as_deref(), Some("USB Mic"));
        assert_eq!(loaded.analysis_sample_rate, 8_000);
        assert_eq!(loaded.transcript_seed, Some(7));
        assert!(!loaded.history_enabled);
    }
}
