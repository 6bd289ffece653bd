use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::capture::encoder::DEFAULT_JPEG_QUALITY;
use crate::typing::DEFAULT_INTERVAL_MS;

/// Overrides the settings file location.
pub const CONFIG_ENV: &str = "BHARATGPT_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Root of the chat and vision service.
    pub base_url: String,
    /// Shown as the assistant's name and used in export file names.
    pub app_name: String,
    /// Where chat and scan history live. Defaults to the platform data dir.
    pub data_dir: Option<PathBuf>,
    pub chat_key: String,
    pub scan_key: String,
    /// Sent with every scan as `userGoal`.
    pub user_goal: String,
    pub jpeg_quality: u8,
    pub typing_interval_ms: u64,
    /// Where exports are written. Defaults to the working directory.
    pub export_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: "https://kharabgpt-backend.onrender.com".into(),
            app_name: "BharatGPT".into(),
            data_dir: None,
            chat_key: "bharatGPT_chats".into(),
            scan_key: "forkai-scans".into(),
            user_goal: "weight loss".into(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            typing_interval_ms: DEFAULT_INTERVAL_MS,
            export_dir: None,
        }
    }
}

/// `$BHARATGPT_CONFIG`, else `<config dir>/bharatgpt/settings.toml`.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return PathBuf::from(path);
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bharatgpt")
        .join("settings.toml")
}

impl Settings {
    /// Load from [`config_path`]; a missing file yields defaults.
    pub fn load() -> Result<Self, SettingsError> {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            log::info!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        let content = toml::to_string_pretty(self)?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|source| SettingsError::Write {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, content).map_err(|source| SettingsError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Settings saved to {}", path.display());
        Ok(())
    }

    /// History directory, resolved against the platform data dir.
    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("bharatgpt")
        })
    }

    pub fn resolved_export_dir(&self) -> PathBuf {
        self.export_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}
