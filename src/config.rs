use anyhow::{anyhow, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub user: UserSettings,
    pub delivery: DeliverySettings,
    /// Seed for the sample data generator; random when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub log_level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            user: UserSettings::default(),
            delivery: DeliverySettings::default(),
            seed: None,
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Default for UserSettings {
    fn default() -> Self {
        UserSettings {
            name: "John Doe".to_string(),
            email: Some("john.doe@example.com".to_string()),
        }
    }
}

/// Timing of the simulated delivery progression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliverySettings {
    pub sent_to_delivered_ms: u64,
    pub delivered_to_read_ms: u64,
    /// Probability in `[0, 1]` that a progression step fails instead.
    pub failure_rate: f64,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        DeliverySettings {
            sent_to_delivered_ms: 500,
            delivered_to_read_ms: 1000,
            failure_rate: 0.0,
        }
    }
}

pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| anyhow!("Could not determine config directory"))?
        .join("parley");
    Ok(config_dir)
}

pub fn default_settings_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join(SETTINGS_FILE))
}

/// Load settings from `path`, or from the per-user config directory.
///
/// A missing file yields the defaults; a malformed one is an error.
pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => match default_settings_path() {
            Ok(path) => path,
            Err(e) => {
                warn!("Using default settings: {}", e);
                return Ok(Settings::default());
            }
        },
    };

    if !path.exists() {
        info!("No settings at {}, using defaults", path.display());
        return Ok(Settings::default());
    }

    let contents = fs::read_to_string(&path)?;
    let settings: Settings = serde_json::from_str(&contents)
        .map_err(|e| anyhow!("Invalid settings file {}: {}", path.display(), e))?;
    if !(0.0..=1.0).contains(&settings.delivery.failure_rate) {
        return Err(anyhow!(
            "failure_rate must be between 0 and 1, got {}",
            settings.delivery.failure_rate
        ));
    }

    info!("Loaded settings from {}", path.display());
    Ok(settings)
}

pub fn save_settings(settings: &Settings, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, settings)?;

    info!("Settings saved to {}", path.display());
    Ok(())
}
