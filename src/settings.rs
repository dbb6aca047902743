//! Tool settings with persistence
//!
//! Settings are read from `~/.config/ttrpg-logistics/settings.toml`

use std::fs;
use std::path::{Path, PathBuf};

use logistics_placement::PlacementConfig;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// All tool settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub placement: PlacementConfig,
    pub logging: LoggingSettings,
    pub storage: StorageSettings,
}

impl Settings {
    /// Get the config directory path
    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("ttrpg-logistics"))
    }

    /// Get the settings file path
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("settings.toml"))
    }

    /// Load settings from `path`, or the default location when `None`.
    /// Missing or invalid files fall back to defaults.
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path.map(Path::to_path_buf).or_else(Self::settings_path) else {
            warn!("Could not determine config directory");
            return Self::default();
        };

        if !path.exists() {
            info!("No settings file found, using defaults");
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => match Self::parse(&content) {
                Ok(settings) => {
                    info!("Loaded settings from {:?}", path);
                    settings
                }
                Err(e) => {
                    warn!("Failed to parse settings: {}, using defaults", e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read settings file: {}, using defaults", e);
                Self::default()
            }
        }
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Save settings to `path`, or the default location when `None`
    pub fn save(&self, path: Option<&Path>) -> anyhow::Result<()> {
        let Some(path) = path.map(Path::to_path_buf).or_else(Self::settings_path) else {
            anyhow::bail!("Could not determine config directory");
        };

        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            if !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        info!("Saved settings to {:?}", path);
        Ok(())
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter directive, overridden by `RUST_LOG`
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Storage settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// World save file; the user data directory when unset
    pub save_file: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use logistics_core::{ContainerId, EquipmentSlot};

    #[test]
    fn empty_file_gives_defaults() {
        let settings = Settings::parse("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.logging.level, "info");
        assert_eq!(settings.placement.equipment_slots.len(), 7);
    }

    #[test]
    fn sections_override_defaults() {
        let settings = Settings::parse(
            r#"
            [placement]
            equipment_slots = ["main_hand", "belt"]
            default_container = 3

            [logging]
            level = "debug"

            [storage]
            save_file = "/tmp/world.json"
            "#,
        )
        .unwrap();
        assert_eq!(
            settings.placement.equipment_slots,
            vec![EquipmentSlot::MainHand, EquipmentSlot::Belt]
        );
        assert_eq!(settings.placement.default_container, ContainerId(3));
        assert_eq!(settings.logging.level, "debug");
        assert_eq!(settings.storage.save_file, Some(PathBuf::from("/tmp/world.json")));
    }

    #[test]
    fn unknown_slot_key_fails_to_parse() {
        assert!(Settings::parse("[placement]\nequipment_slots = [\"tail\"]").is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let path = std::env::temp_dir().join("ttrpg-logistics-no-such-settings.toml");
        assert_eq!(Settings::load(Some(path.as_path())), Settings::default());
    }

    #[test]
    fn save_writes_the_chosen_file() {
        let dir = std::env::temp_dir().join(format!("ttrpg-logistics-settings-{}", std::process::id()));
        let path = dir.join("custom.toml");
        let mut settings = Settings::default();
        settings.logging.level = "trace".to_string();

        settings.save(Some(path.as_path())).unwrap();
        assert_eq!(Settings::load(Some(path.as_path())), settings);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn settings_serialize_to_toml() {
        let content = toml::to_string_pretty(&Settings::default()).unwrap();
        assert!(content.contains("[placement]"));
        assert_eq!(Settings::parse(&content).unwrap(), Settings::default());
    }
}
