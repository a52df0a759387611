//! Persistent settings.
//!
//! Preferences, camera tuning and keybindings are stored as JSON: in the
//! platform config directory on native and in localStorage on the web.
//! Annotations are never persisted.

use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::constants::label;
use crate::export::ExportFormat;
use crate::keybindings::KeyBindings;
use crate::viewport::CameraSettings;

/// Verbosity stored in the config; `RUST_LOG` still overrides it on native.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn level(self) -> log::Level {
        match self {
            Self::Error => log::Level::Error,
            Self::Warn => log::Level::Warn,
            Self::Info => log::Level::Info,
            Self::Debug => log::Level::Debug,
            Self::Trace => log::Level::Trace,
        }
    }
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        level.level().to_level_filter()
    }
}

/// Bumped whenever a stored config can no longer be read by older builds.
pub const CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub version: u32,

    #[serde(default)]
    pub preferences: UserPreferences,

    #[serde(default)]
    pub camera: CameraSettings,

    #[serde(default)]
    pub keybindings: KeyBindings,
}

/// Editor defaults restored at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPreferences {
    pub label_color: Rgb,
    pub arrow_color: Rgb,
    /// Last format picked in the export menu
    pub export_format: ExportFormat,
    /// Pixel size the label glyphs are rasterised at
    pub label_font_size: f32,
    pub log_level: LogLevel,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            label_color: Rgb::WHITE,
            arrow_color: Rgb::RED,
            export_format: ExportFormat::Png,
            label_font_size: label::FONT_SIZE,
            log_level: LogLevel::Info,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            preferences: UserPreferences::default(),
            camera: CameraSettings::default(),
            keybindings: KeyBindings::default(),
        }
    }
}

impl AppConfig {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parses a stored config, refusing ones written by a newer build.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        if config.version > CONFIG_VERSION {
            return Err(ConfigError::UnsupportedVersion {
                found: config.version,
                supported: CONFIG_VERSION,
            });
        }
        Ok(config)
    }

    /// Parses `json` read from `origin`, logging instead of failing.
    fn decode_stored(json: &str, origin: &str) -> Option<Self> {
        match Self::from_json(json) {
            Ok(config) => {
                log::info!("Loaded configuration from {}", origin);
                Some(config)
            }
            Err(err) => {
                log::warn!("Ignoring configuration in {}: {}", origin, err);
                None
            }
        }
    }

    /// `<config dir>/panomark/config.json`, or None without a home directory.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn default_path() -> Option<std::path::PathBuf> {
        let base = dirs::config_dir().or_else(|| dirs::home_dir().map(|home| home.join(".config")))?;
        Some(base.join("panomark").join("config.json"))
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_default_path() -> Option<Self> {
        let path = Self::default_path()?;
        match std::fs::read_to_string(&path) {
            Ok(json) => Self::decode_stored(&json, &path.display().to_string()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No configuration at {}", path.display());
                None
            }
            Err(err) => {
                log::warn!("Could not read {}: {}", path.display(), err);
                None
            }
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save_to_default_path(&self) -> Result<(), ConfigError> {
        let path = Self::default_path().ok_or(ConfigError::NoConfigDir)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, self.to_json()?)?;
        log::info!("Saved configuration to {}", path.display());
        Ok(())
    }

    #[cfg(target_arch = "wasm32")]
    const STORAGE_KEY: &'static str = "panomark-config";

    #[cfg(target_arch = "wasm32")]
    fn local_storage() -> Result<web_sys::Storage, ConfigError> {
        web_sys::window()
            .ok_or_else(|| ConfigError::Storage("no window".to_string()))?
            .local_storage()
            .map_err(|err| ConfigError::Storage(format!("{:?}", err)))?
            .ok_or_else(|| ConfigError::Storage("localStorage is disabled".to_string()))
    }

    #[cfg(target_arch = "wasm32")]
    pub fn load_from_local_storage() -> Option<Self> {
        let stored = Self::local_storage()
            .and_then(|storage| {
                storage
                    .get_item(Self::STORAGE_KEY)
                    .map_err(|err| ConfigError::Storage(format!("{:?}", err)))
            });
        match stored {
            Ok(Some(json)) => Self::decode_stored(&json, "localStorage"),
            Ok(None) => None,
            Err(err) => {
                log::warn!("{}", err);
                None
            }
        }
    }

    #[cfg(target_arch = "wasm32")]
    pub fn save_to_local_storage(&self) -> Result<(), ConfigError> {
        Self::local_storage()?
            .set_item(Self::STORAGE_KEY, &self.to_json()?)
            .map_err(|err| ConfigError::Storage(format!("{:?}", err)))?;
        log::debug!("Saved configuration to localStorage");
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Configuration version {found} is newer than the supported {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("No configuration directory on this system")]
    NoConfigDir,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Web only
    #[error("localStorage error: {0}")]
    Storage(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_editor_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.version, CONFIG_VERSION);
        assert_eq!(config.preferences.label_color, Rgb::WHITE);
        assert_eq!(config.preferences.arrow_color, Rgb::RED);
        assert_eq!(config.camera, CameraSettings::default());
    }

    #[test]
    fn test_json_round_trip() {
        let mut config = AppConfig::default();
        config.preferences.export_format = ExportFormat::Jpeg;
        config.preferences.label_color = Rgb::new(0x12, 0x34, 0x56);
        let parsed = AppConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(parsed, config);
        assert!(config.to_json().unwrap().contains("\"#123456\""));
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = AppConfig::from_json(r#"{"version":1,"preferences":{"log_level":"debug"}}"#).unwrap();
        assert_eq!(config.preferences.log_level, LogLevel::Debug);
        assert_eq!(config.preferences.arrow_color, Rgb::RED);
        assert_eq!(config.keybindings, KeyBindings::default());
    }

    #[test]
    fn test_log_level_maps_to_filter() {
        assert_eq!(log::LevelFilter::from(LogLevel::Warn), log::LevelFilter::Warn);
        assert_eq!(LogLevel::default().level(), log::Level::Info);
    }

    #[test]
    fn test_newer_version_rejected() {
        let result = AppConfig::from_json(r#"{"version":99}"#);
        assert!(matches!(
            result,
            Err(ConfigError::UnsupportedVersion { found: 99, .. })
        ));
    }

    #[test]
    fn test_invalid_color_is_parse_error() {
        let result = AppConfig::from_json(r#"{"version":1,"preferences":{"label_color":"blue"}}"#);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
