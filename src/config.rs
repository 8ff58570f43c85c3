//! Configuration file support.
//!
//! Settings live in a versioned JSON file: logging and export preferences,
//! the default augmentation setup and the initial class list.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::augment::AugmentationSpec;
use crate::color::DEFAULT_CLASS_COLOR;
use crate::error::ValidationError;
use crate::format::{CropMode, ExportFormat, ExportOptions, PolygonPolicy};
use crate::model::ClassRegistry;

/// Logging verbosity stored in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Errors only
    Error,
    /// Adds warnings, e.g. lossy polygon exports
    Warn,
    /// Adds export summaries
    #[default]
    Info,
    /// Adds per-image and per-shape detail
    Debug,
    /// Everything
    Trace,
}

impl LogLevel {
    /// Filter handed to the logger at startup.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Config file format version. Files with a newer version are rejected.
pub const CONFIG_VERSION: u32 = 1;

/// Tile edge length used when none is configured.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// File format version, see [`CONFIG_VERSION`]
    pub version: u32,

    /// Written for humans reading the file
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// User preferences
    #[serde(default)]
    pub preferences: UserPreferences,

    /// Augmentations applied when an export asks for them
    #[serde(default)]
    pub augmentation: AugmentationSpec,

    /// Classes a new session starts with, in registry order
    #[serde(default = "default_classes")]
    pub classes: Vec<ClassConfig>,
}

fn default_app_name() -> String {
    "regionmark".to_string()
}

fn default_classes() -> Vec<ClassConfig> {
    vec![ClassConfig {
        name: "Class 1".to_string(),
        color: DEFAULT_CLASS_COLOR.to_string(),
    }]
}

/// User preferences section of the config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreferences {
    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,

    #[serde(default)]
    pub export_format: ExportFormat,

    /// Output directory used when `export` gets no `--out`
    #[serde(default)]
    pub export_folder: String,

    #[serde(default)]
    pub polygon_policy: PolygonPolicy,

    /// Copy source images into the export
    #[serde(default)]
    pub write_images: bool,

    #[serde(default = "default_tile_size")]
    pub tile_size: u32,
}

fn default_tile_size() -> u32 {
    DEFAULT_TILE_SIZE
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            export_format: ExportFormat::default(),
            export_folder: String::new(),
            polygon_policy: PolygonPolicy::default(),
            write_images: false,
            tile_size: default_tile_size(),
        }
    }
}

/// Class entry for serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassConfig {
    /// Display name of the class
    pub name: String,
    /// Color as `#rrggbb`
    pub color: String,
}

impl AppConfig {
    /// Default configuration: one class, JSON export, no augmentation.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            app_name: default_app_name(),
            preferences: UserPreferences::default(),
            augmentation: AugmentationSpec::default(),
            classes: default_classes(),
        }
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse JSON, rejecting files from a newer version.
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let config: Self = serde_json::from_str(json)?;

        if config.version > CONFIG_VERSION {
            return Err(SettingsError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        Ok(config)
    }

    /// Build the class registry described by `classes`.
    pub fn to_registry(&self) -> Result<ClassRegistry, ValidationError> {
        let mut registry = ClassRegistry::new();
        for class in &self.classes {
            registry.add(&class.name, &class.color)?;
        }
        Ok(registry)
    }

    /// Export options from the preferences, without crops.
    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            polygon_policy: self.preferences.polygon_policy,
            write_images: self.preferences.write_images,
            crops: CropMode::None,
            augmentation: self.augmentation.clone(),
        }
    }

    /// Read a configuration file.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Write the configuration, creating parent directories if needed.
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get the default filename for the config file.
    pub fn default_filename() -> &'static str {
        "regionmark-config.json"
    }

    /// `regionmark/regionmark-config.json` under the user config directory.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn default_path() -> Option<PathBuf> {
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("regionmark").join(Self::default_filename()))
        } else {
            dirs::home_dir().map(|home_dir| {
                home_dir
                    .join(".config")
                    .join("regionmark")
                    .join(Self::default_filename())
            })
        }
    }

    #[cfg(target_arch = "wasm32")]
    pub fn default_path() -> Option<PathBuf> {
        None
    }

    /// Config from [`default_path`](Self::default_path), if present and valid.
    pub fn load_from_default_path() -> Option<Self> {
        let path = Self::default_path()?;
        if !path.exists() {
            log::debug!("No config file found at {:?}", path);
            return None;
        }

        match Self::load(&path) {
            Ok(config) => Some(config),
            Err(e) => {
                log::warn!("Failed to load config file {:?}: {}", path, e);
                None
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading or saving configuration.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// Malformed JSON or wrong field types
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Written by a newer regionmark
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
