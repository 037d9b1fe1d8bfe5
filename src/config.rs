//! TOML settings file living in the `.tracksnip` application directory.
//!
//! The first run writes a fully populated `config.toml` with the defaults
//! below, so users have a file to edit rather than a format to guess at.
//! Missing keys in an existing file fall back to the same defaults;
//! command-line flags override the loaded values for one invocation.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app_dirs::{self, AppDirError};

/// Name of the settings file inside the application directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Errors that can occur while loading or creating the settings file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The application directory could not be resolved or created.
    #[error("Unable to prepare config directory: {0}")]
    AppDir(#[from] AppDirError),
    /// The settings file exists but could not be read.
    #[error("Failed to read {path}: {source}")]
    Read {
        /// File that failed to read.
        path: PathBuf,
        /// Underlying filesystem error.
        source: std::io::Error,
    },
    /// The default settings file could not be written on first run.
    #[error("Failed to write {path}: {source}")]
    Write {
        /// File that failed to write.
        path: PathBuf,
        /// Underlying filesystem error.
        source: std::io::Error,
    },
    /// The settings file is not valid TOML for this schema.
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        /// File that failed to parse.
        path: PathBuf,
        /// Underlying parse error.
        source: toml::de::Error,
    },
    /// The default settings could not be serialized.
    #[error("Failed to serialize config for {path}: {source}")]
    SerializeToml {
        /// Destination the settings were being serialized for.
        path: PathBuf,
        /// Underlying serialize error.
        source: toml::ser::Error,
    },
}

/// Settings persisted in the TOML config file.
///
/// Config tables: `defaults`, `audio`, `io`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Settings {
    /// Selection and render timings.
    #[serde(default)]
    pub defaults: Defaults,
    /// Analysis tuning.
    #[serde(default)]
    pub audio: AudioSettings,
    /// Output naming.
    #[serde(default)]
    pub io: IoSettings,
}

/// Selection and render timings, all in seconds.
///
/// Config keys: `fade_in`, `fade_out`, `crop_start`, `crop_end`,
/// `thumbnail_length`, `prelude`.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Defaults {
    /// Fade-up time applied when rendering.
    #[serde(default = "default_fade_in")]
    pub fade_in: f64,
    /// Fade-down time applied when rendering.
    #[serde(default = "default_fade_out")]
    pub fade_out: f64,
    /// Seconds discarded from the track start before analysis.
    #[serde(default = "default_crop_start")]
    pub crop_start: f64,
    /// Seconds discarded from the track end before analysis.
    #[serde(default = "default_crop_end")]
    pub crop_end: f64,
    /// Thumbnail length.
    #[serde(default = "default_thumbnail_length")]
    pub thumbnail_length: f64,
    /// Lead-in included before the chosen segment's start.
    #[serde(default = "default_prelude")]
    pub prelude: f64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            fade_in: default_fade_in(),
            fade_out: default_fade_out(),
            crop_start: default_crop_start(),
            crop_end: default_crop_end(),
            thumbnail_length: default_thumbnail_length(),
            prelude: default_prelude(),
        }
    }
}

/// Analysis tuning.
///
/// Config keys: `rms_window_size`.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct AudioSettings {
    /// RMS window length in samples.
    #[serde(default = "default_rms_window_size")]
    pub rms_window_size: usize,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            rms_window_size: default_rms_window_size(),
        }
    }
}

/// Output naming.
///
/// Config keys: `output_append`.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct IoSettings {
    /// Suffix inserted before the extension of derived output names.
    #[serde(default = "default_output_append")]
    pub output_append: String,
}

impl Default for IoSettings {
    fn default() -> Self {
        Self {
            output_append: default_output_append(),
        }
    }
}

fn default_fade_in() -> f64 {
    0.5
}

fn default_fade_out() -> f64 {
    0.5
}

fn default_crop_start() -> f64 {
    7.0
}

fn default_crop_end() -> f64 {
    7.0
}

fn default_thumbnail_length() -> f64 {
    30.0
}

fn default_prelude() -> f64 {
    10.0
}

fn default_rms_window_size() -> usize {
    1024
}

fn default_output_append() -> String {
    "_thumb".to_string()
}

/// Resolve the configuration file path, ensuring the parent directory exists.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let dir = app_dirs::app_root_dir()?;
    Ok(dir.join(CONFIG_FILE_NAME))
}

/// Load settings from disk, writing a default file if none exists yet.
pub fn load_or_default() -> Result<Settings, ConfigError> {
    let path = config_path()?;
    if !path.exists() {
        let settings = Settings::default();
        save_to_path(&settings, &path)?;
        tracing::info!(path = %path.display(), "created default config file");
        return Ok(settings);
    }
    let settings = load_from_path(&path)?;
    tracing::debug!(path = %path.display(), "loaded config file");
    Ok(settings)
}

fn load_from_path(path: &Path) -> Result<Settings, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })
}

fn save_to_path(settings: &Settings, path: &Path) -> Result<(), ConfigError> {
    let data =
        toml::to_string_pretty(settings).map_err(|source| ConfigError::SerializeToml {
            path: path.to_path_buf(),
            source,
        })?;
    std::fs::write(path, data).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}
