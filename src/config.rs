/// Application configuration
///
/// An optional JSON file read once at startup. Missing keys fall back
/// to defaults; nothing is ever written back.
///
/// Location:
/// - Linux: ~/.config/imgcrush/config.json
/// - macOS: ~/Library/Application Support/imgcrush/config.json
/// - Windows: %APPDATA%\imgcrush\config.json

use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::ConfigError;
use crate::state::data::Quality;

/// Color scheme for the window
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThemeChoice {
    #[default]
    Dark,
    Light,
}

impl ThemeChoice {
    pub fn theme(self) -> iced::Theme {
        match self {
            ThemeChoice::Dark => iced::Theme::Dark,
            ThemeChoice::Light => iced::Theme::Light,
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Initial slider position (clamped to 0.1 ..= 1.0)
    pub default_quality: f32,
    pub theme: ThemeChoice,
    /// `tracing` filter directive, overridden by `RUST_LOG`
    pub log_filter: String,
    pub window_width: f32,
    pub window_height: f32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_quality: Quality::default().value(),
            theme: ThemeChoice::default(),
            log_filter: "imgcrush=info".to_string(),
            window_width: 1100.0,
            window_height: 720.0,
        }
    }
}

impl AppConfig {
    /// Load from the platform config directory, falling back to defaults
    ///
    /// Problems are returned alongside the defaults so they can be logged
    /// once tracing is up.
    pub fn load() -> (Self, Option<ConfigError>) {
        match Self::get_config_path() {
            Some(path) => match Self::from_path(&path) {
                Ok(config) => (config, None),
                Err(err) => (Self::default(), Some(err)),
            },
            None => (Self::default(), None),
        }
    }

    /// Read a config file; a missing file is not an error
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The configured quality, after clamping
    pub fn quality(&self) -> Quality {
        Quality::new(self.default_quality)
    }

    /// Window size with a floor so the three cards stay usable
    pub fn window_size(&self) -> iced::Size {
        let width = if self.window_width.is_finite() { self.window_width } else { 0.0 };
        let height = if self.window_height.is_finite() { self.window_height } else { 0.0 };
        if width < 480.0 || height < 360.0 {
            warn!("window size {}x{} too small, using minimum", width, height);
        }
        iced::Size::new(width.max(480.0), height.max(360.0))
    }

    fn get_config_path() -> Option<PathBuf> {
        let mut path = dirs::config_dir()?;
        path.push("imgcrush");
        path.push("config.json");
        Some(path)
    }
}
