use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::expression::domain::mood_reducer::FaceSelection;
use crate::shared::constants::{
    APP_DIR_NAME, DEFAULT_CONFIDENCE, POLL_INTERVAL_MS, VIDEO_HEIGHT, VIDEO_WIDTH,
};

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read settings from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid setting: {0}")]
    Invalid(String),
}

/// Runtime configuration, stored as JSON. Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub poll_interval_ms: u64,
    pub video_width: u32,
    pub video_height: u32,
    pub confidence: f64,
    pub face_selection: FaceSelection,
    /// Replaces the default download location of every model asset.
    pub model_base_url: Option<String>,
    pub bundled_model_dir: Option<PathBuf>,
    pub camera_device: String,
    /// ffmpeg input format (`v4l2`, `avfoundation`, `dshow`). `None` opens
    /// `camera_device` as a plain ffmpeg input such as a file or URL.
    pub camera_format: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            poll_interval_ms: POLL_INTERVAL_MS,
            video_width: VIDEO_WIDTH,
            video_height: VIDEO_HEIGHT,
            confidence: DEFAULT_CONFIDENCE,
            face_selection: FaceSelection::First,
            model_base_url: None,
            bundled_model_dir: None,
            camera_device: default_camera_device().to_string(),
            camera_format: Some(default_camera_format().to_string()),
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("settings.json"))
    }

    /// Loads the user settings file, falling back to defaults when it is
    /// missing or unreadable.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        Self::load_from(&path).unwrap_or_else(|e| {
            log::warn!("Ignoring settings file: {e}");
            Self::default()
        })
    }

    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let json = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.poll_interval_ms == 0 {
            return Err(SettingsError::Invalid(
                "poll_interval_ms must be greater than 0".into(),
            ));
        }
        if self.video_width == 0 || self.video_height == 0 {
            return Err(SettingsError::Invalid(format!(
                "video size must be non-zero, got {}x{}",
                self.video_width, self.video_height
            )));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(SettingsError::Invalid(format!(
                "confidence must be between 0.0 and 1.0, got {}",
                self.confidence
            )));
        }
        if self.camera_device.is_empty() {
            return Err(SettingsError::Invalid("camera_device is empty".into()));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

pub fn default_camera_format() -> &'static str {
    if cfg!(target_os = "macos") {
        "avfoundation"
    } else if cfg!(target_os = "windows") {
        "dshow"
    } else {
        "v4l2"
    }
}

pub fn default_camera_device() -> &'static str {
    if cfg!(target_os = "macos") {
        "0"
    } else if cfg!(target_os = "windows") {
        "video=Integrated Camera"
    } else {
        "/dev/video0"
    }
}
