//! Application configuration value object

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::error::InvalidBackendError;
use crate::domain::recording::Duration;

/// Default FFmpeg capture format
pub const DEFAULT_FFMPEG_INPUT_FORMAT: &str = "pulse";

/// Default FFmpeg capture device
pub const DEFAULT_FFMPEG_INPUT_DEVICE: &str = "default";

/// Recorder backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BackendKind {
    #[default]
    Cpal,
    Ffmpeg,
}

impl BackendKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cpal => "cpal",
            Self::Ffmpeg => "ffmpeg",
        }
    }
}

impl FromStr for BackendKind {
    type Err = InvalidBackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cpal" => Ok(Self::Cpal),
            "ffmpeg" => Ok(Self::Ffmpeg),
            _ => Err(InvalidBackendError {
                input: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// FFmpeg backend configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FfmpegConfig {
    pub input_format: Option<String>,
    pub input_device: Option<String>,
}

/// Application configuration.
/// All fields are optional to support partial configs and merging.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub backend: Option<String>,
    pub tick_interval: Option<String>,
    pub output_dir: Option<String>,
    pub notify: Option<bool>,
    pub ffmpeg: Option<FfmpegConfig>,
}

impl AppConfig {
    /// Create config with default values
    pub fn defaults() -> Self {
        Self {
            backend: Some(BackendKind::default().to_string()),
            tick_interval: Some(Duration::default_tick_interval().to_string()),
            output_dir: None,
            notify: Some(false),
            ffmpeg: Some(FfmpegConfig {
                input_format: Some(DEFAULT_FFMPEG_INPUT_FORMAT.to_string()),
                input_device: Some(DEFAULT_FFMPEG_INPUT_DEVICE.to_string()),
            }),
        }
    }

    /// Create an empty config (all None)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Merge this config with another, where other takes precedence.
    /// Only non-None values from other will override this.
    pub fn merge(self, other: Self) -> Self {
        Self {
            backend: other.backend.or(self.backend),
            tick_interval: other.tick_interval.or(self.tick_interval),
            output_dir: other.output_dir.or(self.output_dir),
            notify: other.notify.or(self.notify),
            ffmpeg: Self::merge_ffmpeg_config(self.ffmpeg, other.ffmpeg),
        }
    }

    /// Merge FFmpeg config sections
    fn merge_ffmpeg_config(
        base: Option<FfmpegConfig>,
        other: Option<FfmpegConfig>,
    ) -> Option<FfmpegConfig> {
        match (base, other) {
            (None, None) => None,
            (Some(b), None) => Some(b),
            (None, Some(o)) => Some(o),
            (Some(b), Some(o)) => Some(FfmpegConfig {
                input_format: o.input_format.or(b.input_format),
                input_device: o.input_device.or(b.input_device),
            }),
        }
    }

    /// Get backend as parsed BackendKind, or default if not set/invalid
    pub fn backend_or_default(&self) -> BackendKind {
        self.backend
            .as_ref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    /// Get tick interval as parsed Duration, or default if not set/invalid
    pub fn tick_interval_or_default(&self) -> Duration {
        self.tick_interval
            .as_ref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(Duration::default_tick_interval)
    }

    /// Get artifact directory, or the system temp dir if not set
    pub fn output_dir_or_default(&self) -> PathBuf {
        self.output_dir
            .as_ref()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir)
    }

    /// Get notify setting, or false if not set
    pub fn notify_or_default(&self) -> bool {
        self.notify.unwrap_or(false)
    }

    /// Get FFmpeg input format, or "pulse" if not set
    pub fn ffmpeg_input_format_or_default(&self) -> &str {
        self.ffmpeg
            .as_ref()
            .and_then(|f| f.input_format.as_deref())
            .unwrap_or(DEFAULT_FFMPEG_INPUT_FORMAT)
    }

    /// Get FFmpeg input device, or "default" if not set
    pub fn ffmpeg_input_device_or_default(&self) -> &str {
        self.ffmpeg
            .as_ref()
            .and_then(|f| f.input_device.as_deref())
            .unwrap_or(DEFAULT_FFMPEG_INPUT_DEVICE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_complete() {
        let config = AppConfig::defaults();
        assert_eq!(config.backend_or_default(), BackendKind::Cpal);
        assert_eq!(config.tick_interval_or_default().as_millis(), 1000);
        assert!(!config.notify_or_default());
        assert_eq!(config.ffmpeg_input_format_or_default(), "pulse");
    }

    #[test]
    fn merge_prefers_other() {
        let base = AppConfig::defaults();
        let other = AppConfig {
            backend: Some("ffmpeg".to_string()),
            notify: Some(true),
            ..Default::default()
        };

        let merged = base.merge(other);
        assert_eq!(merged.backend_or_default(), BackendKind::Ffmpeg);
        assert!(merged.notify_or_default());
        assert_eq!(merged.tick_interval.as_deref(), Some("1s"));
    }

    #[test]
    fn merge_ffmpeg_sections_field_by_field() {
        let base = AppConfig::defaults();
        let other = AppConfig {
            ffmpeg: Some(FfmpegConfig {
                input_format: None,
                input_device: Some("hw:1".to_string()),
            }),
            ..Default::default()
        };

        let merged = base.merge(other);
        assert_eq!(merged.ffmpeg_input_format_or_default(), "pulse");
        assert_eq!(merged.ffmpeg_input_device_or_default(), "hw:1");
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let config = AppConfig {
            backend: Some("tape-deck".to_string()),
            tick_interval: Some("soon".to_string()),
            ..Default::default()
        };
        assert_eq!(config.backend_or_default(), BackendKind::Cpal);
        assert_eq!(config.tick_interval_or_default(), Duration::default_tick_interval());
    }

    #[test]
    fn backend_kind_parse() {
        assert_eq!("FFmpeg".parse::<BackendKind>().unwrap(), BackendKind::Ffmpeg);
        assert!("alsa".parse::<BackendKind>().is_err());
    }

    #[test]
    fn empty_output_dir_uses_temp_dir() {
        let config = AppConfig {
            output_dir: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(config.output_dir_or_default(), std::env::temp_dir());
    }
}
