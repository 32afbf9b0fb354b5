//! Application configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::clock::TimestampZone;
use crate::error::FarmjobResult;

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Job compilation defaults.
    pub compiler: CompilerConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Defaults the job compiler falls back to when a job does not say otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Frames per render task when the job has no `chunk_size` setting.
    pub default_chunk_size: u32,

    /// Executable token for render commands, resolved by the worker.
    pub blender_exe: String,

    /// Engine-invocation token used by job types without their own flags.
    pub blender_args_placeholder: String,

    /// Zone used when substituting `{timestamp}` into output paths.
    pub timestamp_zone: TimestampZone,

    /// Preview-video encoding parameters.
    pub video: VideoEncodeConfig,
}

/// Encoder parameters for the frames-to-video assembly task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoEncodeConfig {
    /// Encoder executable.
    pub exe: String,

    /// Video codec passed to `-c:v`.
    pub codec: String,

    /// Constant rate factor.
    pub crf: u32,

    /// Keyframe interval (GOP size).
    pub gop: u32,

    /// Pixel format passed to `-pix_fmt`.
    pub pixel_format: String,

    /// Filter that pads odd frame sizes to even dimensions.
    pub pad_filter: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "farmjob_compiler=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            default_chunk_size: 1,
            blender_exe: "{blender}".to_string(),
            blender_args_placeholder: "{blenderArgs}".to_string(),
            timestamp_zone: TimestampZone::Local,
            video: VideoEncodeConfig::default(),
        }
    }
}

impl Default for VideoEncodeConfig {
    fn default() -> Self {
        Self {
            exe: "ffmpeg".to_string(),
            codec: "h264".to_string(),
            crf: 20,
            gop: 18,
            pixel_format: "yuv420p".to_string(),
            pad_filter: "pad=ceil(iw/2)*2:ceil(ih/2)*2".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if !config_path.exists() {
            return Self::default();
        }
        match Self::load_from(&config_path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                Self::default()
            }
        }
    }

    /// Load config from an explicit file. Missing fields take defaults.
    pub fn load_from(path: impl AsRef<Path>) -> FarmjobResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save config to the standard location.
    pub fn save(&self) -> FarmjobResult<()> {
        self.save_to(config_file_path())
    }

    /// Save config to an explicit file, creating parent directories.
    pub fn save_to(&self, path: impl AsRef<Path>) -> FarmjobResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("farmjob").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compiler_defaults() {
        let config = CompilerConfig::default();
        assert_eq!(config.default_chunk_size, 1);
        assert_eq!(config.blender_exe, "{blender}");
        assert_eq!(config.video.exe, "ffmpeg");
        assert_eq!(config.video.crf, 20);
    }

    #[test]
    fn test_partial_config_takes_defaults() {
        let raw = r#"{ "compiler": { "default_chunk_size": 4, "video": { "crf": 18 } } }"#;
        let config: AppConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.compiler.default_chunk_size, 4);
        assert_eq!(config.compiler.video.crf, 18);
        assert_eq!(config.compiler.video.codec, "h264");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join("farmjob_test_config.json");
        std::fs::write(&path, r#"{ "logging": { "level": "debug", "json": true } }"#).unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
        assert_eq!(config.compiler.timestamp_zone, TimestampZone::Local);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_save_to_round_trip() {
        let path = std::env::temp_dir()
            .join("farmjob_test_save")
            .join("nested")
            .join("config.json");
        let _ = std::fs::remove_file(&path);

        let mut config = AppConfig::default();
        config.compiler.default_chunk_size = 8;
        config.compiler.timestamp_zone = TimestampZone::Utc;
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.compiler.default_chunk_size, 8);
        assert_eq!(loaded.compiler.timestamp_zone, TimestampZone::Utc);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_from_missing_file_is_io_error() {
        let path = std::env::temp_dir().join("farmjob_missing_config.json");
        let _ = std::fs::remove_file(&path);
        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, crate::error::FarmjobError::Io(_)));
    }
}
