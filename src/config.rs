use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{MontageError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub media: MediaConfig,
    pub limits: LimitsConfig,
    pub caption: CaptionConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub ffmpeg_path: String,
    /// Path to ffprobe binary
    pub ffprobe_path: String,
    /// Subprocess timeout in seconds
    pub timeout_seconds: u64,
    /// Thread count hint passed to ffmpeg (0 = auto)
    pub threads: u32,
    /// Directory for intermediate scratch files
    pub temp_dir: PathBuf,
    /// Directory for finished outputs
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum size for uploaded or fetched media, in megabytes
    pub max_media_size_mb: u64,
    /// Allowed video file extensions (lowercase, with dot)
    pub video_extensions: Vec<String>,
    /// Allowed image file extensions
    pub image_extensions: Vec<String>,
    /// Allowed audio file extensions
    pub audio_extensions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionConfig {
    /// Font family name used in the subtitle style
    pub font_name: String,
    /// Optional directory scanned for a font file whose stem matches
    /// `font_name`; passed to the renderer as fontsdir when it exists
    pub font_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Base endpoint for object uploads (empty = storage disabled)
    pub endpoint: String,
    /// Bucket or container name appended to the endpoint
    pub bucket: String,
    /// Public base URL for returned object links
    pub public_base_url: String,
    /// Bearer token sent with upload requests
    pub api_token: String,
    /// Key prefix applied to every uploaded object
    pub key_prefix: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            timeout_seconds: 300,
            threads: 0,
            temp_dir: PathBuf::from("/tmp/montage/temp"),
            output_dir: PathBuf::from("/tmp/montage/output"),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_media_size_mb: 500,
            video_extensions: [".mp4", ".avi", ".mov", ".mkv", ".webm", ".flv", ".wmv"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            image_extensions: [".jpg", ".jpeg", ".png", ".gif", ".bmp", ".webp", ".tiff"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            audio_extensions: [".mp3", ".aac", ".m4a", ".wav", ".ogg", ".flac"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            font_name: "Arial".to_string(),
            font_dir: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            bucket: String::new(),
            public_base_url: String::new(),
            api_token: String::new(),
            key_prefix: String::new(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MontageError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| MontageError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| MontageError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| MontageError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }
}

impl LimitsConfig {
    pub fn max_media_size_bytes(&self) -> u64 {
        self.max_media_size_mb * 1024 * 1024
    }
}

impl StorageConfig {
    pub fn is_configured(&self) -> bool {
        !self.endpoint.is_empty() && !self.bucket.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_roundtrip() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.media.timeout_seconds, 300);
        assert_eq!(parsed.limits.max_media_size_mb, 500);
        assert!(parsed.limits.video_extensions.contains(&".mp4".to_string()));
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [media]
            timeout_seconds = 60

            [storage]
            endpoint = "https://storage.example.com"
            bucket = "media"
            "#,
        )
        .unwrap();
        assert_eq!(config.media.timeout_seconds, 60);
        assert_eq!(config.media.ffmpeg_path, "ffmpeg");
        assert_eq!(config.limits.max_media_size_mb, 500);
        assert!(config.storage.is_configured());
    }

    #[test]
    fn test_storage_disabled_by_default() {
        let config = Config::default();
        assert!(!config.storage.is_configured());
    }

    #[test]
    fn test_max_media_size_bytes() {
        let limits = Config::default().limits;
        assert_eq!(limits.max_media_size_bytes(), 500 * 1024 * 1024);
    }
}
