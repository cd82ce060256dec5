use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::config::MediaConfig;
use crate::error::{MontageError, Result};
use crate::media::exec;

/// Typed description of a media file, parsed from one probe invocation.
#[derive(Debug, Clone)]
pub struct MediaDescriptor {
    pub streams: Vec<StreamDescriptor>,
    /// Container-level duration in seconds, when the container reports one.
    pub container_duration: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct StreamDescriptor {
    pub codec_type: CodecType,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecType {
    Video,
    Audio,
    Other,
}

impl MediaDescriptor {
    /// Whether any stream carries audio.
    pub fn has_audio(&self) -> bool {
        self.streams.iter().any(|s| s.codec_type == CodecType::Audio)
    }

    /// Width and height of the first video stream, when both are present.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.streams
            .iter()
            .find(|s| s.codec_type == CodecType::Video)
            .and_then(|s| match (s.width, s.height) {
                (Some(w), Some(h)) if w > 0 && h > 0 => Some((w, h)),
                _ => None,
            })
    }

    /// Duration in seconds: container-level first, then the first video
    /// stream that reports one.
    pub fn duration(&self) -> Option<f64> {
        self.container_duration.or_else(|| {
            self.streams
                .iter()
                .find(|s| s.codec_type == CodecType::Video && s.duration.is_some())
                .and_then(|s| s.duration)
        })
    }
}

// Raw ffprobe JSON shapes. ffprobe reports numeric durations as strings.

#[derive(Debug, Deserialize)]
struct RawProbeOutput {
    #[serde(default)]
    format: Option<RawFormat>,
    #[serde(default)]
    streams: Vec<RawStream>,
}

#[derive(Debug, Deserialize)]
struct RawFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

fn parse_seconds(value: Option<&str>) -> Option<f64> {
    value.and_then(|v| v.parse::<f64>().ok()).filter(|d| *d >= 0.0)
}

impl From<RawProbeOutput> for MediaDescriptor {
    fn from(raw: RawProbeOutput) -> Self {
        let streams = raw
            .streams
            .into_iter()
            .map(|s| StreamDescriptor {
                codec_type: match s.codec_type.as_deref() {
                    Some("video") => CodecType::Video,
                    Some("audio") => CodecType::Audio,
                    _ => CodecType::Other,
                },
                width: s.width.filter(|w| *w > 0),
                height: s.height.filter(|h| *h > 0),
                duration: parse_seconds(s.duration.as_deref()),
            })
            .collect();

        Self {
            streams,
            container_duration: raw
                .format
                .as_ref()
                .and_then(|f| parse_seconds(f.duration.as_deref())),
        }
    }
}

/// Adapter around the external probe tool.
///
/// Each call probes fresh; descriptors are never cached across operations
/// because the files they describe are transient.
pub struct MediaProbe {
    config: MediaConfig,
}

impl MediaProbe {
    pub fn new(config: MediaConfig) -> Self {
        Self { config }
    }

    /// Probe a file and parse the structured output into a descriptor.
    pub async fn probe(&self, path: &Path) -> Result<MediaDescriptor> {
        let args = vec![
            "-v".to_string(),
            "quiet".to_string(),
            "-print_format".to_string(),
            "json".to_string(),
            "-show_format".to_string(),
            "-show_streams".to_string(),
            path.to_string_lossy().to_string(),
        ];

        let result = exec::run(
            &self.config.ffprobe_path,
            &args,
            Duration::from_secs(self.config.timeout_seconds),
        )
        .await?;

        if !result.success {
            return Err(MontageError::Probe(format!(
                "Failed to read media info for {}: {}",
                path.display(),
                result.stderr.trim()
            )));
        }

        let raw: RawProbeOutput = serde_json::from_str(&result.stdout)
            .map_err(|_| MontageError::Probe(format!("Unreadable media file: {}", path.display())))?;

        Ok(raw.into())
    }

    /// Width and height of the first video stream.
    pub async fn dimensions(&self, path: &Path) -> Result<(u32, u32)> {
        self.probe(path).await?.dimensions().ok_or_else(|| {
            MontageError::Probe(format!(
                "Could not determine video dimensions for {}",
                path.display()
            ))
        })
    }

    /// Duration in seconds, from the container or the first video stream.
    pub async fn duration(&self, path: &Path) -> Result<f64> {
        self.probe(path).await?.duration().ok_or_else(|| {
            MontageError::Probe(format!(
                "Could not determine duration for {}",
                path.display()
            ))
        })
    }

    /// Whether the file has an audio stream. Probe failures propagate.
    pub async fn has_audio(&self, path: &Path) -> Result<bool> {
        Ok(self.probe(path).await?.has_audio())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> MediaDescriptor {
        let raw: RawProbeOutput = serde_json::from_str(json).unwrap();
        raw.into()
    }

    #[test]
    fn test_descriptor_from_probe_json() {
        let descriptor = parse(
            r#"{
                "format": {"duration": "12.480000"},
                "streams": [
                    {"codec_type": "video", "width": 1280, "height": 720, "duration": "12.4"},
                    {"codec_type": "audio"}
                ]
            }"#,
        );

        assert_eq!(descriptor.dimensions(), Some((1280, 720)));
        assert!(descriptor.has_audio());
        assert_eq!(descriptor.duration(), Some(12.48));
    }

    #[test]
    fn test_duration_falls_back_to_video_stream() {
        let descriptor = parse(
            r#"{
                "format": {},
                "streams": [
                    {"codec_type": "video", "width": 640, "height": 480, "duration": "3.5"}
                ]
            }"#,
        );

        assert_eq!(descriptor.duration(), Some(3.5));
        assert!(!descriptor.has_audio());
    }

    #[test]
    fn test_missing_fields_yield_none() {
        let descriptor = parse(r#"{"streams": [{"codec_type": "video", "width": 1920}]}"#);
        assert_eq!(descriptor.dimensions(), None);
        assert_eq!(descriptor.duration(), None);
    }

    #[test]
    fn test_unknown_codec_type_is_other() {
        let descriptor = parse(r#"{"streams": [{"codec_type": "subtitle"}]}"#);
        assert_eq!(descriptor.streams[0].codec_type, CodecType::Other);
    }

    #[test]
    fn test_zero_dimensions_are_rejected() {
        let descriptor = parse(
            r#"{"streams": [{"codec_type": "video", "width": 0, "height": 720}]}"#,
        );
        assert_eq!(descriptor.dimensions(), None);
    }
}
