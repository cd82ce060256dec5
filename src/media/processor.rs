use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::MediaConfig;
use crate::error::{MontageError, Result};
use crate::media::command::MediaCommand;
use crate::media::transforms::CommandFactory;

/// Outcome of one transform step. Terminal value; never retried.
#[derive(Debug, Clone)]
pub struct TransformResult {
    pub success: bool,
    pub output_path: Option<PathBuf>,
    pub output_paths: Option<Vec<PathBuf>>,
    pub error: Option<String>,
    /// Derived metric, e.g. the source duration for last-frame grabs
    pub duration: Option<f64>,
}

impl TransformResult {
    pub fn succeeded(output_path: PathBuf) -> Self {
        Self {
            success: true,
            output_path: Some(output_path),
            output_paths: None,
            error: None,
            duration: None,
        }
    }

    pub fn failed<S: Into<String>>(error: S) -> Self {
        Self {
            success: false,
            output_path: None,
            output_paths: None,
            error: Some(error.into()),
            duration: None,
        }
    }

    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Convert into a hard error, for callers that cannot continue past a
    /// failed step.
    pub fn into_result(self) -> Result<Self> {
        if self.success {
            Ok(self)
        } else {
            Err(MontageError::Transform(
                self.error.unwrap_or_else(|| "unknown renderer failure".to_string()),
            ))
        }
    }
}

/// Runs built commands through the execution engine and classifies the
/// outcome. One instance per service; holds no per-request state.
pub struct MediaProcessor {
    config: MediaConfig,
    factory: CommandFactory,
}

impl MediaProcessor {
    pub fn new(config: MediaConfig) -> Self {
        let factory = CommandFactory::new(&config.ffmpeg_path, config.threads);
        Self { config, factory }
    }

    pub fn factory(&self) -> &CommandFactory {
        &self.factory
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_seconds)
    }

    /// Check that both external binaries respond to `-version`.
    pub async fn check_availability(&self) -> Result<()> {
        for binary in [&self.config.ffmpeg_path, &self.config.ffprobe_path] {
            let result = MediaCommand::new(binary, "Version check")
                .arg("-version")
                .execute(Duration::from_secs(10))
                .await?;
            if !result.success {
                return Err(MontageError::Config(format!(
                    "{} is not available: {}",
                    binary,
                    result.stderr.trim()
                )));
            }
        }
        debug!("Renderer binaries are available");
        Ok(())
    }

    /// Run a command expected to produce `output`. A renderer failure or a
    /// missing output file both classify as a failed result, not an error;
    /// timeouts propagate as the distinct timeout error.
    pub async fn run_transform(
        &self,
        command: MediaCommand,
        output: &Path,
    ) -> Result<TransformResult> {
        info!("{}", command.description);
        let result = command.execute(self.timeout()).await?;

        if result.success && output.exists() {
            Ok(TransformResult::succeeded(output.to_path_buf()))
        } else if result.success {
            Ok(TransformResult::failed(format!(
                "Renderer reported success but produced no output at {}",
                output.display()
            )))
        } else {
            Ok(TransformResult::failed(result.stderr))
        }
    }

    /// Run a frame-extraction command and collect the numbered frames it
    /// produced, in name order.
    pub async fn run_frame_extraction(
        &self,
        command: MediaCommand,
        frames_dir: &Path,
    ) -> Result<TransformResult> {
        info!("{}", command.description);
        let result = command.execute(self.timeout()).await?;

        if !result.success {
            return Ok(TransformResult::failed(result.stderr));
        }

        let mut frames: Vec<PathBuf> = WalkDir::new(frames_dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .collect();
        frames.sort();

        if frames.is_empty() {
            return Ok(TransformResult::failed(
                "No frames could be extracted from the video",
            ));
        }

        Ok(TransformResult {
            success: true,
            output_path: None,
            output_paths: Some(frames),
            error: None,
            duration: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn processor() -> MediaProcessor {
        // `true` exits 0 without reading args, standing in for the renderer.
        MediaProcessor::new(MediaConfig {
            ffmpeg_path: "true".to_string(),
            ffprobe_path: "true".to_string(),
            timeout_seconds: 5,
            threads: 0,
            temp_dir: std::env::temp_dir(),
            output_dir: std::env::temp_dir(),
        })
    }

    #[tokio::test]
    async fn test_missing_output_is_failure() {
        let processor = processor();
        let cmd = MediaCommand::new("true", "no-op");
        let result = processor
            .run_transform(cmd, &PathBuf::from("/nonexistent/out.mp4"))
            .await
            .unwrap();

        assert!(!result.success);
        assert!(result.error.unwrap().contains("no output"));
    }

    #[tokio::test]
    async fn test_existing_output_is_success() {
        let processor = processor();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.mp4");
        std::fs::write(&out, b"video").unwrap();

        let cmd = MediaCommand::new("true", "no-op");
        let result = processor.run_transform(cmd, &out).await.unwrap();
        assert!(result.success);
        assert_eq!(result.output_path.unwrap(), out);
    }

    #[tokio::test]
    async fn test_renderer_failure_carries_stderr() {
        let processor = processor();
        let cmd = MediaCommand::new("sh", "failing step")
            .arg("-c")
            .arg("echo boom >&2; exit 1");
        let result = processor
            .run_transform(cmd, &PathBuf::from("/out.mp4"))
            .await
            .unwrap();

        assert!(!result.success);
        assert!(result.error.unwrap().contains("boom"));
    }

    #[tokio::test]
    async fn test_frame_collection_sorted() {
        let processor = processor();
        let dir = tempfile::tempdir().unwrap();
        for name in ["frame_0002.jpg", "frame_0001.jpg", "frame_0003.jpg"] {
            std::fs::write(dir.path().join(name), b"jpg").unwrap();
        }

        let cmd = MediaCommand::new("true", "no-op extraction");
        let result = processor
            .run_frame_extraction(cmd, dir.path())
            .await
            .unwrap();

        let frames = result.output_paths.unwrap();
        assert_eq!(frames.len(), 3);
        assert!(frames[0].ends_with("frame_0001.jpg"));
        assert!(frames[2].ends_with("frame_0003.jpg"));
    }

    #[tokio::test]
    async fn test_empty_frame_dir_is_failure() {
        let processor = processor();
        let dir = tempfile::tempdir().unwrap();
        let cmd = MediaCommand::new("true", "no-op extraction");
        let result = processor
            .run_frame_extraction(cmd, dir.path())
            .await
            .unwrap();
        assert!(!result.success);
    }

    #[test]
    fn test_into_result() {
        assert!(TransformResult::succeeded(PathBuf::from("/x")).into_result().is_ok());
        assert!(matches!(
            TransformResult::failed("bad").into_result(),
            Err(MontageError::Transform(_))
        ));
    }
}
