//! Sequencing for multi-step operations: probe, per-segment work, concat,
//! optional upload, with guaranteed cleanup of every intermediate.

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::caption::{build_style, render_script, Caption, CaptionOptions};
use crate::config::Config;
use crate::error::{MontageError, Result};
use crate::fetch::RemoteFetcher;
use crate::media::{
    parse_aspect, ratio_fit, ImagePosition, MediaProcessor, TextOverlay, WatermarkOptions,
};
use crate::probe::MediaProbe;
use crate::scratch::{scratch_dir, scratch_path, validate_extension, ScratchSet};
use crate::storage::{HttpStorageUploader, StorageUploader, UploadedObject};

/// One remote segment of a concatenation request.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct SegmentSpec {
    pub url: String,
    /// Trim start in seconds
    pub start: f64,
    /// Trim end in seconds
    pub end: f64,
}

/// Result of an optional upload step. Upload is best-effort: a failed
/// upload never invalidates the finished local artifact.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    NotRequested,
    Uploaded(UploadedObject),
    Failed { detail: String },
}

/// What an operation hands back to the caller.
#[derive(Debug, Clone)]
pub struct OperationReport {
    pub output_path: PathBuf,
    /// Number of extracted frames, for frame extraction
    pub frame_count: Option<usize>,
    /// All frame paths, for frame extraction
    pub frame_paths: Option<Vec<PathBuf>>,
    /// Source duration, for last-frame grabs
    pub media_duration: Option<f64>,
    pub upload: UploadOutcome,
}

impl OperationReport {
    fn for_output(output_path: PathBuf) -> Self {
        Self {
            output_path,
            frame_count: None,
            frame_paths: None,
            media_duration: None,
            upload: UploadOutcome::NotRequested,
        }
    }
}

/// Sequences transform pipelines. One instance per service; requests run
/// independently and share no mutable state.
pub struct Orchestrator {
    config: Config,
    probe: MediaProbe,
    processor: MediaProcessor,
    fetcher: RemoteFetcher,
    storage: Option<Box<dyn StorageUploader>>,
}

impl Orchestrator {
    pub fn new(config: Config) -> Self {
        let storage: Option<Box<dyn StorageUploader>> = if config.storage.is_configured() {
            Some(Box::new(HttpStorageUploader::new(config.storage.clone())))
        } else {
            None
        };
        Self::with_storage(config, storage)
    }

    pub fn with_storage(config: Config, storage: Option<Box<dyn StorageUploader>>) -> Self {
        let probe = MediaProbe::new(config.media.clone());
        let processor = MediaProcessor::new(config.media.clone());
        let fetcher = RemoteFetcher::new(config.limits.max_media_size_bytes());
        Self {
            config,
            probe,
            processor,
            fetcher,
            storage,
        }
    }

    pub fn processor(&self) -> &MediaProcessor {
        &self.processor
    }

    /// Burn timed captions into a video.
    pub async fn caption_video(
        &self,
        input: &Path,
        captions: &[Caption],
        opts: &CaptionOptions,
        upload_prefix: Option<&str>,
    ) -> Result<OperationReport> {
        let ext = self.check_input(input, &self.config.limits.video_extensions)?;
        if captions.is_empty() {
            return Err(MontageError::Validation(
                "At least one caption is required".to_string(),
            ));
        }

        let (width, height) = self.probe.dimensions(input).await?;
        let style = build_style(width, height, &self.config.caption.font_name, opts);
        let script = render_script(width, height, captions, &style);

        let mut scratch = ScratchSet::new();
        let script_path = scratch.track(scratch_path(
            &self.config.media.temp_dir,
            "captions_",
            ".ass",
        )?);
        tokio::fs::write(&script_path, &script).await?;

        let output = scratch_path(&self.config.media.output_dir, "captioned_", &ext)?;
        let command = self.processor.factory().burn_captions(
            input,
            &script_path,
            self.fonts_dir().as_deref(),
            &output,
        );
        let result = self.processor.run_transform(command, &output).await?.into_result()?;

        let mut report = OperationReport::for_output(result.output_path.unwrap_or(output));
        report.upload = self.maybe_upload(&report.output_path, upload_prefix).await;
        Ok(report)
    }

    /// Overlay a single text caption on an image.
    #[allow(clippy::too_many_arguments)]
    pub async fn caption_image(
        &self,
        input: &Path,
        text: &str,
        font_size: Option<u32>,
        font_color: &str,
        bg_color: Option<&str>,
        position: ImagePosition,
        offsets: (i32, i32),
        upload_prefix: Option<&str>,
    ) -> Result<OperationReport> {
        let ext = self.check_input(input, &self.config.limits.image_extensions)?;
        if text.trim().is_empty() {
            return Err(MontageError::Validation(
                "Caption text must not be empty".to_string(),
            ));
        }

        // Reuse caption layout derivation for auto-sizing against the image.
        let (width, height) = self.probe.dimensions(input).await?;
        let derived = build_style(
            width,
            height,
            &self.config.caption.font_name,
            &CaptionOptions::default(),
        );

        let overlay = TextOverlay {
            text: text.to_string(),
            font_size: font_size.unwrap_or(derived.font_size),
            font_color: font_color.to_string(),
            bg_color: bg_color.map(|c| c.to_string()),
            box_padding: derived.box_padding,
            position,
            x_offset: offsets.0,
            y_offset: offsets.1,
        };

        let output = scratch_path(&self.config.media.output_dir, "captioned_", &ext)?;
        let command = self.processor.factory().draw_text(input, &overlay, &output);
        self.processor.run_transform(command, &output).await?.into_result()?;

        let mut report = OperationReport::for_output(output);
        report.upload = self.maybe_upload(&report.output_path, upload_prefix).await;
        Ok(report)
    }

    /// Extract frames at a fixed rate; returns the frame directory and the
    /// individual frame paths.
    pub async fn extract_frames(
        &self,
        input: &Path,
        fps: f64,
        format: &str,
        quality: u32,
    ) -> Result<OperationReport> {
        self.check_input(input, &self.config.limits.video_extensions)?;
        let format = normalize_image_format(format)?;
        if fps <= 0.0 || fps > 30.0 {
            return Err(MontageError::Validation(
                "fps must be within (0, 30]".to_string(),
            ));
        }

        // The frame directory is the deliverable on success, but a failed
        // extraction must not leave it (or partial frames) behind.
        let mut scratch = ScratchSet::new();
        let frames_dir = scratch.track_dir(scratch_dir(&self.config.media.output_dir, "frames_")?);
        let pattern = frames_dir.join(format!("frame_%04d.{}", format));
        let command = self
            .processor
            .factory()
            .extract_frames(input, &pattern, fps, quality);
        let result = self
            .processor
            .run_frame_extraction(command, &frames_dir)
            .await?
            .into_result()?;
        scratch.release(&frames_dir);

        let frames = result.output_paths.unwrap_or_default();
        let mut report = OperationReport::for_output(frames_dir);
        report.frame_count = Some(frames.len());
        report.frame_paths = Some(frames);
        Ok(report)
    }

    /// Grab the last frame of a video; reports the probed duration.
    pub async fn last_frame(
        &self,
        input: &Path,
        format: &str,
        quality: u32,
        upload_prefix: Option<&str>,
    ) -> Result<OperationReport> {
        self.check_input(input, &self.config.limits.video_extensions)?;
        let format = normalize_image_format(format)?;

        let duration = self.probe.duration(input).await?;
        // Seek slightly before the end so the grab lands on a real frame.
        let seek = (duration - 0.1).max(0.0);

        let output = scratch_path(
            &self.config.media.output_dir,
            "last_frame_",
            &format!(".{}", format),
        )?;
        let command = self.processor.factory().grab_frame(input, seek, quality, &output);
        self.processor.run_transform(command, &output).await?.into_result()?;

        let mut report = OperationReport::for_output(output);
        report.media_duration = Some(duration);
        report.upload = self.maybe_upload(&report.output_path, upload_prefix).await;
        Ok(report)
    }

    /// Download, trim and concatenate remote segments.
    ///
    /// The first successfully probed segment fixes the target dimensions
    /// for every later segment. All downloads and trimmed intermediates are
    /// cleaned up on every exit path.
    pub async fn concat_urls(
        &self,
        segments: &[SegmentSpec],
        upload_prefix: Option<&str>,
    ) -> Result<OperationReport> {
        if segments.is_empty() {
            return Err(MontageError::Validation(
                "At least one segment is required".to_string(),
            ));
        }
        for segment in segments {
            if segment.end <= segment.start {
                return Err(MontageError::Validation(format!(
                    "Segment end {} must be greater than start {}",
                    segment.end, segment.start
                )));
            }
        }

        let mut scratch = ScratchSet::new();
        let mut sources = Vec::with_capacity(segments.len());
        for (index, segment) in segments.iter().enumerate() {
            let dest = scratch.track(scratch_path(
                &self.config.media.temp_dir,
                &format!("concat_src_{}_", index),
                ".mp4",
            )?);
            self.fetcher.fetch(&segment.url, &dest).await?;
            sources.push((dest, segment.start, segment.end));
        }

        let output =
            self.concat_local(&sources, &mut scratch, "concat_").await?;

        let mut report = OperationReport::for_output(output);
        report.upload = self.maybe_upload(&report.output_path, upload_prefix).await;
        Ok(report)
    }

    /// Trim and concatenate already-local clips. Shared by the URL concat
    /// and append workflows.
    async fn concat_local(
        &self,
        sources: &[(PathBuf, f64, f64)],
        scratch: &mut ScratchSet,
        output_prefix: &str,
    ) -> Result<PathBuf> {
        let mut target: Option<(u32, u32)> = None;
        let mut parts = Vec::with_capacity(sources.len());

        for (index, (source, start, end)) in sources.iter().enumerate() {
            let descriptor = self.probe.probe(source).await?;
            let dims = match target {
                Some(dims) => dims,
                None => {
                    let dims = descriptor.dimensions().ok_or_else(|| {
                        MontageError::Probe(format!(
                            "Could not determine video dimensions for {}",
                            source.display()
                        ))
                    })?;
                    info!("Concat target dimensions fixed at {}x{}", dims.0, dims.1);
                    target = Some(dims);
                    dims
                }
            };

            let part = scratch.track(scratch_path(
                &self.config.media.temp_dir,
                &format!("concat_seg_{}_", index),
                ".mp4",
            )?);
            let command = self.processor.factory().normalize_clip(
                source,
                &part,
                dims,
                descriptor.has_audio(),
                Some((*start, *end)),
            );
            self.processor.run_transform(command, &part).await?.into_result()?;
            parts.push(part);
        }

        let manifest = scratch.track(scratch_path(
            &self.config.media.temp_dir,
            "concat_list_",
            ".txt",
        )?);
        write_concat_manifest(&manifest, &parts).await?;

        let output = scratch_path(&self.config.media.output_dir, output_prefix, ".mp4")?;
        self.concat_with_fallback(&manifest, &output).await?;
        Ok(output)
    }

    /// Stream-copy concat first; fall back to a full re-encode when the
    /// copy attempt fails. The reported result is the fallback's.
    async fn concat_with_fallback(&self, manifest: &Path, output: &Path) -> Result<()> {
        let copy = self.processor.factory().concat(manifest, output, false);
        let copied = self.processor.run_transform(copy, output).await?;
        if copied.success {
            return Ok(());
        }

        warn!(
            "Stream-copy concat failed, re-encoding: {}",
            copied.error.as_deref().unwrap_or("unknown")
        );
        let reencode = self.processor.factory().concat(manifest, output, true);
        self.processor.run_transform(reencode, output).await?.into_result()?;
        Ok(())
    }

    /// Pad a video to one of the fixed aspect ratios.
    pub async fn aspect_pad(
        &self,
        input: &Path,
        ratio: &str,
        background: &str,
        upload_prefix: Option<&str>,
    ) -> Result<OperationReport> {
        let ext = self.check_input(input, &self.config.limits.video_extensions)?;
        let ratio = parse_aspect(ratio)?;

        let dims = self.probe.dimensions(input).await?;
        let target = ratio_fit(dims, ratio);

        let output = scratch_path(&self.config.media.output_dir, "aspect_", &ext)?;
        let command = self
            .processor
            .factory()
            .aspect_pad(input, &output, target, background);
        self.processor.run_transform(command, &output).await?.into_result()?;

        let mut report = OperationReport::for_output(output);
        report.upload = self.maybe_upload(&report.output_path, upload_prefix).await;
        Ok(report)
    }

    /// Center-crop a video to one of the fixed aspect ratios.
    pub async fn crop(
        &self,
        input: &Path,
        ratio: &str,
        upload_prefix: Option<&str>,
    ) -> Result<OperationReport> {
        let ext = self.check_input(input, &self.config.limits.video_extensions)?;
        let ratio = parse_aspect(ratio)?;

        let dims = self.probe.dimensions(input).await?;
        let target = ratio_fit(dims, ratio);

        let output = scratch_path(&self.config.media.output_dir, "cropped_", &ext)?;
        let command = self.processor.factory().crop_center(input, &output, target);
        self.processor.run_transform(command, &output).await?.into_result()?;

        let mut report = OperationReport::for_output(output);
        report.upload = self.maybe_upload(&report.output_path, upload_prefix).await;
        Ok(report)
    }

    /// Overlay a logo on a video.
    pub async fn watermark(
        &self,
        base: &Path,
        logo: &Path,
        opts: &WatermarkOptions,
        upload_prefix: Option<&str>,
    ) -> Result<OperationReport> {
        let ext = self.check_input(base, &self.config.limits.video_extensions)?;
        self.check_input(logo, &self.config.limits.image_extensions)?;

        let dims = self.probe.dimensions(base).await?;
        let output = scratch_path(&self.config.media.output_dir, "watermarked_", &ext)?;
        let command = self
            .processor
            .factory()
            .watermark(base, logo, &output, dims, opts);
        self.processor.run_transform(command, &output).await?.into_result()?;

        let mut report = OperationReport::for_output(output);
        report.upload = self.maybe_upload(&report.output_path, upload_prefix).await;
        Ok(report)
    }

    /// Replace the audio track of a video.
    pub async fn replace_audio(
        &self,
        video: &Path,
        audio: &Path,
        upload_prefix: Option<&str>,
    ) -> Result<OperationReport> {
        let ext = self.check_input(video, &self.config.limits.video_extensions)?;
        self.check_input(audio, &self.config.limits.audio_extensions)?;

        let output = scratch_path(&self.config.media.output_dir, "audio_replaced_", &ext)?;
        let command = self.processor.factory().replace_audio(video, audio, &output);
        self.processor.run_transform(command, &output).await?.into_result()?;

        let mut report = OperationReport::for_output(output);
        report.upload = self.maybe_upload(&report.output_path, upload_prefix).await;
        Ok(report)
    }

    /// Mix a second audio source into the video's track. Videos with no
    /// audio of their own fall back to a straight replace.
    pub async fn mix_audio(
        &self,
        video: &Path,
        audio: &Path,
        upload_prefix: Option<&str>,
    ) -> Result<OperationReport> {
        let ext = self.check_input(video, &self.config.limits.video_extensions)?;
        self.check_input(audio, &self.config.limits.audio_extensions)?;

        let has_audio = self.probe.has_audio(video).await?;
        let output = scratch_path(&self.config.media.output_dir, "audio_mixed_", &ext)?;
        let command = if has_audio {
            self.processor.factory().mix_audio(video, audio, &output)
        } else {
            self.processor.factory().replace_audio(video, audio, &output)
        };
        self.processor.run_transform(command, &output).await?.into_result()?;

        let mut report = OperationReport::for_output(output);
        report.upload = self.maybe_upload(&report.output_path, upload_prefix).await;
        Ok(report)
    }

    /// Extract the audio track of a video.
    pub async fn extract_audio(
        &self,
        video: &Path,
        format: &str,
        upload_prefix: Option<&str>,
    ) -> Result<OperationReport> {
        self.check_input(video, &self.config.limits.video_extensions)?;
        let format = match format.to_lowercase().as_str() {
            "mp3" => "mp3",
            "m4a" | "aac" => "m4a",
            "wav" => "wav",
            other => {
                return Err(MontageError::Validation(format!(
                    "Unsupported audio format '{}'; expected mp3, m4a or wav",
                    other
                )))
            }
        };

        let output = scratch_path(
            &self.config.media.output_dir,
            "audio_",
            &format!(".{}", format),
        )?;
        let command = self.processor.factory().extract_audio(video, &output);
        self.processor.run_transform(command, &output).await?.into_result()?;

        let mut report = OperationReport::for_output(output);
        report.upload = self.maybe_upload(&report.output_path, upload_prefix).await;
        Ok(report)
    }

    /// Prepend an intro and/or append an outro to a main video.
    ///
    /// Target dimensions always come from the main video; every input,
    /// the main video included, is normalized to that size first so the
    /// concat sees uniform encode parameters.
    pub async fn append_intro_outro(
        &self,
        main: &Path,
        intro: Option<&Path>,
        outro: Option<&Path>,
        upload_prefix: Option<&str>,
    ) -> Result<OperationReport> {
        self.check_input(main, &self.config.limits.video_extensions)?;
        if intro.is_none() && outro.is_none() {
            return Err(MontageError::Validation(
                "At least one of intro or outro is required".to_string(),
            ));
        }

        let target = self.probe.dimensions(main).await?;
        let inputs: Vec<&Path> = [intro, Some(main), outro].into_iter().flatten().collect();

        let mut scratch = ScratchSet::new();
        let mut parts = Vec::with_capacity(inputs.len());
        for (index, input) in inputs.iter().enumerate() {
            self.check_input(input, &self.config.limits.video_extensions)?;
            let has_audio = self.probe.has_audio(input).await?;

            let part = scratch.track(scratch_path(
                &self.config.media.temp_dir,
                &format!("append_part_{}_", index),
                ".mp4",
            )?);
            let command = self
                .processor
                .factory()
                .normalize_clip(input, &part, target, has_audio, None);
            self.processor.run_transform(command, &part).await?.into_result()?;
            parts.push(part);
        }

        let manifest = scratch.track(scratch_path(
            &self.config.media.temp_dir,
            "append_list_",
            ".txt",
        )?);
        write_concat_manifest(&manifest, &parts).await?;

        let output = scratch_path(&self.config.media.output_dir, "appended_", ".mp4")?;
        self.concat_with_fallback(&manifest, &output).await?;

        let mut report = OperationReport::for_output(output);
        report.upload = self.maybe_upload(&report.output_path, upload_prefix).await;
        Ok(report)
    }

    /// Existence plus extension check for a local input file.
    fn check_input(&self, path: &Path, allowed: &[String]) -> Result<String> {
        if !path.exists() {
            return Err(MontageError::FileNotFound(path.display().to_string()));
        }
        validate_extension(path, allowed)
    }

    /// Locate the configured font directory when it holds a file whose
    /// stem matches the configured font name; otherwise the renderer gets
    /// the literal font name only.
    fn fonts_dir(&self) -> Option<PathBuf> {
        let dir = self.config.caption.font_dir.as_ref()?;
        let wanted = self.config.caption.font_name.to_lowercase();
        let entries = std::fs::read_dir(dir).ok()?;
        for entry in entries.flatten() {
            let path = entry.path();
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if stem.to_lowercase() == wanted {
                    return Some(dir.clone());
                }
            }
        }
        None
    }

    async fn maybe_upload(&self, path: &Path, prefix: Option<&str>) -> UploadOutcome {
        let Some(prefix) = prefix else {
            return UploadOutcome::NotRequested;
        };
        let Some(storage) = &self.storage else {
            return UploadOutcome::Failed {
                detail: "Object storage is not configured".to_string(),
            };
        };

        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("output.bin");
        match storage.upload(path, filename, prefix).await {
            Ok(object) => UploadOutcome::Uploaded(object),
            Err(e) => {
                warn!("Upload of {} failed: {}", path.display(), e);
                UploadOutcome::Failed {
                    detail: e.to_string(),
                }
            }
        }
    }
}

/// Write an ffconcat manifest listing the given parts in order.
async fn write_concat_manifest(manifest: &Path, parts: &[PathBuf]) -> Result<()> {
    let mut content = String::new();
    for part in parts {
        content.push_str(&format!("file '{}'\n", part.display()));
    }
    tokio::fs::write(manifest, content).await?;
    Ok(())
}

fn normalize_image_format(format: &str) -> Result<&'static str> {
    match format.to_lowercase().as_str() {
        "jpg" | "jpeg" => Ok("jpg"),
        "png" => Ok("png"),
        _ => Err(MontageError::Validation(
            "Format must be 'jpg' or 'png'".to_string(),
        )),
    }
}
