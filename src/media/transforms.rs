//! Constructors for every renderer invocation the service performs.
//!
//! Each builder is a pure function from validated parameters to a
//! `MediaCommand`; nothing here touches the filesystem or spawns anything.

use std::path::Path;

use crate::error::{MontageError, Result};
use crate::media::command::MediaCommand;

/// Silent stereo source injected when an input has no audio track, so every
/// normalized clip carries exactly one audio stream and concatenation stays
/// uniform.
const SILENT_AUDIO_SOURCE: &str = "anullsrc=channel_layout=stereo:sample_rate=44100";

/// Named overlay anchor points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Center,
}

impl Anchor {
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "top-left" => Ok(Anchor::TopLeft),
            "top-right" => Ok(Anchor::TopRight),
            "bottom-left" => Ok(Anchor::BottomLeft),
            "bottom-right" => Ok(Anchor::BottomRight),
            "center" => Ok(Anchor::Center),
            _ => Err(MontageError::Validation(format!(
                "Unknown anchor '{}'; expected top-left, top-right, bottom-left, bottom-right or center",
                value
            ))),
        }
    }
}

/// Watermark overlay parameters. Ratios are clamped to their documented
/// bounds when the command is built.
#[derive(Debug, Clone)]
pub struct WatermarkOptions {
    /// Logo width as a fraction of the base video width, clamped [0.05, 0.5]
    pub scale_ratio: f64,
    /// Logo opacity, clamped [0, 1]
    pub opacity: f64,
    pub anchor: Anchor,
    /// Margin as a fraction of the base dimension
    pub margin_ratio: f64,
}

/// Text overlay placement on an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImagePosition {
    Top,
    Center,
    Bottom,
    Custom,
}

#[derive(Debug, Clone)]
pub struct TextOverlay {
    pub text: String,
    pub font_size: u32,
    /// ffmpeg color syntax (named, `#RRGGBB`, optional `@alpha`)
    pub font_color: String,
    /// Box color behind the text; no box when absent
    pub bg_color: Option<String>,
    pub box_padding: u32,
    pub position: ImagePosition,
    pub x_offset: i32,
    pub y_offset: i32,
}

/// Round to the nearest even dimension, never below 2. The video codec's
/// chroma subsampling rejects odd frame sizes.
pub fn even_dimension(value: f64) -> u32 {
    (((value / 2.0).round() as i64) * 2).max(2) as u32
}

/// Parse one of the three supported aspect ratios.
pub fn parse_aspect(ratio: &str) -> Result<(f64, f64)> {
    match ratio {
        "9:16" => Ok((9.0, 16.0)),
        "1:1" => Ok((1.0, 1.0)),
        "16:9" => Ok((16.0, 9.0)),
        _ => Err(MontageError::Validation(format!(
            "Unsupported aspect ratio '{}'; expected 9:16, 1:1 or 16:9",
            ratio
        ))),
    }
}

/// Largest even-dimensioned canvas of the requested ratio that fits inside
/// the source frame. Used both as the pad canvas and the crop region.
pub fn ratio_fit(source: (u32, u32), ratio: (f64, f64)) -> (u32, u32) {
    let (width, height) = (source.0 as f64, source.1 as f64);
    let target = ratio.0 / ratio.1;

    if width / height > target {
        (even_dimension(height * target), even_dimension(height))
    } else {
        (even_dimension(width), even_dimension(width / target))
    }
}

/// Builds renderer command lines with consistent policy.
pub struct CommandFactory {
    ffmpeg_path: String,
    threads: u32,
}

impl CommandFactory {
    pub fn new<S: Into<String>>(ffmpeg_path: S, threads: u32) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            threads,
        }
    }

    fn base<S: Into<String>>(&self, description: S) -> MediaCommand {
        MediaCommand::new(&self.ffmpeg_path, description).overwrite()
    }

    /// Burn a subtitle script into a video.
    pub fn burn_captions(
        &self,
        video: &Path,
        script: &Path,
        fonts_dir: Option<&Path>,
        output: &Path,
    ) -> MediaCommand {
        let mut filter = format!("ass={}", script.display());
        if let Some(dir) = fonts_dir {
            filter.push_str(&format!(":fontsdir={}", dir.display()));
        }

        self.base("Caption burn-in")
            .input(video)
            .video_filter(filter)
            .encode_video_policy()
            .copy_audio()
            .threads(self.threads)
            .output(output)
    }

    /// Draw a text overlay onto an image.
    pub fn draw_text(&self, image: &Path, overlay: &TextOverlay, output: &Path) -> MediaCommand {
        let (x_expr, y_expr) = match overlay.position {
            ImagePosition::Top => (
                "(w-text_w)/2".to_string(),
                format!("h*0.05+{}", overlay.y_offset),
            ),
            ImagePosition::Center => (
                "(w-text_w)/2".to_string(),
                format!("(h-text_h)/2+{}", overlay.y_offset),
            ),
            ImagePosition::Bottom => (
                "(w-text_w)/2".to_string(),
                format!("h*0.9-text_h+{}", overlay.y_offset),
            ),
            ImagePosition::Custom => (
                overlay.x_offset.to_string(),
                overlay.y_offset.to_string(),
            ),
        };

        let mut filter = format!(
            "drawtext=text='{}':fontsize={}:fontcolor={}:x={}:y={}",
            escape_drawtext(&overlay.text),
            overlay.font_size,
            overlay.font_color,
            x_expr,
            y_expr,
        );
        if let Some(bg) = &overlay.bg_color {
            filter.push_str(&format!(
                ":box=1:boxcolor={}:boxborderw={}",
                bg, overlay.box_padding
            ));
        }

        self.base("Text overlay on image")
            .input(image)
            .video_filter(filter)
            .image_quality(2)
            .output(output)
    }

    /// Extract frames at a fixed rate into a numbered pattern.
    pub fn extract_frames(
        &self,
        video: &Path,
        output_pattern: &Path,
        fps: f64,
        quality: u32,
    ) -> MediaCommand {
        self.base("Frame extraction")
            .input(video)
            .video_filter(format!("fps={}", fps))
            .image_quality(quality)
            .threads(self.threads)
            .output(output_pattern)
    }

    /// Grab a single frame at `seek_seconds`.
    pub fn grab_frame(
        &self,
        video: &Path,
        seek_seconds: f64,
        quality: u32,
        output: &Path,
    ) -> MediaCommand {
        self.base("Single frame grab")
            .seek(seek_seconds)
            .input(video)
            .arg("-vframes")
            .arg("1")
            .image_quality(quality)
            .output(output)
    }

    /// Re-encode a clip to the target dimensions and the uniform codec
    /// policy, optionally trimming to `(start, end)` first. Sources without
    /// audio get a silent stereo track so every normalized clip has exactly
    /// one audio stream.
    pub fn normalize_clip(
        &self,
        input: &Path,
        output: &Path,
        target: (u32, u32),
        has_audio: bool,
        trim: Option<(f64, f64)>,
    ) -> MediaCommand {
        let (width, height) = target;
        let mut cmd = self.base("Normalize clip").input(input);

        if !has_audio {
            cmd = cmd.lavfi_input(SILENT_AUDIO_SOURCE);
        }
        if let Some((start, end)) = trim {
            cmd = cmd.seek(start).stop_at(end);
        }

        cmd = cmd.video_filter(format!(
            "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:color=black",
            w = width,
            h = height,
        ));

        if !has_audio {
            cmd = cmd.map("0:v").map("1:a").arg("-shortest");
        }

        cmd.encode_video_policy()
            .encode_audio_policy()
            .threads(self.threads)
            .output(output)
    }

    /// Concatenate clips listed in an ffconcat manifest. The stream-copy
    /// variant is the fast path; the re-encode variant is the fallback.
    pub fn concat(&self, list_file: &Path, output: &Path, reencode: bool) -> MediaCommand {
        let cmd = self
            .base(if reencode {
                "Concatenate (re-encode)"
            } else {
                "Concatenate (stream copy)"
            })
            .arg("-f")
            .arg("concat")
            .arg("-safe")
            .arg("0")
            .input(list_file);

        if reencode {
            cmd.encode_video_policy()
                .encode_audio_policy()
                .threads(self.threads)
                .output(output)
        } else {
            cmd.arg("-c").arg("copy").output(output)
        }
    }

    /// Pad a video onto a canvas of the target dimensions.
    pub fn aspect_pad(
        &self,
        input: &Path,
        output: &Path,
        target: (u32, u32),
        background: &str,
    ) -> MediaCommand {
        let (width, height) = target;
        self.base("Aspect pad")
            .input(input)
            .video_filter(format!(
                "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:color={c}",
                w = width,
                h = height,
                c = background,
            ))
            .encode_video_policy()
            .copy_audio()
            .threads(self.threads)
            .output(output)
    }

    /// Center-crop a video to the target dimensions.
    pub fn crop_center(&self, input: &Path, output: &Path, target: (u32, u32)) -> MediaCommand {
        self.base("Center crop")
            .input(input)
            .video_filter(format!("crop={}:{}", target.0, target.1))
            .encode_video_policy()
            .copy_audio()
            .threads(self.threads)
            .output(output)
    }

    /// Overlay a logo on a video at a named anchor.
    pub fn watermark(
        &self,
        base: &Path,
        logo: &Path,
        output: &Path,
        base_dims: (u32, u32),
        opts: &WatermarkOptions,
    ) -> MediaCommand {
        let scale_ratio = opts.scale_ratio.clamp(0.05, 0.5);
        let opacity = opts.opacity.clamp(0.0, 1.0);
        let overlay_width = even_dimension(base_dims.0 as f64 * scale_ratio);
        let margin_x = (opts.margin_ratio * base_dims.0 as f64).round() as u32;
        let margin_y = (opts.margin_ratio * base_dims.1 as f64).round() as u32;

        let (x_expr, y_expr) = match opts.anchor {
            Anchor::TopLeft => (margin_x.to_string(), margin_y.to_string()),
            Anchor::TopRight => (
                format!("main_w-overlay_w-{}", margin_x),
                margin_y.to_string(),
            ),
            Anchor::BottomLeft => (
                margin_x.to_string(),
                format!("main_h-overlay_h-{}", margin_y),
            ),
            Anchor::BottomRight => (
                format!("main_w-overlay_w-{}", margin_x),
                format!("main_h-overlay_h-{}", margin_y),
            ),
            Anchor::Center => (
                "(main_w-overlay_w)/2".to_string(),
                "(main_h-overlay_h)/2".to_string(),
            ),
        };

        let filter = format!(
            "[1:v]scale={}:-2,format=rgba,colorchannelmixer=aa={}[wm];[0:v][wm]overlay={}:{}",
            overlay_width, opacity, x_expr, y_expr,
        );

        self.base("Watermark overlay")
            .input(base)
            .input(logo)
            .filter_complex(filter)
            .encode_video_policy()
            .copy_audio()
            .threads(self.threads)
            .output(output)
    }

    /// Replace a video's audio track, trimming to the shorter input.
    pub fn replace_audio(&self, video: &Path, audio: &Path, output: &Path) -> MediaCommand {
        self.base("Replace audio")
            .input(video)
            .input(audio)
            .map("0:v")
            .map("1:a")
            .copy_video()
            .encode_audio_policy()
            .arg("-shortest")
            .output(output)
    }

    /// Mix a second audio source into the video's existing track.
    pub fn mix_audio(&self, video: &Path, audio: &Path, output: &Path) -> MediaCommand {
        self.base("Mix audio")
            .input(video)
            .input(audio)
            .filter_complex("[0:a][1:a]amix=inputs=2:duration=first:dropout_transition=2[aout]")
            .map("0:v")
            .map("[aout]")
            .copy_video()
            .encode_audio_policy()
            .output(output)
    }

    /// Extract the audio track; codec chosen from the output extension.
    pub fn extract_audio(&self, video: &Path, output: &Path) -> MediaCommand {
        let cmd = self.base("Audio extraction").input(video).no_video();

        let ext = output
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        match ext.as_str() {
            "mp3" => cmd.audio_codec("libmp3lame").arg("-q:a").arg("2"),
            "wav" => cmd.audio_codec("pcm_s16le"),
            _ => cmd.encode_audio_policy(),
        }
        .output(output)
    }
}

/// Escape text for a drawtext filter argument.
fn escape_drawtext(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('\'', "'\\''")
        .replace(':', "\\:")
}
