use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Burn timed captions into a video
    CaptionVideo {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// JSON file with caption cues: [{"text", "start", "end"}, ...]
        #[arg(long)]
        captions: PathBuf,

        /// Font size override in points
        #[arg(long)]
        font_size: Option<u32>,

        /// Font color (named, #RRGGBB, optional @alpha)
        #[arg(long)]
        font_color: Option<String>,

        /// Background box color; enables the box when set
        #[arg(long)]
        bg_color: Option<String>,

        /// Vertical placement: top, center or bottom
        #[arg(long, default_value = "bottom")]
        position: String,

        #[command(flatten)]
        upload: UploadArgs,
    },

    /// Overlay a text caption on an image
    CaptionImage {
        /// Input image file
        #[arg(short, long)]
        input: PathBuf,

        /// Caption text
        #[arg(short, long)]
        text: String,

        /// Font size override in points
        #[arg(long)]
        font_size: Option<u32>,

        /// Font color in ffmpeg color syntax
        #[arg(long, default_value = "white")]
        font_color: String,

        /// Background box color; enables the box when set
        #[arg(long)]
        bg_color: Option<String>,

        /// Placement: top, center, bottom or custom
        #[arg(long, default_value = "bottom")]
        position: String,

        /// Horizontal offset in pixels
        #[arg(long, default_value = "0")]
        x_offset: i32,

        /// Vertical offset in pixels
        #[arg(long, default_value = "0")]
        y_offset: i32,

        #[command(flatten)]
        upload: UploadArgs,
    },

    /// Extract frames from a video at a fixed rate
    Frames {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Frames per second to extract
        #[arg(long, default_value = "1.0")]
        fps: f64,

        /// Image format: jpg or png
        #[arg(long, default_value = "jpg")]
        format: String,

        /// Quality scale (lower is better, 2-31)
        #[arg(long, default_value = "2")]
        quality: u32,
    },

    /// Grab the last frame of a video
    LastFrame {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Image format: jpg or png
        #[arg(long, default_value = "jpg")]
        format: String,

        /// Quality scale (lower is better, 2-31)
        #[arg(long, default_value = "2")]
        quality: u32,

        #[command(flatten)]
        upload: UploadArgs,
    },

    /// Download, trim and concatenate remote segments
    Concat {
        /// JSON file with segments: [{"url", "start", "end"}, ...]
        #[arg(long)]
        segments: PathBuf,

        #[command(flatten)]
        upload: UploadArgs,
    },

    /// Pad a video to a fixed aspect ratio
    Aspect {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Target ratio: 9:16, 1:1 or 16:9
        #[arg(short, long)]
        ratio: String,

        /// Pad color in ffmpeg color syntax
        #[arg(long, default_value = "black")]
        background: String,

        #[command(flatten)]
        upload: UploadArgs,
    },

    /// Center-crop a video to a fixed aspect ratio
    Crop {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Target ratio: 9:16, 1:1 or 16:9
        #[arg(short, long)]
        ratio: String,

        #[command(flatten)]
        upload: UploadArgs,
    },

    /// Overlay a logo on a video
    Watermark {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Logo image file
        #[arg(short, long)]
        logo: PathBuf,

        /// Logo width as a fraction of the video width
        #[arg(long, default_value = "0.15")]
        scale: f64,

        /// Logo opacity, 0 to 1
        #[arg(long, default_value = "0.8")]
        opacity: f64,

        /// Placement: top-left, top-right, bottom-left, bottom-right or center
        #[arg(long, default_value = "bottom-right")]
        anchor: String,

        /// Margin as a fraction of the base dimension
        #[arg(long, default_value = "0.02")]
        margin: f64,

        #[command(flatten)]
        upload: UploadArgs,
    },

    /// Audio track operations
    Audio {
        #[command(subcommand)]
        action: AudioAction,
    },

    /// Prepend an intro and/or append an outro to a video
    Append {
        /// Main video file
        #[arg(short, long)]
        input: PathBuf,

        /// Intro video file
        #[arg(long)]
        intro: Option<PathBuf>,

        /// Outro video file
        #[arg(long)]
        outro: Option<PathBuf>,

        #[command(flatten)]
        upload: UploadArgs,
    },

    /// Check that the renderer binaries are available
    Check,
}

#[derive(Subcommand)]
pub enum AudioAction {
    /// Replace the audio track of a video
    Replace {
        /// Input video file
        #[arg(short, long)]
        video: PathBuf,

        /// Replacement audio file
        #[arg(short, long)]
        audio: PathBuf,

        #[command(flatten)]
        upload: UploadArgs,
    },

    /// Mix a second audio source into the video's track
    Mix {
        /// Input video file
        #[arg(short, long)]
        video: PathBuf,

        /// Audio file to mix in
        #[arg(short, long)]
        audio: PathBuf,

        #[command(flatten)]
        upload: UploadArgs,
    },

    /// Extract the audio track of a video
    Extract {
        /// Input video file
        #[arg(short, long)]
        video: PathBuf,

        /// Audio format: mp3, m4a or wav
        #[arg(long, default_value = "mp3")]
        format: String,
    },
}

/// Shared upload flags: upload is opt-in and best-effort.
#[derive(clap::Args)]
pub struct UploadArgs {
    /// Upload the result to object storage after the transform
    #[arg(long)]
    pub upload: bool,

    /// Key prefix within the bucket for the uploaded object
    #[arg(long, default_value = "")]
    pub upload_prefix: String,
}

impl UploadArgs {
    /// None when upload was not requested; the prefix otherwise.
    pub fn prefix(&self) -> Option<&str> {
        self.upload.then_some(self.upload_prefix.as_str())
    }
}
