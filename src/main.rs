//! Montage - Media Transform Service Core
//!
//! This is the main entry point for the Montage application, which runs
//! caption, frame, concat, aspect, watermark and audio transforms through
//! an external renderer (ffmpeg/ffprobe).

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use montage::caption::{Caption, CaptionOptions, CaptionPosition};
use montage::cli::{Args, AudioAction, Commands};
use montage::config::Config;
use montage::error::MontageError;
use montage::media::{Anchor, ImagePosition, WatermarkOptions};
use montage::orchestrator::{OperationReport, Orchestrator, UploadOutcome};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Setup logging to both console and file
    setup_logging(args.verbose)?;

    // Load configuration
    let config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            // Try to load config.toml from current directory first
            if std::path::Path::new("config.toml").exists() {
                info!("Found config.toml in current directory, loading...");
                Config::from_file("config.toml")?
            } else {
                Config::default()
            }
        }
    };

    let orchestrator = Orchestrator::new(config);
    orchestrator.processor().check_availability().await?;

    // Execute command
    match args.command {
        Commands::CaptionVideo {
            input,
            captions,
            font_size,
            font_color,
            bg_color,
            position,
            upload,
        } => {
            let cues = load_captions(&captions)?;
            let opts = CaptionOptions {
                font_size,
                font_color,
                bg_color,
                position: parse_position(&position)?,
            };
            let report = orchestrator
                .caption_video(&input, &cues, &opts, upload.prefix())
                .await?;
            print_report(&report);
        }
        Commands::CaptionImage {
            input,
            text,
            font_size,
            font_color,
            bg_color,
            position,
            x_offset,
            y_offset,
            upload,
        } => {
            let report = orchestrator
                .caption_image(
                    &input,
                    &text,
                    font_size,
                    &font_color,
                    bg_color.as_deref(),
                    parse_image_position(&position)?,
                    (x_offset, y_offset),
                    upload.prefix(),
                )
                .await?;
            print_report(&report);
        }
        Commands::Frames {
            input,
            fps,
            format,
            quality,
        } => {
            let report = orchestrator
                .extract_frames(&input, fps, &format, quality)
                .await?;
            println!(
                "Extracted {} frames to {}",
                report.frame_count.unwrap_or(0),
                report.output_path.display()
            );
        }
        Commands::LastFrame {
            input,
            format,
            quality,
            upload,
        } => {
            let report = orchestrator
                .last_frame(&input, &format, quality, upload.prefix())
                .await?;
            if let Some(duration) = report.media_duration {
                println!("Source duration: {:.2}s", duration);
            }
            print_report(&report);
        }
        Commands::Concat { segments, upload } => {
            let content = std::fs::read_to_string(&segments)?;
            let specs: Vec<montage::orchestrator::SegmentSpec> =
                serde_json::from_str(&content).map_err(MontageError::Json)?;
            let report = orchestrator.concat_urls(&specs, upload.prefix()).await?;
            print_report(&report);
        }
        Commands::Aspect {
            input,
            ratio,
            background,
            upload,
        } => {
            let report = orchestrator
                .aspect_pad(&input, &ratio, &background, upload.prefix())
                .await?;
            print_report(&report);
        }
        Commands::Crop {
            input,
            ratio,
            upload,
        } => {
            let report = orchestrator.crop(&input, &ratio, upload.prefix()).await?;
            print_report(&report);
        }
        Commands::Watermark {
            input,
            logo,
            scale,
            opacity,
            anchor,
            margin,
            upload,
        } => {
            let opts = WatermarkOptions {
                scale_ratio: scale,
                opacity,
                anchor: Anchor::parse(&anchor)?,
                margin_ratio: margin,
            };
            let report = orchestrator
                .watermark(&input, &logo, &opts, upload.prefix())
                .await?;
            print_report(&report);
        }
        Commands::Audio { action } => match action {
            AudioAction::Replace {
                video,
                audio,
                upload,
            } => {
                let report = orchestrator
                    .replace_audio(&video, &audio, upload.prefix())
                    .await?;
                print_report(&report);
            }
            AudioAction::Mix {
                video,
                audio,
                upload,
            } => {
                let report = orchestrator
                    .mix_audio(&video, &audio, upload.prefix())
                    .await?;
                print_report(&report);
            }
            AudioAction::Extract { video, format } => {
                let report = orchestrator.extract_audio(&video, &format, None).await?;
                print_report(&report);
            }
        },
        Commands::Append {
            input,
            intro,
            outro,
            upload,
        } => {
            let report = orchestrator
                .append_intro_outro(
                    &input,
                    intro.as_deref(),
                    outro.as_deref(),
                    upload.prefix(),
                )
                .await?;
            print_report(&report);
        }
        Commands::Check => {
            println!("Renderer binaries are available");
        }
    }

    Ok(())
}

fn load_captions(path: &std::path::Path) -> Result<Vec<Caption>> {
    let content = std::fs::read_to_string(path)?;
    let cues: Vec<Caption> = serde_json::from_str(&content).map_err(MontageError::Json)?;
    Ok(cues)
}

fn parse_position(value: &str) -> Result<CaptionPosition> {
    match value {
        "top" => Ok(CaptionPosition::Top),
        "center" => Ok(CaptionPosition::Center),
        "bottom" => Ok(CaptionPosition::Bottom),
        _ => Err(MontageError::Validation(format!(
            "Unknown position '{}'; expected top, center or bottom",
            value
        ))
        .into()),
    }
}

fn parse_image_position(value: &str) -> Result<ImagePosition> {
    match value {
        "top" => Ok(ImagePosition::Top),
        "center" => Ok(ImagePosition::Center),
        "bottom" => Ok(ImagePosition::Bottom),
        "custom" => Ok(ImagePosition::Custom),
        _ => Err(MontageError::Validation(format!(
            "Unknown position '{}'; expected top, center, bottom or custom",
            value
        ))
        .into()),
    }
}

fn print_report(report: &OperationReport) {
    println!("Output: {}", report.output_path.display());
    match &report.upload {
        UploadOutcome::NotRequested => {}
        UploadOutcome::Uploaded(object) => {
            println!("Uploaded: {} ({})", object.url, object.key);
        }
        UploadOutcome::Failed { detail } => {
            println!("Upload failed (output kept locally): {}", detail);
        }
    }
}

fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let montage_dir = std::env::current_dir()?.join(".montage");
    let log_dir = montage_dir.join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "montage.log");
    let (non_blocking_file, _guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(_guard);

    // Determine log level
    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    // Create console layer
    let console_layer = fmt::layer()
        .with_target(false)
        .with_file(true)
        .with_line_number(true);

    // Create file layer
    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false); // No ANSI colors in file

    // Setup layered subscriber
    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer);

    // Initialize the subscriber
    subscriber.try_init()?;

    Ok(())
}
