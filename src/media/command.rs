use std::path::Path;
use std::time::Duration;

use crate::error::Result;
use crate::media::exec::{self, ExecutionResult};

/// One external renderer invocation as an ordered argument list.
///
/// Dynamic values (paths, colors, URLs) are always pushed as whole tokens;
/// nothing is ever assembled through shell interpolation.
#[derive(Debug, Clone)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl MediaCommand {
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Add an input file (`-i <path>`).
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy())
    }

    /// Add a synthetic lavfi input (silent audio sources and the like).
    pub fn lavfi_input<S: Into<String>>(self, source: S) -> Self {
        self.arg("-f").arg("lavfi").arg("-i").arg(source)
    }

    /// Set the output path (always the final argument).
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy())
    }

    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    pub fn seek(self, seconds: f64) -> Self {
        self.arg("-ss").arg(seconds.to_string())
    }

    pub fn stop_at(self, seconds: f64) -> Self {
        self.arg("-to").arg(seconds.to_string())
    }

    pub fn video_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:v").arg(codec)
    }

    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:a").arg(codec)
    }

    pub fn copy_video(self) -> Self {
        self.video_codec("copy")
    }

    pub fn copy_audio(self) -> Self {
        self.audio_codec("copy")
    }

    pub fn no_video(self) -> Self {
        self.arg("-vn")
    }

    pub fn no_audio(self) -> Self {
        self.arg("-an")
    }

    pub fn map<S: Into<String>>(self, stream: S) -> Self {
        self.arg("-map").arg(stream)
    }

    pub fn video_filter<S: Into<String>>(self, filter: S) -> Self {
        self.arg("-vf").arg(filter)
    }

    pub fn filter_complex<S: Into<String>>(self, filter: S) -> Self {
        self.arg("-filter_complex").arg(filter)
    }

    /// Image output quality (`-q:v`, 1 = best, 31 = worst).
    pub fn image_quality(self, quality: u32) -> Self {
        self.arg("-q:v").arg(quality.to_string())
    }

    /// Thread-count hint for the renderer; 0 means leave it to ffmpeg.
    pub fn threads(self, count: u32) -> Self {
        if count > 0 {
            self.arg("-threads").arg(count.to_string())
        } else {
            self
        }
    }

    /// The uniform video encode policy every re-encoding transform uses:
    /// CRF 23 with the fast preset, a yuv420p pixel pipeline, and a
    /// streaming-friendly container layout. Consistent parameters across
    /// normalized clips are what make stream-copy concatenation possible.
    pub fn encode_video_policy(self) -> Self {
        self.video_codec("libx264")
            .arg("-preset")
            .arg("fast")
            .arg("-crf")
            .arg("23")
            .arg("-pix_fmt")
            .arg("yuv420p")
            .arg("-movflags")
            .arg("+faststart")
    }

    /// The uniform audio encode policy: AAC, stereo, 44.1 kHz.
    pub fn encode_audio_policy(self) -> Self {
        self.audio_codec("aac")
            .arg("-ac")
            .arg("2")
            .arg("-ar")
            .arg("44100")
    }

    /// Run this command through the execution engine.
    pub async fn execute(&self, timeout: Duration) -> Result<ExecutionResult> {
        exec::run(&self.binary_path, &self.args, timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_preserves_argument_order() {
        let cmd = MediaCommand::new("ffmpeg", "test")
            .overwrite()
            .input("/in.mp4")
            .video_filter("scale=640:480")
            .encode_video_policy()
            .output("/out.mp4");

        assert_eq!(cmd.args[0], "-y");
        assert_eq!(cmd.args[1], "-i");
        assert_eq!(cmd.args[2], "/in.mp4");
        assert_eq!(cmd.args[3], "-vf");
        assert_eq!(cmd.args[4], "scale=640:480");
        assert_eq!(*cmd.args.last().unwrap(), "/out.mp4");
    }

    #[test]
    fn test_encode_policies() {
        let cmd = MediaCommand::new("ffmpeg", "policy")
            .encode_video_policy()
            .encode_audio_policy();

        let joined = cmd.args.join(" ");
        assert!(joined.contains("-c:v libx264"));
        assert!(joined.contains("-preset fast"));
        assert!(joined.contains("-crf 23"));
        assert!(joined.contains("-pix_fmt yuv420p"));
        assert!(joined.contains("-movflags +faststart"));
        assert!(joined.contains("-c:a aac"));
        assert!(joined.contains("-ac 2"));
        assert!(joined.contains("-ar 44100"));
    }

    #[test]
    fn test_threads_zero_adds_nothing() {
        let cmd = MediaCommand::new("ffmpeg", "auto threads").threads(0);
        assert!(cmd.args.is_empty());

        let cmd = MediaCommand::new("ffmpeg", "four threads").threads(4);
        assert_eq!(cmd.args, vec!["-threads", "4"]);
    }

    #[test]
    fn test_paths_are_single_tokens() {
        let cmd = MediaCommand::new("ffmpeg", "token safety")
            .input("/tmp/name with spaces; rm -rf.mp4");
        assert_eq!(cmd.args[1], "/tmp/name with spaces; rm -rf.mp4");
    }
}
