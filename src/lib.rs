//! Montage - Media Transform Service Core
//!
//! Caption burn-in, frame extraction, concatenation, aspect and crop,
//! watermarking and audio operations on top of an external renderer
//! (ffmpeg/ffprobe), with remote fetch and object-storage upload at the
//! boundaries.

pub mod caption;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod media;
pub mod orchestrator;
pub mod probe;
pub mod scratch;
pub mod storage;
