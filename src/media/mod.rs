// Command construction and execution for the external renderer.
//
// - command: argument-list builder with the shared encode policy
// - transforms: one pure constructor per transform kind
// - exec: subprocess lifecycle (capture, timeout, guaranteed kill)
// - processor: runs built commands and classifies outcomes

pub mod command;
pub mod exec;
pub mod processor;
pub mod transforms;

pub use command::MediaCommand;
pub use exec::ExecutionResult;
pub use processor::{MediaProcessor, TransformResult};
pub use transforms::{
    even_dimension, parse_aspect, ratio_fit, Anchor, CommandFactory, ImagePosition, TextOverlay,
    WatermarkOptions,
};
