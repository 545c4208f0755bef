#![deny(unreachable_patterns)]
//! FFmpeg CLI wrapper for frame sampling.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building and execution with timeouts
//! - FFprobe stream inspection (native frame rate, duration, dimensions)
//! - Fixed-rate frame sampling with decoder presentation timestamps
//! - Lookup of extracted frame images by frame index

pub mod command;
pub mod error;
pub mod frames;
pub mod probe;
pub mod sampler;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegOutput, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use frames::{
    clear_stale_frames, frame_path, promote_frames_dir, read_frame_image, remove_dir_if_exists,
    sibling_with_suffix,
};
pub use probe::{probe_video, VideoInfo};
pub use sampler::{sampling_interval, FrameSampler, SamplerConfig};
