//! Fixed-rate frame sampling.
//!
//! Frames are selected by decode position: with `interval = floor(native_fps
//! / target_fps)` (at least 1), every frame whose zero-based position is a
//! multiple of `interval` is kept. Timestamps come from the decoder's
//! presentation time stamps as reported by FFmpeg's `showinfo` filter, so
//! sources with frame-duration jitter keep their real timing.

use std::path::Path;
use std::time::Instant;
use tokio::fs;
use tracing::{info, warn};

use vsearch_models::{FrameRecord, FRAME_FILE_EXTENSION, FRAME_FILE_PREFIX, FRAME_INDEX_WIDTH};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::frames::{clear_stale_frames, frame_path};
use crate::probe::probe_video;

/// JPEG quality for extracted frames.
const FRAME_JPEG_QUALITY: u8 = 2;

/// Sampling interval for a source rate and a target rate.
///
/// `floor(native_fps / target_fps)`, never below 1.
pub fn sampling_interval(native_fps: f64, target_fps: f64) -> usize {
    let raw = (native_fps / target_fps).floor();
    if raw.is_finite() && raw >= 1.0 {
        raw as usize
    } else {
        1
    }
}

/// Frame sampler configuration.
#[derive(Debug, Clone, Default)]
pub struct SamplerConfig {
    /// Kill FFmpeg after this many seconds
    pub ffmpeg_timeout_secs: Option<u64>,
}

impl SamplerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            ffmpeg_timeout_secs: std::env::var("FFMPEG_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok()),
        }
    }
}

/// Extracts frames from a video at a target rate.
#[derive(Debug, Clone, Default)]
pub struct FrameSampler {
    config: SamplerConfig,
}

impl FrameSampler {
    pub fn new(config: SamplerConfig) -> Self {
        Self { config }
    }

    pub fn from_env() -> Self {
        Self::new(SamplerConfig::from_env())
    }

    /// Sample frames from `video_path` into `output_dir`.
    ///
    /// Returns records in sampling order with dense `frame_index` values
    /// starting at 0. A source with no matching frames yields an empty list.
    pub async fn sample(
        &self,
        video_path: impl AsRef<Path>,
        output_dir: impl AsRef<Path>,
        target_fps: f64,
    ) -> MediaResult<Vec<FrameRecord>> {
        let video_path = video_path.as_ref();
        let output_dir = output_dir.as_ref();

        if !target_fps.is_finite() || target_fps <= 0.0 {
            return Err(MediaError::invalid_parameter(format!(
                "target_fps must be positive, got {}",
                target_fps
            )));
        }

        let start = Instant::now();
        let video = probe_video(video_path).await?;
        let interval = sampling_interval(video.fps, target_fps);

        info!(
            video = %video_path.display(),
            native_fps = video.fps,
            target_fps,
            interval,
            "Sampling frames"
        );

        fs::create_dir_all(output_dir).await?;
        clear_stale_frames(output_dir).await?;

        let pattern = output_dir.join(format!(
            "{}%0{}d.{}",
            FRAME_FILE_PREFIX, FRAME_INDEX_WIDTH, FRAME_FILE_EXTENSION
        ));

        let cmd = FfmpegCommand::new(video_path, &pattern)
            .video_filter(select_filter(interval))
            .variable_frame_rate()
            .start_number(0)
            .jpeg_quality(FRAME_JPEG_QUALITY)
            // showinfo reports at info level
            .log_level("info");

        let mut runner = FfmpegRunner::new();
        if let Some(secs) = self.config.ffmpeg_timeout_secs {
            runner = runner.with_timeout(secs);
        }

        let output = runner.run(&cmd).await?;
        let timestamps = parse_showinfo_timestamps(&output.stderr_lines);

        let written = count_written_frames(output_dir, timestamps.len());
        if written != timestamps.len() {
            warn!(
                reported = timestamps.len(),
                written,
                "FFmpeg frame count mismatch, keeping common prefix"
            );
        }

        let frames: Vec<FrameRecord> = timestamps
            .into_iter()
            .take(written)
            .enumerate()
            .map(|(i, secs)| FrameRecord::new(i, secs * 1000.0, frame_path(output_dir, i)))
            .collect();

        info!(
            frame_count = frames.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Extracted {} frames from {}",
            frames.len(),
            video_path.display()
        );

        Ok(frames)
    }
}

/// Filter graph keeping every `interval`-th decoded frame and logging its PTS.
fn select_filter(interval: usize) -> String {
    format!("select='not(mod(n,{}))',showinfo", interval)
}

/// Presentation timestamps (seconds) of the frames `showinfo` saw, in order.
///
/// Lines look like
/// `[Parsed_showinfo_1 @ 0x55d] n:   0 pts:      0 pts_time:0  duration:512 ...`.
/// Unparseable or negative values reuse the previous timestamp so that the
/// sequence stays non-decreasing and one entry exists per emitted frame.
fn parse_showinfo_timestamps(lines: &[String]) -> Vec<f64> {
    let mut timestamps = Vec::new();
    let mut previous = 0.0_f64;

    for line in lines {
        if !line.contains("showinfo") {
            continue;
        }

        let Some(rest) = line.split("pts_time:").nth(1) else {
            continue;
        };

        let value = rest
            .split_whitespace()
            .next()
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .unwrap_or(previous)
            .max(previous);

        timestamps.push(value);
        previous = value;
    }

    timestamps
}

/// Number of consecutive frame files present from index 0, up to `expected`.
fn count_written_frames(output_dir: &Path, expected: usize) -> usize {
    (0..expected)
        .take_while(|&i| frame_path(output_dir, i).is_file())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sampling_interval() {
        assert_eq!(sampling_interval(30.0, 1.0), 30);
        assert_eq!(sampling_interval(29.97, 1.0), 29);
        assert_eq!(sampling_interval(30.0, 2.0), 15);
        assert_eq!(sampling_interval(24.0, 5.0), 4);
        // target above native rate keeps every frame
        assert_eq!(sampling_interval(24.0, 60.0), 1);
        assert_eq!(sampling_interval(30.0, 30.0), 1);
    }

    #[test]
    fn test_sampled_positions_for_30fps_at_1fps() {
        let interval = sampling_interval(30.0, 1.0);
        let kept: Vec<usize> = (0..95).filter(|n| n % interval == 0).collect();
        assert_eq!(kept, vec![0, 30, 60, 90]);
    }

    #[test]
    fn test_select_filter() {
        assert_eq!(select_filter(30), "select='not(mod(n,30))',showinfo");
    }

    #[test]
    fn test_parse_showinfo_timestamps() {
        let lines: Vec<String> = vec![
            "Input #0, mov,mp4,m4a,3gp,3g2,mj2, from 'in.mp4':".into(),
            "[Parsed_showinfo_1 @ 0x55d0] config in time_base: 1/15360, frame_rate: 30/1".into(),
            "[Parsed_showinfo_1 @ 0x55d0] n:   0 pts:      0 pts_time:0       duration:512".into(),
            "[Parsed_showinfo_1 @ 0x55d0] n:   1 pts:  15360 pts_time:1       duration:512".into(),
            "[Parsed_showinfo_1 @ 0x55d0] n:   2 pts:  31232 pts_time:2.03333 duration:512".into(),
            "frame=    3 fps=0.0 q=2.0 Lsize=N/A time=00:00:02.06".into(),
        ];

        let ts = parse_showinfo_timestamps(&lines);
        assert_eq!(ts.len(), 3);
        assert_eq!(ts[0], 0.0);
        assert_eq!(ts[1], 1.0);
        assert!((ts[2] - 2.03333).abs() < 1e-9);
    }

    #[test]
    fn test_parse_showinfo_keeps_sequence_monotonic() {
        let lines: Vec<String> = vec![
            "[Parsed_showinfo_1 @ 0x1] n:0 pts:0 pts_time:1.5 duration:1".into(),
            "[Parsed_showinfo_1 @ 0x1] n:1 pts:NOPTS pts_time:NOPTS duration:1".into(),
            "[Parsed_showinfo_1 @ 0x1] n:2 pts:-10 pts_time:-0.1 duration:1".into(),
            "[Parsed_showinfo_1 @ 0x1] n:3 pts:99 pts_time:3.0 duration:1".into(),
        ];

        assert_eq!(parse_showinfo_timestamps(&lines), vec![1.5, 1.5, 1.5, 3.0]);
    }

    #[test]
    fn test_count_written_frames_stops_at_gap() {
        let dir = TempDir::new().unwrap();
        for i in [0, 1, 3] {
            std::fs::write(frame_path(dir.path(), i), b"x").unwrap();
        }

        assert_eq!(count_written_frames(dir.path(), 4), 2);
        assert_eq!(count_written_frames(dir.path(), 1), 1);
        assert_eq!(count_written_frames(dir.path(), 0), 0);
    }

    #[tokio::test]
    async fn test_sample_rejects_non_positive_fps() {
        let dir = TempDir::new().unwrap();
        let sampler = FrameSampler::default();

        for fps in [0.0, -1.0, f64::NAN] {
            let err = sampler
                .sample(dir.path().join("in.mp4"), dir.path(), fps)
                .await
                .unwrap_err();
            assert!(matches!(err, MediaError::InvalidParameter(_)));
        }
    }

    #[tokio::test]
    async fn test_sample_missing_source() {
        let dir = TempDir::new().unwrap();
        let err = FrameSampler::default()
            .sample(dir.path().join("missing.mp4"), dir.path().join("frames"), 1.0)
            .await
            .unwrap_err();
        assert!(err.is_source_error());
    }

    #[tokio::test]
    #[ignore = "requires ffmpeg"]
    async fn test_sample_synthetic_video() {
        let dir = TempDir::new().unwrap();
        let video = dir.path().join("testsrc.mp4");

        let status = tokio::process::Command::new("ffmpeg")
            .args(["-y", "-v", "error", "-f", "lavfi", "-i", "testsrc=duration=3:rate=30:size=160x120"])
            .arg(&video)
            .status()
            .await
            .unwrap();
        assert!(status.success());

        let frames_dir = dir.path().join("frames");
        let frames = FrameSampler::default()
            .sample(&video, &frames_dir, 1.0)
            .await
            .unwrap();

        assert_eq!(frames.len(), 3);
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(frame.frame_index, i);
            assert!(frame.frame_path.is_file());
            assert!((frame.timestamp_sec - i as f64).abs() < 0.05);
        }
    }
}
