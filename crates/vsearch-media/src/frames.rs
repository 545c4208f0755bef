//! Extracted frame image storage.
//!
//! Frame images live in a flat directory and are named purely by frame
//! index, so any frame can be located from its number alone.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use vsearch_models::{frame_file_name, parse_frame_file_name};

use crate::error::{MediaError, MediaResult};

/// Path of the image for `frame_index` inside `frames_dir`.
pub fn frame_path(frames_dir: impl AsRef<Path>, frame_index: usize) -> PathBuf {
    frames_dir.as_ref().join(frame_file_name(frame_index))
}

/// Read the stored image bytes of a frame.
pub async fn read_frame_image(
    frames_dir: impl AsRef<Path>,
    frame_index: usize,
) -> MediaResult<Vec<u8>> {
    let path = frame_path(frames_dir, frame_index);

    match fs::read(&path).await {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(MediaError::FrameNotFound(frame_index))
        }
        Err(e) => Err(MediaError::from(e)),
    }
}

/// Remove frame images left over from a previous extraction.
///
/// Only files whose names parse as frame files are touched. Returns the
/// number of files removed; a missing directory counts as empty.
pub async fn clear_stale_frames(frames_dir: impl AsRef<Path>) -> MediaResult<usize> {
    let frames_dir = frames_dir.as_ref();

    let mut entries = match fs::read_dir(frames_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(MediaError::from(e)),
    };

    let mut removed = 0;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let is_frame = name
            .to_str()
            .and_then(parse_frame_file_name)
            .is_some();

        if is_frame && entry.file_type().await?.is_file() {
            fs::remove_file(entry.path()).await?;
            removed += 1;
        }
    }

    if removed > 0 {
        debug!("Removed {} stale frame images from {}", removed, frames_dir.display());
    }

    Ok(removed)
}

/// Replace `frames_dir` with the fully written `staging_dir`.
///
/// The current directory is moved aside first and put back if the swap
/// fails, so `frames_dir` always holds one complete set of frames.
pub async fn promote_frames_dir(
    staging_dir: impl AsRef<Path>,
    frames_dir: impl AsRef<Path>,
) -> MediaResult<()> {
    let staging_dir = staging_dir.as_ref();
    let frames_dir = frames_dir.as_ref();

    // a build that sampled nothing may never have created it
    fs::create_dir_all(staging_dir).await?;

    let previous = sibling_with_suffix(frames_dir, ".previous");
    remove_dir_if_exists(&previous).await?;

    let had_previous = match fs::rename(frames_dir, &previous).await {
        Ok(()) => true,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => return Err(MediaError::from(e)),
    };

    if let Err(e) = fs::rename(staging_dir, frames_dir).await {
        if had_previous {
            if let Err(restore) = fs::rename(&previous, frames_dir).await {
                warn!(error = %restore, "Failed to restore previous frames directory");
            }
        }
        return Err(MediaError::from(e));
    }

    if had_previous {
        if let Err(e) = fs::remove_dir_all(&previous).await {
            warn!(path = %previous.display(), error = %e, "Failed to remove replaced frames");
        }
    }

    debug!("Promoted {} to {}", staging_dir.display(), frames_dir.display());
    Ok(())
}

/// Remove a directory tree; a missing directory is not an error.
pub async fn remove_dir_if_exists(dir: impl AsRef<Path>) -> MediaResult<()> {
    match fs::remove_dir_all(dir.as_ref()).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(MediaError::from(e)),
    }
}

/// `dir` with `suffix` appended to its final component.
pub fn sibling_with_suffix(dir: &Path, suffix: &str) -> PathBuf {
    let mut s = OsString::from(dir.as_os_str());
    s.push(suffix);
    PathBuf::from(s)
}
