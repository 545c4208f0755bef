//! Paired on-disk artifacts for an index snapshot.
//!
//! A snapshot saved at `location` is stored as two files sharing that base
//! name:
//! - `{location}_metadata.json`: header plus the frame metadata table
//! - `{location}_index.bin`: the index backend's native serialized form
//!
//! Both are always read and written together.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

use vsearch_models::FrameMetadataTable;

use crate::error::{EngineError, EngineResult};
use crate::index::IndexBackend;
use crate::snapshot::IndexSnapshot;

/// Metadata artifact format version.
pub const METADATA_FORMAT_VERSION: u32 = 1;

const METADATA_SUFFIX: &str = "_metadata.json";
const INDEX_SUFFIX: &str = "_index.bin";

#[derive(Debug, Serialize, Deserialize)]
struct MetadataArtifact {
    format_version: u32,
    model: String,
    dimension: usize,
    frame_count: usize,
    #[serde(default)]
    backend: Option<String>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    source_video: Option<PathBuf>,
    #[serde(default)]
    target_fps: Option<f64>,
    frames: FrameMetadataTable,
}

/// Paths of the `(metadata, index)` artifacts for `location`.
pub fn artifact_paths(location: impl AsRef<Path>) -> (PathBuf, PathBuf) {
    let location = location.as_ref();
    (
        with_suffix(location, METADATA_SUFFIX),
        with_suffix(location, INDEX_SUFFIX),
    )
}

/// Whether both artifacts exist at `location`.
pub fn artifacts_exist(location: impl AsRef<Path>) -> bool {
    let (metadata, index) = artifact_paths(location);
    metadata.is_file() && index.is_file()
}

fn with_suffix(location: &Path, suffix: &str) -> PathBuf {
    let mut s = OsString::from(location.as_os_str());
    s.push(suffix);
    PathBuf::from(s)
}

/// Write `snapshot` to the artifact pair at `location`.
pub async fn save_snapshot(
    snapshot: &IndexSnapshot,
    backend: &dyn IndexBackend,
    location: impl AsRef<Path>,
) -> EngineResult<()> {
    let location = location.as_ref();
    let (metadata_path, index_path) = artifact_paths(location);

    if let Some(parent) = location.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }

    let header = MetadataArtifact {
        format_version: METADATA_FORMAT_VERSION,
        model: snapshot.model.clone(),
        dimension: snapshot.dimension,
        frame_count: snapshot.frames.len(),
        backend: Some(backend.name().to_string()),
        created_at: snapshot.created_at,
        source_video: snapshot.source_video.clone(),
        target_fps: snapshot.target_fps,
        frames: snapshot.frames.clone(),
    };

    let metadata_bytes = serde_json::to_vec_pretty(&header)
        .map_err(|e| EngineError::Io(std::io::Error::other(e)))?;
    let index_bytes = snapshot.index.to_bytes();

    write_atomic(&index_path, &index_bytes).await?;
    write_atomic(&metadata_path, &metadata_bytes).await?;

    info!(
        location = %location.display(),
        frame_count = snapshot.frames.len(),
        index_bytes = index_bytes.len(),
        "Saved index"
    );

    Ok(())
}

/// Read and validate the artifact pair at `location`.
pub async fn load_snapshot(
    backend: &dyn IndexBackend,
    location: impl AsRef<Path>,
) -> EngineResult<IndexSnapshot> {
    let location = location.as_ref();
    let (metadata_path, index_path) = artifact_paths(location);

    let metadata_bytes = read_artifact(&metadata_path).await?;
    let index_bytes = read_artifact(&index_path).await?;

    let header: MetadataArtifact = serde_json::from_slice(&metadata_bytes).map_err(|e| {
        EngineError::persistence_corrupt(format!(
            "{} is malformed: {}",
            metadata_path.display(),
            e
        ))
    })?;

    if header.format_version != METADATA_FORMAT_VERSION {
        return Err(EngineError::persistence_corrupt(format!(
            "unsupported metadata format version {}",
            header.format_version
        )));
    }

    if let Some(name) = header.backend.as_deref() {
        if name != backend.name() {
            return Err(EngineError::persistence_corrupt(format!(
                "index was written by backend {}, expected {}",
                name,
                backend.name()
            )));
        }
    }

    if header.frames.len() != header.frame_count {
        return Err(EngineError::persistence_corrupt(format!(
            "metadata header declares {} frames but contains {}",
            header.frame_count,
            header.frames.len()
        )));
    }

    header
        .frames
        .validate()
        .map_err(|e| EngineError::persistence_corrupt(format!("metadata table: {}", e)))?;

    let index = backend.from_bytes(&index_bytes).map_err(|e| {
        EngineError::persistence_corrupt(format!("{}: {}", index_path.display(), e))
    })?;

    if index.dimension() != header.dimension {
        return Err(EngineError::persistence_corrupt(format!(
            "index dimension {} does not match metadata dimension {}",
            index.dimension(),
            header.dimension
        )));
    }

    if index.len() != header.frames.len() {
        return Err(EngineError::persistence_corrupt(format!(
            "index holds {} vectors but metadata has {} frames",
            index.len(),
            header.frames.len()
        )));
    }

    debug!(
        location = %location.display(),
        frame_count = header.frames.len(),
        model = %header.model,
        "Loaded index artifacts"
    );

    Ok(IndexSnapshot {
        index,
        frames: header.frames,
        model: header.model,
        dimension: header.dimension,
        created_at: header.created_at,
        source_video: header.source_video,
        target_fps: header.target_fps,
    })
}

async fn read_artifact(path: &Path) -> EngineResult<Vec<u8>> {
    fs::read(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            EngineError::persistence_corrupt(format!("{} is missing", path.display()))
        } else {
            EngineError::persistence_corrupt(format!("{} is unreadable: {}", path.display(), e))
        }
    })
}

/// Write to a uniquely named temporary sibling, then rename over `path`.
async fn write_atomic(path: &Path, bytes: &[u8]) -> EngineResult<()> {
    let tmp = with_suffix(path, &format!(".{}.tmp", Uuid::new_v4().simple()));
    let result = match fs::write(&tmp, bytes).await {
        Ok(()) => fs::rename(&tmp, path).await,
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        let _ = fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}
