//! On-disk layout of the incremental cache
//!
//! ```text
//! .sapwood/cache/
//!   index.json                  {format_version, entries: {id -> CacheEntry}}
//!   artifacts/<sha256(id)>.json one Summary per entity
//! ```

use super::entry::{CacheIndex, FORMAT_VERSION, IndexHeader};
use crate::error::{CoreError, CoreResult};
use crate::hash::id_digest;
use crate::model::Summary;
use std::path::{Path, PathBuf};

/// Working directory: .sapwood/
pub const WORK_DIR: &str = ".sapwood";

/// Cache directory inside the work dir
pub const CACHE_SUBDIR: &str = "cache";

/// Index file name
pub const INDEX_FILE: &str = "index.json";

/// Artifact directory name
pub const ARTIFACT_DIR: &str = "artifacts";

/// Default cache directory for a repository root
pub fn cache_dir(root: &Path) -> PathBuf {
    root.join(WORK_DIR).join(CACHE_SUBDIR)
}

pub fn index_path(dir: &Path) -> PathBuf {
    dir.join(INDEX_FILE)
}

pub fn artifact_path(dir: &Path, entity_id: &str) -> PathBuf {
    dir.join(ARTIFACT_DIR).join(format!("{}.json", id_digest(entity_id)))
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> CoreError + '_ {
    move |source| CoreError::CacheIo {
        path: path.to_path_buf(),
        source,
    }
}

/// Load the index. Any failure, including a version mismatch, yields an
/// empty index; nothing from a mismatched file is trusted.
pub fn read_index(dir: &Path) -> CacheIndex {
    let path = index_path(dir);
    if !path.exists() {
        return CacheIndex::empty();
    }
    let json_str = match std::fs::read_to_string(&path) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!("Cannot read cache index {}: {}; starting empty", path.display(), e);
            return CacheIndex::empty();
        }
    };
    match serde_json::from_str::<IndexHeader>(&json_str) {
        Ok(header) if header.format_version == FORMAT_VERSION => {}
        Ok(header) => {
            tracing::warn!(
                "Cache format {} does not match {}; discarding index",
                header.format_version,
                FORMAT_VERSION
            );
            return CacheIndex::empty();
        }
        Err(e) => {
            tracing::warn!("Corrupt cache index {}: {}; starting empty", path.display(), e);
            return CacheIndex::empty();
        }
    }
    match serde_json::from_str::<CacheIndex>(&json_str) {
        Ok(index) => {
            tracing::debug!("Cache index loaded from: {} ({} entries)", path.display(), index.entries.len());
            index
        }
        Err(e) => {
            tracing::warn!("Corrupt cache index {}: {}; starting empty", path.display(), e);
            CacheIndex::empty()
        }
    }
}

/// Persist the index atomically (write to a temp file, then rename).
pub fn write_index(dir: &Path, index: &CacheIndex) -> CoreResult<()> {
    std::fs::create_dir_all(dir).map_err(io_err(dir))?;
    let path = index_path(dir);
    let tmp = path.with_extension("json.tmp");
    let json_str = serde_json::to_string_pretty(index)?;
    std::fs::write(&tmp, json_str).map_err(io_err(&tmp))?;
    std::fs::rename(&tmp, &path).map_err(io_err(&path))?;
    tracing::debug!("Cache index saved: {}", path.display());
    Ok(())
}

pub fn read_artifact(dir: &Path, entity_id: &str) -> CoreResult<Option<Summary>> {
    let path = artifact_path(dir, entity_id);
    if !path.exists() {
        return Ok(None);
    }
    let json_str = std::fs::read_to_string(&path).map_err(io_err(&path))?;
    Ok(Some(serde_json::from_str(&json_str)?))
}

pub fn write_artifact(dir: &Path, summary: &Summary) -> CoreResult<()> {
    let path = artifact_path(dir, &summary.entity_id);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err(parent))?;
    }
    let json_str = serde_json::to_string_pretty(summary)?;
    std::fs::write(&path, json_str).map_err(io_err(&path))?;
    Ok(())
}

pub fn remove_artifact(dir: &Path, entity_id: &str) -> CoreResult<()> {
    let path = artifact_path(dir, entity_id);
    match std::fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(io_err(&path)(e)),
    }
}

/// Remove the whole cache directory.
pub fn clear_dir(dir: &Path) -> CoreResult<()> {
    if dir.exists() {
        std::fs::remove_dir_all(dir).map_err(io_err(dir))?;
    }
    Ok(())
}
