//! A filesystem-backed `Storage` adapter, rooted at a base directory. Paths
//! are normalized before ever touching `tokio::fs`, so the
//! `..`/NUL/control-character rejections apply regardless of the
//! underlying OS's own path handling.

use async_trait::async_trait;
use convergedb_core::{path, ConvergeError, ConvergeResult, Storage};
use std::path::PathBuf;
use tracing::warn;

pub struct FsStorage {
    base: PathBuf,
}

impl FsStorage {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    fn resolve(&self, normalized: &str) -> PathBuf {
        if normalized.is_empty() {
            self.base.clone()
        } else {
            self.base.join(normalized)
        }
    }

    fn map_io_err(operation: &str, err: std::io::Error) -> ConvergeError {
        ConvergeError::StorageFailure { operation: operation.to_string(), cause: err.to_string() }
    }
}

#[async_trait]
impl Storage for FsStorage {
    async fn read(&self, raw_path: &str) -> ConvergeResult<Option<String>> {
        let normalized = path::normalize(raw_path)?;
        let full = self.resolve(&normalized);
        match tokio::fs::read_to_string(&full).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::map_io_err("read", e)),
        }
    }

    async fn write(&self, raw_path: &str, content: &str) -> ConvergeResult<()> {
        let normalized = path::normalize_for_write(raw_path)?;
        let full = self.resolve(&normalized);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| Self::map_io_err("write:mkdir", e))?;
        }
        tokio::fs::write(&full, content).await.map_err(|e| Self::map_io_err("write", e))
    }

    async fn delete(&self, raw_path: &str) -> ConvergeResult<()> {
        let normalized = path::normalize_for_write(raw_path)?;
        let full = self.resolve(&normalized);
        match tokio::fs::remove_file(&full).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ConvergeError::NotFound { collection: String::new(), id: normalized })
            }
            Err(e) => Err(Self::map_io_err("delete", e)),
        }
    }

    async fn exists(&self, raw_path: &str) -> ConvergeResult<bool> {
        let normalized = path::normalize(raw_path)?;
        let full = self.resolve(&normalized);
        match tokio::fs::metadata(&full).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Self::map_io_err("exists", e)),
        }
    }

    async fn list(&self, raw_directory: &str) -> ConvergeResult<Vec<String>> {
        let normalized = path::normalize(raw_directory)?;
        let full = self.resolve(&normalized);

        let mut entries = Vec::new();
        let mut read_dir = match tokio::fs::read_dir(&full).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(entries),
            Err(e) => return Err(Self::map_io_err("list", e)),
        };

        while let Some(entry) = read_dir.next_entry().await.map_err(|e| Self::map_io_err("list", e))? {
            match entry.file_name().into_string() {
                Ok(name) => entries.push(name),
                Err(_) => warn!(path = %entry.path().display(), "skipping non-UTF8 directory entry"),
            }
        }
        entries.sort();
        Ok(entries)
    }
}
