//! An in-process `Storage` adapter: a `path -> content` map guarded by a
//! `tokio::sync::RwLock`. This is the reference adapter exercised throughout
//! the workspace's test suite; it enforces the same path-normalization
//! rules any adapter must.

use async_trait::async_trait;
use convergedb_core::{path, ConvergeError, ConvergeResult, Storage};
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryStorage {
    blobs: RwLock<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn read(&self, raw_path: &str) -> ConvergeResult<Option<String>> {
        let normalized = path::normalize(raw_path)?;
        Ok(self.blobs.read().await.get(&normalized).cloned())
    }

    async fn write(&self, raw_path: &str, content: &str) -> ConvergeResult<()> {
        let normalized = path::normalize_for_write(raw_path)?;
        self.blobs.write().await.insert(normalized, content.to_string());
        Ok(())
    }

    async fn delete(&self, raw_path: &str) -> ConvergeResult<()> {
        let normalized = path::normalize_for_write(raw_path)?;
        let mut blobs = self.blobs.write().await;
        if blobs.remove(&normalized).is_none() {
            return Err(ConvergeError::NotFound { collection: String::new(), id: normalized });
        }
        Ok(())
    }

    async fn exists(&self, raw_path: &str) -> ConvergeResult<bool> {
        let normalized = path::normalize(raw_path)?;
        Ok(self.blobs.read().await.contains_key(&normalized))
    }

    async fn list(&self, raw_directory: &str) -> ConvergeResult<Vec<String>> {
        let normalized = path::normalize(raw_directory)?;
        let prefix = if normalized.is_empty() { String::new() } else { format!("{normalized}/") };
        let blobs = self.blobs.read().await;

        let mut children = BTreeSet::new();
        for key in blobs.keys() {
            if let Some(rest) = key.strip_prefix(&prefix) {
                if rest.is_empty() {
                    continue;
                }
                let first_segment = rest.split('/').next().unwrap_or(rest);
                children.insert(first_segment.to_string());
            }
        }
        Ok(children.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let storage = MemoryStorage::new();
        storage.write("users/u1.json", "{}").await.unwrap();
        assert_eq!(storage.read("users/u1.json").await.unwrap(), Some("{}".to_string()));
    }

    #[tokio::test]
    async fn list_collapses_nested_entries_to_their_name() {
        let storage = MemoryStorage::new();
        storage.write("users/u1.json", "{}").await.unwrap();
        storage.write("users/u2.json", "{}").await.unwrap();
        storage.write("users/sub/deep.json", "{}").await.unwrap();

        let mut entries = storage.list("users").await.unwrap();
        entries.sort();
        assert_eq!(entries, vec!["sub".to_string(), "u1.json".to_string(), "u2.json".to_string()]);
    }

    #[tokio::test]
    async fn exists_reflects_presence() {
        let storage = MemoryStorage::new();
        assert!(!storage.exists("a").await.unwrap());
        storage.write("a", "x").await.unwrap();
        assert!(storage.exists("a").await.unwrap());
    }

    #[tokio::test]
    async fn delete_missing_is_not_found() {
        let storage = MemoryStorage::new();
        assert!(matches!(storage.delete("missing").await, Err(ConvergeError::NotFound { .. })));
    }

    #[tokio::test]
    async fn rejects_dotdot_and_nul_paths() {
        let storage = MemoryStorage::new();
        assert!(matches!(storage.write("../etc/passwd", "x").await, Err(ConvergeError::InvalidPath { .. })));
        assert!(matches!(storage.write("a\u{0}b", "x").await, Err(ConvergeError::InvalidPath { .. })));
    }

    #[tokio::test]
    async fn rejects_write_to_root() {
        let storage = MemoryStorage::new();
        assert!(matches!(storage.write("", "x").await, Err(ConvergeError::InvalidPath { .. })));
    }
}
