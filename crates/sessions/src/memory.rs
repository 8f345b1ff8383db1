//! In-process backend.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use gd_domain::error::{Error, Result};

use crate::backend::SessionBackend;

/// Process-local backend.  Sessions are lost when the process exits.
///
/// A single reader/writer lock guards the whole map (not sharded): readers
/// run in parallel, writers exclude everyone.  Adequate for moderate
/// concurrency.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl SessionBackend for MemoryBackend {
    async fn get(&self, id: &str) -> Result<Vec<u8>> {
        self.entries
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(id.to_owned()))
    }

    async fn put(&self, id: &str, bytes: Vec<u8>) -> Result<()> {
        self.entries.write().insert(id.to_owned(), bytes);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.entries.write().remove(id);
        Ok(())
    }

    /// Atomic: both keys change under one write lock.
    async fn rename(&self, old_id: &str, new_id: &str, bytes: Vec<u8>) -> Result<()> {
        let mut entries = self.entries.write();
        entries.remove(old_id);
        entries.insert(new_id.to_owned(), bytes);
        Ok(())
    }

    async fn ids(&self) -> Result<Vec<String>> {
        Ok(self.entries.read().keys().cloned().collect())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn put_then_get() {
        let backend = MemoryBackend::new();
        backend.put("s1", b"hello".to_vec()).await.unwrap();
        assert_eq!(backend.get("s1").await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let backend = MemoryBackend::new();
        let err = backend.get("nope").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let backend = MemoryBackend::new();
        backend.delete("ghost").await.unwrap();
        backend.delete("ghost").await.unwrap();
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn rename_replaces_key() {
        let backend = MemoryBackend::new();
        backend.put("a", b"1".to_vec()).await.unwrap();
        backend.rename("a", "b", b"2".to_vec()).await.unwrap();

        assert!(backend.get("a").await.is_err());
        assert_eq!(backend.get("b").await.unwrap(), b"2");
        assert_eq!(backend.len(), 1);
    }

    #[tokio::test]
    async fn ids_lists_all_keys() {
        let backend = MemoryBackend::new();
        backend.put("a", vec![]).await.unwrap();
        backend.put("b", vec![]).await.unwrap();
        let mut ids = backend.ids().await.unwrap();
        ids.sort();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_writers_and_readers() {
        let backend = Arc::new(MemoryBackend::new());
        let mut handles = Vec::new();

        for i in 0..64 {
            let backend = Arc::clone(&backend);
            handles.push(tokio::spawn(async move {
                let id = format!("session-{i}");
                let payload = vec![i as u8; 256];
                for _ in 0..50 {
                    backend.put(&id, payload.clone()).await.unwrap();
                    let got = backend.get(&id).await.unwrap();
                    assert_eq!(got, payload);
                }
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(backend.len(), 64);
    }
}
