//! Pluggable byte storage behind the session store.

use async_trait::async_trait;

use gd_domain::error::{Error, Result};

/// Keyed byte storage for encoded session records.
///
/// Implementations must be safe under unbounded concurrent callers: a
/// `get` racing a `put` on the same key observes either the old or the
/// new value in full, never a mix.
#[async_trait]
pub trait SessionBackend: Send + Sync + 'static {
    /// Fetch the bytes stored under `id`.  Returns `Error::NotFound` when
    /// the key is absent.
    async fn get(&self, id: &str) -> Result<Vec<u8>>;

    /// Store `bytes` under `id`, replacing any previous value.
    async fn put(&self, id: &str, bytes: Vec<u8>) -> Result<()>;

    /// Remove `id`.  Removing an absent key succeeds.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Move a record from `old_id` to `new_id`, storing `bytes` under the
    /// new key.
    ///
    /// The default is delete-then-put and is NOT atomic: if the put fails
    /// the record is gone under both keys.  Backends that can do better
    /// should override this.
    async fn rename(&self, old_id: &str, new_id: &str, bytes: Vec<u8>) -> Result<()> {
        self.delete(old_id).await?;
        self.put(new_id, bytes).await
    }

    /// List every stored identifier.  Optional; used by sweeping and
    /// operator tooling.
    async fn ids(&self) -> Result<Vec<String>> {
        Err(Error::Other(format!(
            "{} backend cannot enumerate sessions",
            self.name()
        )))
    }

    /// Short backend name for logs.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use parking_lot::Mutex;

    // Minimal backend relying on every default method.
    #[derive(Default)]
    struct PlainBackend {
        entries: Mutex<HashMap<String, Vec<u8>>>,
        fail_puts: bool,
    }

    #[async_trait]
    impl SessionBackend for PlainBackend {
        async fn get(&self, id: &str) -> Result<Vec<u8>> {
            self.entries
                .lock()
                .get(id)
                .cloned()
                .ok_or_else(|| Error::NotFound(id.to_owned()))
        }

        async fn put(&self, id: &str, bytes: Vec<u8>) -> Result<()> {
            if self.fail_puts {
                return Err(Error::Io(std::io::Error::other("disk full")));
            }
            self.entries.lock().insert(id.to_owned(), bytes);
            Ok(())
        }

        async fn delete(&self, id: &str) -> Result<()> {
            self.entries.lock().remove(id);
            Ok(())
        }

        fn name(&self) -> &str {
            "plain"
        }
    }

    #[tokio::test]
    async fn default_rename_moves_record() {
        let backend = PlainBackend::default();
        backend.put("old", b"v1".to_vec()).await.unwrap();

        backend.rename("old", "new", b"v2".to_vec()).await.unwrap();

        assert!(backend.get("old").await.unwrap_err().is_not_found());
        assert_eq!(backend.get("new").await.unwrap(), b"v2");
    }

    #[tokio::test]
    async fn default_rename_loses_record_when_put_fails() {
        let backend = PlainBackend {
            fail_puts: true,
            ..Default::default()
        };
        backend
            .entries
            .lock()
            .insert("old".into(), b"v1".to_vec());

        let err = backend.rename("old", "new", b"v2".to_vec()).await.unwrap_err();

        assert!(err.is_retryable());
        assert!(backend.get("old").await.is_err());
        assert!(backend.get("new").await.is_err());
    }

    #[tokio::test]
    async fn default_ids_is_unsupported() {
        let backend = PlainBackend::default();
        let err = backend.ids().await.unwrap_err();
        assert!(err.to_string().contains("plain backend"));
    }
}
