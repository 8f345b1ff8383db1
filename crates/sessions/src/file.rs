//! Directory-backed backend: one file per session.
//!
//! Every write goes to a temp file in the same directory and is then
//! renamed over the target, so a reader sees either the previous file or
//! the new one in full.  Blocking filesystem calls run on the tokio
//! blocking pool.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use gd_domain::error::{Error, Result};

use crate::backend::SessionBackend;

const EXTENSION: &str = "session";
const MAX_ID_LEN: usize = 128;

pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Open (creating if needed) a session directory.
    pub fn new(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir).map_err(Error::Io)?;

        tracing::info!(path = %dir.display(), "file session backend opened");

        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> Result<PathBuf> {
        validate_id(id)?;
        Ok(self.dir.join(format!("{id}.{EXTENSION}")))
    }
}

/// Identifiers become file names, so only `[A-Za-z0-9_-]` is accepted.
fn validate_id(id: &str) -> Result<()> {
    let ok = !id.is_empty()
        && id.len() <= MAX_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if ok {
        Ok(())
    } else {
        Err(Error::InvalidId(id.to_owned()))
    }
}

fn write_atomic(dir: &Path, path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

fn remove_if_present(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::Io(e)),
    }
}

async fn blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Other(format!("spawn_blocking join: {e}")))?
}

#[async_trait]
impl SessionBackend for FileBackend {
    async fn get(&self, id: &str) -> Result<Vec<u8>> {
        let path = self.path_for(id)?;
        let owned_id = id.to_owned();
        blocking(move || match std::fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(owned_id))
            }
            Err(e) => Err(Error::Io(e)),
        })
        .await
    }

    async fn put(&self, id: &str, bytes: Vec<u8>) -> Result<()> {
        let path = self.path_for(id)?;
        let dir = self.dir.clone();
        blocking(move || write_atomic(&dir, &path, &bytes)).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let path = self.path_for(id)?;
        blocking(move || remove_if_present(&path)).await
    }

    /// Writes the new file before removing the old one: a crash in between
    /// leaves both records on disk, never neither.
    async fn rename(&self, old_id: &str, new_id: &str, bytes: Vec<u8>) -> Result<()> {
        let old_path = self.path_for(old_id)?;
        let new_path = self.path_for(new_id)?;
        let dir = self.dir.clone();
        blocking(move || {
            write_atomic(&dir, &new_path, &bytes)?;
            remove_if_present(&old_path)
        })
        .await
    }

    async fn ids(&self) -> Result<Vec<String>> {
        let dir = self.dir.clone();
        blocking(move || {
            let mut ids = Vec::new();
            for entry in std::fs::read_dir(&dir)? {
                let path = entry?.path();
                if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                    continue;
                }
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(stem.to_owned());
                }
            }
            Ok(ids)
        })
        .await
    }

    fn name(&self) -> &str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn backend() -> (tempfile::TempDir, FileBackend) {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path()).unwrap();
        (dir, backend)
    }

    #[tokio::test]
    async fn put_get_delete() {
        let (_dir, backend) = backend();
        backend.put("abc", b"payload".to_vec()).await.unwrap();
        assert_eq!(backend.get("abc").await.unwrap(), b"payload");

        backend.delete("abc").await.unwrap();
        assert!(backend.get("abc").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn delete_missing_twice_succeeds() {
        let (_dir, backend) = backend();
        backend.delete("missing").await.unwrap();
        backend.delete("missing").await.unwrap();
    }

    #[tokio::test]
    async fn overwrite_replaces_whole_value() {
        let (_dir, backend) = backend();
        backend.put("abc", vec![1; 4096]).await.unwrap();
        backend.put("abc", vec![2; 16]).await.unwrap();
        assert_eq!(backend.get("abc").await.unwrap(), vec![2; 16]);
    }

    #[tokio::test]
    async fn rename_moves_file() {
        let (_dir, backend) = backend();
        backend.put("old", b"1".to_vec()).await.unwrap();
        backend.rename("old", "new", b"2".to_vec()).await.unwrap();

        assert!(backend.get("old").await.is_err());
        assert_eq!(backend.get("new").await.unwrap(), b"2");
        assert_eq!(backend.ids().await.unwrap(), vec!["new".to_string()]);
    }

    #[tokio::test]
    async fn path_traversal_is_rejected() {
        let (_dir, backend) = backend();
        for bad in ["../etc/passwd", "a/b", "", "with space"] {
            let err = backend.put(bad, vec![]).await.unwrap_err();
            assert!(matches!(err, Error::InvalidId(_)), "accepted {bad:?}");
        }
    }

    #[tokio::test]
    async fn ids_skip_foreign_files() {
        let (dir, backend) = backend();
        backend.put("keep", vec![]).await.unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        assert_eq!(backend.ids().await.unwrap(), vec!["keep".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_distinct_keys() {
        let (_dir, backend) = backend();
        let backend = Arc::new(backend);
        let mut handles = Vec::new();

        for i in 0..16 {
            let backend = Arc::clone(&backend);
            handles.push(tokio::spawn(async move {
                let id = format!("s{i}");
                backend.put(&id, vec![i as u8; 64]).await.unwrap();
                assert_eq!(backend.get(&id).await.unwrap(), vec![i as u8; 64]);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(backend.ids().await.unwrap().len(), 16);
    }
}
