//! Session persistence: codec + backend.
//!
//! The store is the only place an identifier is bound to stored bytes.
//! Every backend call is bounded by the configured timeout and surfaces
//! as an I/O error (`ErrorKind::TimedOut`) when it expires.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use gd_domain::config::{BackendKind, StoreConfig};
use gd_domain::error::{Error, Result};
use gd_domain::trace::{id_prefix, TraceEvent};

use crate::backend::SessionBackend;
use crate::codec;
use crate::file::FileBackend;
use crate::memory::MemoryBackend;
use crate::session::Session;

const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(5);

/// Public persistence API over a pluggable [`SessionBackend`].
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn SessionBackend>,
    op_timeout: Duration,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn SessionBackend>) -> Self {
        Self {
            backend,
            op_timeout: DEFAULT_OP_TIMEOUT,
        }
    }

    /// A store over a fresh [`MemoryBackend`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// Build the backend named by the configuration.
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        let backend: Arc<dyn SessionBackend> = match config.backend {
            BackendKind::Memory => Arc::new(MemoryBackend::new()),
            BackendKind::File => Arc::new(FileBackend::new(Path::new(&config.path))?),
        };
        Ok(Self::new(backend).with_op_timeout(Duration::from_millis(config.op_timeout_ms)))
    }

    pub fn with_op_timeout(mut self, timeout: Duration) -> Self {
        self.op_timeout = timeout;
        self
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Load and decode a record.  A corrupt payload is returned as a
    /// decode error, not treated as missing.
    pub async fn get(&self, id: &str) -> Result<Session> {
        let bytes = bounded(self.op_timeout, "get", self.backend.get(id)).await?;
        codec::decode(&bytes)
    }

    /// Encode and store a record under its own identifier.
    pub async fn save(&self, session: &Session) -> Result<()> {
        let bytes = codec::encode(session)?;
        bounded(self.op_timeout, "put", self.backend.put(session.id(), bytes)).await
    }

    /// Remove a record.  Idempotent.
    pub async fn delete(&self, id: &str) -> Result<()> {
        bounded(self.op_timeout, "delete", self.backend.delete(id)).await
    }

    /// Replace the record stored under `old_id` with `session`.
    ///
    /// Equivalent to delete-then-save.  When the identifier is unchanged this
    /// is a single put; otherwise it goes through the backend's `rename`,
    /// which is only atomic if the backend makes it so.  The backend work
    /// runs on its own task: once started it completes even if the caller's
    /// future is dropped.
    pub async fn update(&self, old_id: &str, session: &Session) -> Result<()> {
        let bytes = codec::encode(session)?;
        let backend = Arc::clone(&self.backend);
        let op_timeout = self.op_timeout;
        let old_id = old_id.to_owned();
        let new_id = session.id().to_owned();

        tokio::spawn(async move {
            if old_id == new_id {
                bounded(op_timeout, "put", backend.put(&new_id, bytes)).await
            } else {
                bounded(op_timeout, "rename", backend.rename(&old_id, &new_id, bytes)).await
            }
        })
        .await
        .map_err(|e| Error::Other(format!("update task: {e}")))?
    }

    /// Decode every enumerable record.  Records that fail to decode are
    /// skipped with a warning.
    pub async fn list(&self) -> Result<Vec<Session>> {
        let ids = bounded(self.op_timeout, "ids", self.backend.ids()).await?;
        let mut sessions = Vec::with_capacity(ids.len());
        for id in ids {
            match self.get(&id).await {
                Ok(session) => sessions.push(session),
                // Deleted between listing and loading.
                Err(Error::NotFound(_)) => {}
                Err(e) => {
                    tracing::warn!(session = %id_prefix(&id), error = %e, "skipping unreadable session");
                }
            }
        }
        Ok(sessions)
    }

    /// Delete every record that is invalid or past its idle or lifetime
    /// deadline at `now`.  Returns the number removed.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let sessions = self.list().await?;
        let scanned = sessions.len();
        let mut removed = 0;

        for session in sessions {
            if session.is_valid() && session.expiry_at(now).is_none() {
                continue;
            }
            self.delete(session.id()).await?;
            removed += 1;
        }

        TraceEvent::SessionsPurged {
            backend: self.backend_name().to_owned(),
            scanned,
            removed,
        }
        .emit();

        Ok(removed)
    }
}

async fn bounded<T>(
    op_timeout: Duration,
    op: &'static str,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(op_timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            format!("backend {op} timed out after {op_timeout:?}"),
        ))),
    }
}
