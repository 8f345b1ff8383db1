//! Namespace registry.
//!
//! Each session manager claims a namespace for as long as it lives.  The
//! registry is an explicit object rather than process-global state: share
//! one `Arc<NamespaceRegistry>` between the managers that must not collide,
//! and build a fresh one per test.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use gd_domain::error::{Error, Result};

#[derive(Debug, Default)]
pub struct NamespaceRegistry {
    names: Mutex<HashSet<String>>,
}

impl NamespaceRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Claim `namespace`.  The claim is released when the returned
    /// registration is dropped.
    pub fn register(self: &Arc<Self>, namespace: &str) -> Result<NamespaceRegistration> {
        if namespace.trim().is_empty() {
            return Err(Error::Config("namespace must not be empty".into()));
        }

        if !self.names.lock().insert(namespace.to_owned()) {
            return Err(Error::DuplicateNamespace(namespace.to_owned()));
        }

        tracing::debug!(namespace, "namespace registered");

        Ok(NamespaceRegistration {
            registry: Arc::clone(self),
            namespace: namespace.to_owned(),
        })
    }

    pub fn is_registered(&self, namespace: &str) -> bool {
        self.names.lock().contains(namespace)
    }

    pub fn len(&self) -> usize {
        self.names.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.lock().is_empty()
    }
}

/// Holds a namespace claim; releases it on drop.
#[derive(Debug)]
pub struct NamespaceRegistration {
    registry: Arc<NamespaceRegistry>,
    namespace: String,
}

impl NamespaceRegistration {
    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

impl Drop for NamespaceRegistration {
    fn drop(&mut self) {
        self.registry.names.lock().remove(&self.namespace);
        tracing::debug!(namespace = %self.namespace, "namespace released");
    }
}
