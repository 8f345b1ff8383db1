//! Per-request context propagation.
//!
//! [`RequestContext`] is an immutable bag of values keyed by
//! [`ContextKey`].  Adding a value yields a new context; the original and
//! anything already in it are left untouched.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use sha2::{Digest, Sha256};

/// Opaque key under which a manager stores its session in a request
/// context.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContextKey(String);

impl ContextKey {
    /// Derive the key for a namespace.  Stable for a given namespace, so it
    /// is computed once per manager.
    pub fn for_namespace(namespace: &str) -> Self {
        let digest = Sha256::digest(format!("{namespace}_ctx").as_bytes());
        Self(hex::encode(digest))
    }

    /// Wrap an arbitrary key, for values that do not belong to a manager.
    pub fn named(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

type Entry = Arc<dyn Any + Send + Sync>;

#[derive(Clone, Default)]
pub struct RequestContext {
    values: Arc<HashMap<ContextKey, Entry>>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a context that also holds `value` under `key`.  An existing
    /// value under the same key is shadowed in the new context only.
    pub fn with_value<T>(&self, key: ContextKey, value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        let mut values = (*self.values).clone();
        values.insert(key, Arc::new(value));
        Self {
            values: Arc::new(values),
        }
    }

    /// Look up a value.  `None` if the key is absent or holds another type.
    pub fn get<T: Any>(&self, key: &ContextKey) -> Option<&T> {
        let entry: &(dyn Any + Send + Sync) = self.values.get(key)?.as_ref();
        entry.downcast_ref::<T>()
    }

    pub fn contains(&self, key: &ContextKey) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("keys", &self.values.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_stable_and_namespace_specific() {
        let a = ContextKey::for_namespace("web");
        assert_eq!(a, ContextKey::for_namespace("web"));
        assert_ne!(a, ContextKey::for_namespace("admin"));
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn with_value_does_not_mutate_original() {
        let request_id = ContextKey::named("request_id");
        let base = RequestContext::new().with_value(request_id.clone(), 7u64);

        let user = ContextKey::named("user");
        let extended = base.with_value(user.clone(), "alice".to_string());

        assert!(!base.contains(&user));
        assert_eq!(base.get::<u64>(&request_id), Some(&7));
        assert_eq!(extended.get::<u64>(&request_id), Some(&7));
        assert_eq!(extended.get::<String>(&user).map(String::as_str), Some("alice"));
        assert_eq!(extended.len(), 2);
    }

    #[test]
    fn wrong_type_is_none() {
        let key = ContextKey::named("n");
        let ctx = RequestContext::new().with_value(key.clone(), 1u32);
        assert!(ctx.get::<String>(&key).is_none());
    }
}
