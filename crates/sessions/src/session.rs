//! The persisted session record.
//!
//! A [`Session`] carries an opaque identifier, a validity flag, a typed
//! data map, and three deadlines.  The lifetime deadline is fixed when the
//! record is created; only the lifecycle manager moves the idle and
//! renewal deadlines or rotates the identifier.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Data values
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A value stored in a session's data map.
///
/// Externally tagged on the wire so that the variant survives a round
/// trip (an `Int` never comes back as a `Float`, `Bytes` never as a list).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Bytes(Vec<u8>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Floats only.  Integers are not widened: above 2^53 that would
    /// silently lose precision.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(v: BTreeMap<String, Value>) -> Self {
        Self::Map(v)
    }
}

/// String-keyed session payload.
pub type SessionData = BTreeMap<String, Value>;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Status & invalidation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Valid,
    /// Terminal.  An invalid session never authenticates a request again.
    Invalid,
}

/// Why a session stopped being valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationReason {
    IdleTimeout,
    LifetimeExceeded,
    /// Explicit caller request.
    Revoked,
    /// The identifier rotation could not be persisted.
    RotationFailed,
}

impl fmt::Display for InvalidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IdleTimeout => write!(f, "idle timeout"),
            Self::LifetimeExceeded => write!(f, "lifetime exceeded"),
            Self::Revoked => write!(f, "revoked"),
            Self::RotationFailed => write!(f, "rotation failed"),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Cookie
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    Strict,
    #[default]
    Lax,
    None,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => write!(f, "Strict"),
            Self::Lax => write!(f, "Lax"),
            Self::None => write!(f, "None"),
        }
    }
}

/// Transport metadata the HTTP layer needs to write the session cookie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionCookie {
    pub name: String,
    /// The session identifier; empty once the session is invalidated.
    pub value: String,
    pub expires: DateTime<Utc>,
    pub path: String,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: SameSite,
}

impl SessionCookie {
    /// Render a `Set-Cookie` header value.
    pub fn to_header_value(&self) -> String {
        let mut out = format!(
            "{}={}; Path={}; Expires={}",
            self.name,
            self.value,
            self.path,
            self.expires.format("%a, %d %b %Y %H:%M:%S GMT"),
        );
        if self.http_only {
            out.push_str("; HttpOnly");
        }
        if self.secure {
            out.push_str("; Secure");
        }
        out.push_str(&format!("; SameSite={}", self.same_site));
        out
    }

    /// `true` once the cookie has been cleared for removal.
    pub fn is_cleared(&self) -> bool {
        self.value.is_empty()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session record
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A session record as persisted by the [`SessionStore`](crate::SessionStore).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    id: String,
    status: SessionStatus,
    #[serde(default)]
    data: SessionData,
    idle_deadline: DateTime<Utc>,
    renewal_deadline: DateTime<Utc>,
    lifetime_deadline: DateTime<Utc>,
    cookie: SessionCookie,
}

impl Session {
    pub(crate) fn new(
        id: String,
        idle_deadline: DateTime<Utc>,
        renewal_deadline: DateTime<Utc>,
        lifetime_deadline: DateTime<Utc>,
        cookie: SessionCookie,
    ) -> Self {
        Self {
            id,
            status: SessionStatus::Valid,
            data: SessionData::new(),
            idle_deadline,
            renewal_deadline,
            lifetime_deadline,
            cookie,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_valid(&self) -> bool {
        self.status == SessionStatus::Valid
    }

    pub fn idle_deadline(&self) -> DateTime<Utc> {
        self.idle_deadline
    }

    pub fn renewal_deadline(&self) -> DateTime<Utc> {
        self.renewal_deadline
    }

    pub fn lifetime_deadline(&self) -> DateTime<Utc> {
        self.lifetime_deadline
    }

    pub fn cookie(&self) -> &SessionCookie {
        &self.cookie
    }

    pub fn data(&self) -> &SessionData {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut SessionData {
        &mut self.data
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Insert a value, returning the previous one under `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.data.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    /// Return the reason this session has expired at `now`, if it has.
    ///
    /// Deadlines are inclusive: reaching a deadline counts as passing it.
    pub fn expiry_at(&self, now: DateTime<Utc>) -> Option<InvalidationReason> {
        if now >= self.lifetime_deadline {
            Some(InvalidationReason::LifetimeExceeded)
        } else if now >= self.idle_deadline {
            Some(InvalidationReason::IdleTimeout)
        } else {
            None
        }
    }

    pub fn renewal_due_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.renewal_deadline
    }

    pub(crate) fn extend_idle(&mut self, deadline: DateTime<Utc>) {
        self.idle_deadline = deadline;
    }

    /// Swap in a fresh identifier and push the renewal deadline out.
    pub(crate) fn rotate(&mut self, new_id: String, renewal_deadline: DateTime<Utc>) {
        self.cookie.value = new_id.clone();
        self.id = new_id;
        self.renewal_deadline = renewal_deadline;
    }

    /// Mark the session invalid and clear the cookie so the transport
    /// layer removes it from the client.
    pub(crate) fn mark_invalid(&mut self, cookie_expires: DateTime<Utc>) {
        self.status = SessionStatus::Invalid;
        self.cookie.value.clear();
        self.cookie.expires = cookie_expires;
    }
}
