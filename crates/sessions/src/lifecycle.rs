//! Session lifecycle — idle, renewal, and lifetime clocks.
//!
//! Evaluated once per request against the loaded record.  Idle and
//! lifetime expiry are checked before renewal, so a session past its idle
//! deadline is invalidated even when its renewal is also due.  Otherwise a
//! due renewal rotates the identifier, and every surviving request pushes
//! the idle deadline out.  The lifetime deadline never moves.

use std::fmt;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};

use gd_domain::config::LifecycleConfig;
use gd_domain::error::{Error, Result};
use gd_domain::trace::{id_prefix, TraceEvent};

use crate::context::{ContextKey, RequestContext};
use crate::registry::{NamespaceRegistration, NamespaceRegistry};
use crate::session::{InvalidationReason, SameSite, Session, SessionCookie};
use crate::session_id::{generate_session_id, is_well_formed};
use crate::store::SessionStore;

/// Outcome of one lifecycle evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Still valid; idle deadline extended.
    Refreshed,
    /// Still valid; identifier rotated and persisted.
    Renewed { previous_id: String },
    /// Terminal.  Removed from the store and the cookie cleared.
    Invalidated(InvalidationReason),
}

impl Transition {
    pub fn is_valid(&self) -> bool {
        !matches!(self, Self::Invalidated(_))
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Refreshed => write!(f, "refreshed"),
            Self::Renewed { previous_id } => {
                write!(f, "renewed (was {})", id_prefix(previous_id))
            }
            Self::Invalidated(reason) => write!(f, "invalidated ({reason})"),
        }
    }
}

/// The three session clocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub idle: Duration,
    pub renewal: Duration,
    pub lifetime: Duration,
}

impl Timeouts {
    fn from_config(config: &LifecycleConfig) -> Result<Self> {
        Ok(Self {
            idle: secs(config.idle_timeout_secs, "idle_timeout_secs")?,
            renewal: secs(config.renewal_timeout_secs, "renewal_timeout_secs")?,
            lifetime: secs(config.lifetime_secs, "lifetime_secs")?,
        })
    }

    fn validate(&self) -> Result<()> {
        for (name, d) in [
            ("idle timeout", self.idle),
            ("renewal timeout", self.renewal),
            ("lifetime", self.lifetime),
        ] {
            if d <= Duration::zero() {
                return Err(Error::Config(format!("{name} must be greater than 0")));
            }
            deadline(Utc::now(), d, name)?;
        }
        Ok(())
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            idle: Duration::minutes(15),
            renewal: Duration::minutes(1),
            lifetime: Duration::hours(2),
        }
    }
}

fn secs(value: u64, field: &str) -> Result<Duration> {
    let value = i64::try_from(value)
        .map_err(|_| Error::Config(format!("{field} is out of range")))?;
    Duration::try_seconds(value).ok_or_else(|| Error::Config(format!("{field} is out of range")))
}

fn from_std(value: StdDuration, field: &str) -> Result<Duration> {
    Duration::from_std(value).map_err(|_| Error::Config(format!("{field} is out of range")))
}

/// `now + d`, or a config error when the result is past the last
/// representable instant.
fn deadline(now: DateTime<Utc>, d: Duration, field: &str) -> Result<DateTime<Utc>> {
    now.checked_add_signed(d)
        .ok_or_else(|| Error::Config(format!("{field} overflows the session clock")))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Builder
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct SessionManagerBuilder {
    namespace: String,
    store: SessionStore,
    registry: Arc<NamespaceRegistry>,
    config: LifecycleConfig,
    idle: Option<StdDuration>,
    renewal: Option<StdDuration>,
    lifetime: Option<StdDuration>,
}

impl SessionManagerBuilder {
    /// Take timeouts and cookie settings from configuration.  Explicit
    /// overrides below still win.
    pub fn config(mut self, config: LifecycleConfig) -> Self {
        self.config = config;
        self
    }

    pub fn idle_timeout(mut self, d: StdDuration) -> Self {
        self.idle = Some(d);
        self
    }

    pub fn renewal_timeout(mut self, d: StdDuration) -> Self {
        self.renewal = Some(d);
        self
    }

    pub fn lifetime(mut self, d: StdDuration) -> Self {
        self.lifetime = Some(d);
        self
    }

    /// Claim the namespace and build the manager.
    pub fn build(self) -> Result<SessionManager> {
        let mut timeouts = Timeouts::from_config(&self.config)?;
        if let Some(d) = self.idle {
            timeouts.idle = from_std(d, "idle timeout")?;
        }
        if let Some(d) = self.renewal {
            timeouts.renewal = from_std(d, "renewal timeout")?;
        }
        if let Some(d) = self.lifetime {
            timeouts.lifetime = from_std(d, "lifetime")?;
        }
        timeouts.validate()?;

        let cookie_name = self.config.cookie_name_for(&self.namespace);
        if cookie_name.trim().is_empty() {
            return Err(Error::Config("cookie name must not be empty".into()));
        }

        let registration = self.registry.register(&self.namespace)?;

        tracing::info!(
            namespace = %self.namespace,
            backend = self.store.backend_name(),
            idle_secs = timeouts.idle.num_seconds(),
            renewal_secs = timeouts.renewal.num_seconds(),
            lifetime_secs = timeouts.lifetime.num_seconds(),
            "session manager ready"
        );

        Ok(SessionManager {
            context_key: ContextKey::for_namespace(&self.namespace),
            namespace: self.namespace,
            store: self.store,
            timeouts,
            cookie_name,
            cookie_secure: self.config.cookie_secure,
            _registration: registration,
        })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Manager
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Owns the timeout policy and drives create / renew / invalidate.
///
/// Holds no per-request state; a session is mutated only by the task that
/// loaded it, until it is committed.
pub struct SessionManager {
    namespace: String,
    store: SessionStore,
    timeouts: Timeouts,
    cookie_name: String,
    cookie_secure: bool,
    context_key: ContextKey,
    _registration: NamespaceRegistration,
}

impl SessionManager {
    pub fn builder(
        namespace: impl Into<String>,
        store: SessionStore,
        registry: &Arc<NamespaceRegistry>,
    ) -> SessionManagerBuilder {
        SessionManagerBuilder {
            namespace: namespace.into(),
            store,
            registry: Arc::clone(registry),
            config: LifecycleConfig::default(),
            idle: None,
            renewal: None,
            lifetime: None,
        }
    }

    /// A manager with default timeouts (idle 15 min, renewal 1 min,
    /// lifetime 2 h).
    pub fn new(
        namespace: impl Into<String>,
        store: SessionStore,
        registry: &Arc<NamespaceRegistry>,
    ) -> Result<Self> {
        Self::builder(namespace, store, registry).build()
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    pub fn context_key(&self) -> &ContextKey {
        &self.context_key
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    // ── Creation ────────────────────────────────────────────────────

    pub async fn create(&self) -> Result<Session> {
        self.create_at(Utc::now()).await
    }

    /// Create and persist a new session with all three deadlines computed
    /// from `now`.  The caller attaches the outbound cookie.
    pub async fn create_at(&self, now: DateTime<Utc>) -> Result<Session> {
        let idle_deadline = deadline(now, self.timeouts.idle, "idle timeout")?;
        let renewal_deadline = deadline(now, self.timeouts.renewal, "renewal timeout")?;
        let lifetime_deadline = deadline(now, self.timeouts.lifetime, "lifetime")?;
        let id = generate_session_id();
        let cookie = SessionCookie {
            name: self.cookie_name.clone(),
            value: id.clone(),
            expires: lifetime_deadline,
            path: "/".into(),
            http_only: true,
            secure: self.cookie_secure,
            same_site: SameSite::Lax,
        };
        let session = Session::new(
            id,
            idle_deadline,
            renewal_deadline,
            lifetime_deadline,
            cookie,
        );

        self.store.save(&session).await?;

        TraceEvent::SessionCreated {
            namespace: self.namespace.clone(),
            session_id: id_prefix(session.id()),
        }
        .emit();

        Ok(session)
    }

    // ── Per-request evaluation ──────────────────────────────────────

    pub async fn evaluate(&self, session: &mut Session) -> Result<Transition> {
        self.evaluate_at(session, Utc::now()).await
    }

    /// Apply the lifecycle rules to `session` at `now`.
    ///
    /// Rotation failures are returned as errors after the session has been
    /// invalidated locally; the caller should force re-authentication.
    pub async fn evaluate_at(
        &self,
        session: &mut Session,
        now: DateTime<Utc>,
    ) -> Result<Transition> {
        if !session.is_valid() {
            return Err(Error::NotFound(session.id().to_owned()));
        }

        if let Some(reason) = session.expiry_at(now) {
            self.invalidate_at(session, now, reason).await;
            return Ok(Transition::Invalidated(reason));
        }

        session.extend_idle(deadline(now, self.timeouts.idle, "idle timeout")?);

        if session.renewal_due_at(now) {
            let previous_id = self.rotate(session, now).await?;
            return Ok(Transition::Renewed { previous_id });
        }

        Ok(Transition::Refreshed)
    }

    /// Load `id` and evaluate it.  A stored record that is already invalid
    /// is removed and reported as not found.
    pub async fn resume(&self, id: &str) -> Result<(Session, Transition)> {
        self.resume_at(id, Utc::now()).await
    }

    pub async fn resume_at(&self, id: &str, now: DateTime<Utc>) -> Result<(Session, Transition)> {
        // Whatever the backend would make of it, a value this manager could
        // not have issued is simply an unknown session.
        if !is_well_formed(id) {
            return Err(Error::NotFound(id.to_owned()));
        }
        let mut session = self.store.get(id).await?;
        if !session.is_valid() {
            self.delete_logged(id).await;
            return Err(Error::NotFound(id.to_owned()));
        }
        let transition = self.evaluate_at(&mut session, now).await?;
        Ok((session, transition))
    }

    /// Persist the session after the request has been handled.  Invalid
    /// sessions are never written back.
    pub async fn commit(&self, session: &Session) -> Result<()> {
        if !session.is_valid() {
            return Ok(());
        }
        self.store.save(session).await
    }

    // ── Invalidation ────────────────────────────────────────────────

    /// Caller-initiated invalidation.  Always succeeds from the caller's
    /// point of view; a failed store delete is logged.
    pub async fn invalidate(&self, session: &mut Session) {
        self.invalidate_at(session, Utc::now(), InvalidationReason::Revoked)
            .await;
    }

    async fn invalidate_at(
        &self,
        session: &mut Session,
        now: DateTime<Utc>,
        reason: InvalidationReason,
    ) {
        // The cookie is cleared whether or not the delete lands.
        self.delete_logged(session.id()).await;
        let expired = now
            .checked_sub_signed(self.timeouts.idle)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        session.mark_invalid(expired);

        TraceEvent::SessionInvalidated {
            namespace: self.namespace.clone(),
            session_id: id_prefix(session.id()),
            reason: reason.to_string(),
        }
        .emit();
    }

    async fn delete_logged(&self, id: &str) {
        if let Err(e) = self.store.delete(id).await {
            TraceEvent::SessionDeleteFailed {
                namespace: self.namespace.clone(),
                session_id: id_prefix(id),
                error: e.to_string(),
            }
            .emit();
            tracing::warn!(session = %id_prefix(id), error = %e, "session delete failed");
        }
    }

    // ── Rotation ────────────────────────────────────────────────────

    /// Give the session a new identifier and move its record.  Returns the
    /// previous identifier.
    async fn rotate(&self, session: &mut Session, now: DateTime<Utc>) -> Result<String> {
        let renewal_deadline = deadline(now, self.timeouts.renewal, "renewal timeout")?;
        let old_id = session.id().to_owned();
        session.rotate(generate_session_id(), renewal_deadline);

        match self.store.update(&old_id, session).await {
            Ok(()) => {
                TraceEvent::SessionRenewed {
                    namespace: self.namespace.clone(),
                    old_session_id: id_prefix(&old_id),
                    new_session_id: id_prefix(session.id()),
                }
                .emit();
                Ok(old_id)
            }
            Err(e) => {
                TraceEvent::SessionRotationLost {
                    namespace: self.namespace.clone(),
                    old_session_id: id_prefix(&old_id),
                    new_session_id: id_prefix(session.id()),
                    error: e.to_string(),
                }
                .emit();
                // Neither identifier may authenticate again.
                self.delete_logged(&old_id).await;
                self.invalidate_at(session, now, InvalidationReason::RotationFailed)
                    .await;
                Err(e)
            }
        }
    }

    // ── Context propagation ─────────────────────────────────────────

    /// Return a context that also carries `session` under this manager's
    /// key.  Everything already in `ctx` stays retrievable.
    pub fn attach(&self, ctx: &RequestContext, session: Session) -> RequestContext {
        ctx.with_value(self.context_key.clone(), session)
    }

    /// The session attached by this manager, if any.
    pub fn session<'a>(&self, ctx: &'a RequestContext) -> Option<&'a Session> {
        ctx.get::<Session>(&self.context_key)
    }
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("namespace", &self.namespace)
            .field("backend", &self.store.backend_name())
            .field("timeouts", &self.timeouts)
            .field("cookie_name", &self.cookie_name)
            .finish()
    }
}
