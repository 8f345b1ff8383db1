use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session lifecycle
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Placeholder substituted with the manager namespace in `cookie_name`.
pub const NAMESPACE_PLACEHOLDER: &str = "{namespace}";

/// Timeouts and cookie settings applied by a session manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// Inactivity window.  Every successful request pushes the idle
    /// deadline this far into the future.
    #[serde(default = "d_idle")]
    pub idle_timeout_secs: u64,

    /// Interval after which the session identifier is rotated.
    #[serde(default = "d_renewal")]
    pub renewal_timeout_secs: u64,

    /// Absolute cap on session age, fixed at creation.
    #[serde(default = "d_lifetime")]
    pub lifetime_secs: u64,

    /// Cookie name template; `{namespace}` is replaced by the manager
    /// namespace.
    #[serde(default = "d_cookie_name")]
    pub cookie_name: String,

    /// Mark the cookie `Secure` (HTTPS only).
    #[serde(default = "d_true")]
    pub cookie_secure: bool,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: d_idle(),
            renewal_timeout_secs: d_renewal(),
            lifetime_secs: d_lifetime(),
            cookie_name: d_cookie_name(),
            cookie_secure: true,
        }
    }
}

impl LifecycleConfig {
    /// Render the cookie name for a given namespace.
    pub fn cookie_name_for(&self, namespace: &str) -> String {
        self.cookie_name.replace(NAMESPACE_PLACEHOLDER, namespace)
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_idle() -> u64 {
    15 * 60
}
fn d_renewal() -> u64 {
    60
}
fn d_lifetime() -> u64 {
    2 * 60 * 60
}
fn d_cookie_name() -> String {
    format!("session_{NAMESPACE_PLACEHOLDER}")
}
fn d_true() -> bool {
    true
}
