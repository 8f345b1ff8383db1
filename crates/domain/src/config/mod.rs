mod lifecycle;
mod observability;
mod store;

pub use lifecycle::*;
pub use observability::*;
pub use store::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl ConfigError {
    fn error(field: &str, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Error,
            field: field.into(),
            message: message.into(),
        }
    }

    fn warning(field: &str, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Warning,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

/// Upper bound for any lifecycle timeout.  Deadlines are computed as
/// `now + timeout` and must stay representable.
pub const MAX_TIMEOUT_SECS: u64 = 100 * 365 * 24 * 60 * 60;

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let lc = &self.lifecycle;

        for (field, value) in [
            ("lifecycle.idle_timeout_secs", lc.idle_timeout_secs),
            ("lifecycle.renewal_timeout_secs", lc.renewal_timeout_secs),
            ("lifecycle.lifetime_secs", lc.lifetime_secs),
        ] {
            if value == 0 {
                errors.push(ConfigError::error(field, "timeout must be greater than 0"));
            } else if value > MAX_TIMEOUT_SECS {
                errors.push(ConfigError::error(
                    field,
                    format!("timeout must not exceed {MAX_TIMEOUT_SECS} seconds (100 years)"),
                ));
            }
        }

        // Sessions whose idle window outlasts the lifetime are capped by the
        // lifetime alone; legal, but almost always a typo.
        if lc.idle_timeout_secs >= lc.lifetime_secs {
            errors.push(ConfigError::warning(
                "lifecycle.idle_timeout_secs",
                "idle timeout is not shorter than the session lifetime",
            ));
        }

        if lc.renewal_timeout_secs >= lc.idle_timeout_secs {
            errors.push(ConfigError::warning(
                "lifecycle.renewal_timeout_secs",
                "renewal timeout is not shorter than the idle timeout; \
                 identifiers will rarely be rotated",
            ));
        }

        if lc.cookie_name.trim().is_empty() {
            errors.push(ConfigError::error(
                "lifecycle.cookie_name",
                "cookie name must not be empty",
            ));
        }

        if !lc.cookie_secure {
            errors.push(ConfigError::warning(
                "lifecycle.cookie_secure",
                "session cookies will be sent over plain HTTP",
            ));
        }

        if self.store.op_timeout_ms == 0 {
            errors.push(ConfigError::error(
                "store.op_timeout_ms",
                "backend timeout must be greater than 0",
            ));
        }

        if self.store.backend == BackendKind::File && self.store.path.trim().is_empty() {
            errors.push(ConfigError::error(
                "store.path",
                "file backend requires a directory path",
            ));
        }

        errors
    }

    /// `true` when `validate` reports no errors (warnings are allowed).
    pub fn is_valid(&self) -> bool {
        self.validate()
            .iter()
            .all(|e| e.severity != ConfigSeverity::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate_cleanly() {
        let issues = Config::default().validate();
        assert!(issues.is_empty(), "unexpected issues: {issues:?}");
    }

    #[test]
    fn zero_timeout_is_an_error() {
        let mut config = Config::default();
        config.lifecycle.idle_timeout_secs = 0;
        let issues = config.validate();
        assert!(issues
            .iter()
            .any(|e| e.field == "lifecycle.idle_timeout_secs"
                && e.severity == ConfigSeverity::Error));
        assert!(!config.is_valid());
    }

    #[test]
    fn absurd_lifetime_is_an_error() {
        let mut config = Config::default();
        config.lifecycle.lifetime_secs = 10_000_000_000_000;
        let issues = config.validate();
        assert!(issues
            .iter()
            .any(|e| e.field == "lifecycle.lifetime_secs"
                && e.severity == ConfigSeverity::Error));

        config.lifecycle.lifetime_secs = MAX_TIMEOUT_SECS;
        assert!(config.is_valid());
    }

    #[test]
    fn idle_longer_than_lifetime_is_a_warning() {
        let mut config = Config::default();
        config.lifecycle.idle_timeout_secs = 10_000;
        let issues = config.validate();
        assert!(issues
            .iter()
            .any(|e| e.severity == ConfigSeverity::Warning));
        assert!(config.is_valid());
    }

    #[test]
    fn file_backend_needs_path() {
        let mut config = Config::default();
        config.store.backend = BackendKind::File;
        config.store.path = String::new();
        assert!(!config.is_valid());
    }

    #[test]
    fn display_tags_severity() {
        let issue = ConfigError::error("store.path", "missing");
        assert_eq!(issue.to_string(), "[ERROR] store.path: missing");
    }
}
