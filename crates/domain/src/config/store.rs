use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session store backend
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Which backend holds the encoded session records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Process-local map.  Sessions are lost on restart.
    #[default]
    Memory,
    /// One file per session under `path`.
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: BackendKind,

    /// Directory for the file backend.  Ignored by the memory backend.
    #[serde(default = "d_path")]
    pub path: String,

    /// Upper bound on a single backend call.  Exceeding it surfaces as an
    /// I/O error with `ErrorKind::TimedOut`.
    #[serde(default = "d_op_timeout_ms")]
    pub op_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Memory,
            path: d_path(),
            op_timeout_ms: d_op_timeout_ms(),
        }
    }
}

fn d_path() -> String {
    "state/sessions".into()
}

fn d_op_timeout_ms() -> u64 {
    5_000
}
