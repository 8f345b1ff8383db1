use serde::Serialize;

/// Structured trace events emitted across all guardian crates.
///
/// Session identifiers are bearer secrets; events carry only a short
/// prefix (see [`id_prefix`]).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    SessionCreated {
        namespace: String,
        session_id: String,
    },
    SessionRenewed {
        namespace: String,
        old_session_id: String,
        new_session_id: String,
    },
    SessionInvalidated {
        namespace: String,
        session_id: String,
        reason: String,
    },
    SessionDeleteFailed {
        namespace: String,
        session_id: String,
        error: String,
    },
    SessionRotationLost {
        namespace: String,
        old_session_id: String,
        new_session_id: String,
        error: String,
    },
    SessionsPurged {
        backend: String,
        scanned: usize,
        removed: usize,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "gd_event");
    }
}

/// First eight characters of a session identifier, safe to log.
pub fn id_prefix(id: &str) -> String {
    id.chars().take(8).collect()
}
