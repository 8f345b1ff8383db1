//! Session store maintenance commands.

use chrono::{DateTime, Utc};

use gd_domain::error::Error;
use gd_sessions::{Session, SessionStore};

pub async fn list(store: &SessionStore, json: bool) -> anyhow::Result<()> {
    let mut sessions = store.list().await?;
    sessions.sort_by_key(|s| s.lifetime_deadline());

    if json {
        println!("{}", serde_json::to_string_pretty(&sessions)?);
        return Ok(());
    }

    let now = Utc::now();
    println!("{:<18} {:<8} {:<10} {:<10} {:>4}", "ID", "STATUS", "IDLE", "LIFETIME", "KEYS");
    for session in &sessions {
        println!("{}", summary_line(session, now));
    }
    println!("\n{} session(s) in {} backend", sessions.len(), store.backend_name());
    Ok(())
}

pub async fn show(store: &SessionStore, id: &str) -> anyhow::Result<()> {
    match store.get(id).await {
        Ok(session) => {
            println!("{}", serde_json::to_string_pretty(&session)?);
            Ok(())
        }
        Err(Error::NotFound(_)) => anyhow::bail!("no session with id {id}"),
        Err(e) => Err(e.into()),
    }
}

pub async fn revoke(store: &SessionStore, id: &str) -> anyhow::Result<()> {
    store.delete(id).await?;
    tracing::info!(backend = store.backend_name(), "session revoked");
    println!("revoked {id}");
    Ok(())
}

pub async fn purge(store: &SessionStore) -> anyhow::Result<()> {
    let removed = store.purge_expired(Utc::now()).await?;
    println!("purged {removed} session(s)");
    Ok(())
}

/// One row of `guardian list`: id prefix, status, and time left on the
/// idle and lifetime clocks.
fn summary_line(session: &Session, now: DateTime<Utc>) -> String {
    let id: String = session.id().chars().take(16).collect();
    let status = if session.is_valid() && session.expiry_at(now).is_none() {
        "valid"
    } else {
        "expired"
    };
    format!(
        "{:<18} {:<8} {:<10} {:<10} {:>4}",
        id,
        status,
        remaining(session.idle_deadline(), now),
        remaining(session.lifetime_deadline(), now),
        session.data().len(),
    )
}

fn remaining(deadline: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = deadline.signed_duration_since(now).num_seconds();
    if secs <= 0 {
        "-".into()
    } else if secs < 3600 {
        format!("{}m{:02}s", secs / 60, secs % 60)
    } else {
        format!("{}h{:02}m", secs / 3600, (secs % 3600) / 60)
    }
}
