use std::time::Duration;

use serde_json::json;
use sessionward::prelude::*;

// ---------------------------------------------------------------------------
// Walkthrough
// ---------------------------------------------------------------------------

/// How long the demo stays idle before checking the session again.
const IDLE: Duration = Duration::from_secs(6);

/// What the walkthrough observed.
#[derive(Debug)]
struct Outcome {
    session_id: SessionId,
    before_idle: SessionData,
    expired: bool,
}

/// Create a session, store a website in it, read it back, then go idle
/// long enough for the reaper to evict it.
async fn walkthrough(manager: &SessionManager, idle: Duration) -> Result<Outcome, SessionwardError> {
    let session_id = manager.create_session().await?;
    tracing::info!(%session_id, "created new session");

    let mut data = SessionData::new();
    data.insert("website".into(), json!("longhoang.de"));
    manager.update_session_data(&session_id, data).await?;
    tracing::info!(%session_id, "set website to longhoang.de");

    let before_idle = manager.get_session_data(&session_id).await?;
    tracing::info!(%session_id, data = ?before_idle, "read session data");

    tracing::info!(idle_secs = idle.as_secs(), "going idle");
    tokio::time::sleep(idle).await;

    let expired = match manager.get_session_data(&session_id).await {
        Ok(data) => {
            tracing::warn!(%session_id, ?data, "session survived the idle period");
            false
        }
        Err(SessionError::NotFound(_)) => {
            tracing::info!(%session_id, "session was evicted");
            true
        }
        Err(e) => return Err(e.into()),
    };

    Ok(Outcome {
        session_id,
        before_idle,
        expired,
    })
}

#[tokio::main]
async fn main() -> Result<(), SessionwardError> {
    init_tracing("info,sessionward_reaper=debug")?;

    let manager = SessionManager::new();
    let outcome = walkthrough(&manager, IDLE).await?;
    let metrics = manager.shutdown().await?;

    println!(
        "session {}: {} before idling, {} after {}s (reaper: {} scans, {} evicted)",
        outcome.session_id,
        serde_json::Value::Object(outcome.before_idle.into_iter().collect()),
        if outcome.expired { "gone" } else { "still present" },
        IDLE.as_secs(),
        metrics.total_scans,
        metrics.total_evicted,
    );
    Ok(())
}
