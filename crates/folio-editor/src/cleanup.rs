use std::time::Duration;

use tracing::info;

use crate::registry::EditorSessions;

/// Background task that tears down abandoned editor sessions.
///
/// Every `interval`, sessions untouched for `max_idle` are closed and their
/// transient objects revoked.
pub async fn run_expiry_loop(sessions: EditorSessions, interval: Duration, max_idle: Duration) {
    let mut interval = tokio::time::interval(interval);

    loop {
        interval.tick().await;

        let expired = sessions.expire_idle(max_idle).await;
        if expired.sessions > 0 {
            info!(
                "Cleanup: expired {} idle editor sessions ({} objects revoked)",
                expired.sessions, expired.objects
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::EditorSession;
    use uuid::Uuid;

    #[tokio::test]
    async fn loop_sweeps_abandoned_sessions() {
        let sessions = EditorSessions::new();
        for _ in 0..5 {
            sessions.open(EditorSession::new(Uuid::new_v4())).await;
        }

        let task = tokio::spawn(run_expiry_loop(
            sessions.clone(),
            Duration::from_millis(10),
            Duration::from_millis(20),
        ));

        let mut drained = false;
        for _ in 0..100 {
            if sessions.is_empty().await {
                drained = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        task.abort();
        assert!(drained);
    }
}
