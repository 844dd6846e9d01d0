use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::info;
use uuid::Uuid;

use crate::error::{EditorError, Result};
use crate::session::EditorSession;

struct Entry {
    session: EditorSession,
    last_touched: Instant,
}

/// What an idle sweep tore down.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Expired {
    pub sessions: usize,
    pub objects: usize,
}

/// Open editor sessions, keyed by session id. Only the admin who opened a
/// session may read, mutate or close it.
#[derive(Clone, Default)]
pub struct EditorSessions {
    inner: Arc<RwLock<HashMap<Uuid, Entry>>>,
}

impl EditorSessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn open(&self, session: EditorSession) -> Uuid {
        let id = session.id();
        info!("Editor session {} opened by {}", id, session.owner());
        self.inner.write().await.insert(
            id,
            Entry {
                session,
                last_touched: Instant::now(),
            },
        );
        id
    }

    pub async fn with_session<T>(
        &self,
        id: Uuid,
        owner: Uuid,
        f: impl FnOnce(&EditorSession) -> T,
    ) -> Result<T> {
        let mut sessions = self.inner.write().await;
        let entry = touch(&mut sessions, id, owner)?;
        Ok(f(&entry.session))
    }

    pub async fn with_session_mut<T>(
        &self,
        id: Uuid,
        owner: Uuid,
        f: impl FnOnce(&mut EditorSession) -> Result<T>,
    ) -> Result<T> {
        let mut sessions = self.inner.write().await;
        let entry = touch(&mut sessions, id, owner)?;
        f(&mut entry.session)
    }

    /// Tear a session down, revoking its transient objects.
    pub async fn close(&self, id: Uuid, owner: Uuid) -> Result<usize> {
        let mut sessions = self.inner.write().await;
        let entry = sessions.get(&id).ok_or(EditorError::SessionNotFound(id))?;
        check_owner(&entry.session, owner)?;

        let mut entry = sessions.remove(&id).ok_or(EditorError::SessionNotFound(id))?;
        let revoked = entry.session.close();
        info!("Editor session {} closed ({} objects revoked)", id, revoked);
        Ok(revoked)
    }

    /// Tear down every session nobody has used for `max_idle`.
    pub async fn expire_idle(&self, max_idle: Duration) -> Expired {
        let mut sessions = self.inner.write().await;
        let idle: Vec<Uuid> = sessions
            .iter()
            .filter(|(_, entry)| entry.last_touched.elapsed() >= max_idle)
            .map(|(id, _)| *id)
            .collect();

        let mut expired = Expired::default();
        for id in idle {
            if let Some(mut entry) = sessions.remove(&id) {
                let revoked = entry.session.close();
                info!(
                    "Editor session {} of {} expired after inactivity ({} objects revoked)",
                    id,
                    entry.session.owner(),
                    revoked
                );
                expired.sessions += 1;
                expired.objects += revoked;
            }
        }
        expired
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

fn touch(sessions: &mut HashMap<Uuid, Entry>, id: Uuid, owner: Uuid) -> Result<&mut Entry> {
    let entry = sessions.get_mut(&id).ok_or(EditorError::SessionNotFound(id))?;
    check_owner(&entry.session, owner)?;
    entry.last_touched = Instant::now();
    Ok(entry)
}

fn check_owner(session: &EditorSession, owner: Uuid) -> Result<()> {
    if session.owner() != owner {
        return Err(EditorError::NotOwner(session.id()));
    }
    Ok(())
}
