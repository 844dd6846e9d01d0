use std::collections::HashSet;
use std::sync::Arc;

use tracing::error;

use folio_db::Database;
use folio_editor::EditorSessions;
use folio_gateway::dispatcher::Dispatcher;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub jwt_secret: String,
    pub dispatcher: Dispatcher,
    pub editors: EditorSessions,
    /// Usernames granted admin rights at login.
    pub admins: HashSet<String>,
    pub max_image_bytes: usize,
}

impl AppStateInner {
    /// Run a blocking store call off the async runtime.
    pub async fn blocking<F, T>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                ApiError::Store(anyhow::anyhow!("store task failed"))
            })?
            .map_err(ApiError::Store)
    }
}
