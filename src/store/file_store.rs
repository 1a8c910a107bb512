use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::base::{SessionStore, SessionUpdate};
use crate::models::SessionState;

/// Persists the session as a JSON document so a restart keeps the user signed in.
///
/// The file is read once on open; every mutation rewrites it whole.
pub struct FileSessionStore {
    path: PathBuf,
    state: Mutex<SessionState>,
}

impl FileSessionStore {
    /// Opens the store, treating a missing file as an empty session.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref().to_path_buf();
        let state = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                format!("Failed to parse session file '{}': {}", path.display(), e)
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Session file '{}' not found, starting empty", path.display());
                SessionState::default()
            }
            Err(e) => {
                return Err(format!(
                    "Failed to read session file '{}': {}",
                    path.display(),
                    e
                ))
            }
        };

        Ok(FileSessionStore {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, state: &SessionState) -> Result<(), String> {
        let bytes = serde_json::to_vec_pretty(state)
            .map_err(|e| format!("Failed to serialize session: {}", e))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    format!("Failed to create '{}': {}", parent.display(), e)
                })?;
            }
        }

        // Write to a sibling file first so a crash never leaves a truncated session.
        let tmp_path = self.path.with_extension("tmp");
        tokio::fs::write(&tmp_path, &bytes)
            .await
            .map_err(|e| format!("Failed to write '{}': {}", tmp_path.display(), e))?;
        tokio::fs::rename(&tmp_path, &self.path).await.map_err(|e| {
            warn!("Failed to move session file into place: {}", e);
            format!("Failed to replace '{}': {}", self.path.display(), e)
        })
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self) -> Result<SessionState, String> {
        Ok(self.state.lock().await.clone())
    }

    // Memory holds the requested state even when the write fails.
    async fn save(&self, state: &SessionState) -> Result<(), String> {
        let mut guard = self.state.lock().await;
        *guard = state.clone();
        self.persist(&guard).await
    }

    async fn update(&self, update: SessionUpdate) -> Result<SessionState, String> {
        let mut guard = self.state.lock().await;
        update(&mut *guard);
        self.persist(&guard).await?;
        Ok(guard.clone())
    }

    fn is_persistent(&self) -> bool {
        true
    }
}
