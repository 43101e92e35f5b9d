use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::policy::Role;

/// The authenticated identity held for the session, token included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub username: String,
    pub name: String,
    pub role: Role,
    pub token: String,
}

/// Single-instance session store. The identity is persisted to a JSON file
/// in the client state directory so a restart rehydrates it; it is destroyed
/// on logout or the first rejected token.
pub struct Session {
    path: PathBuf,
    current: Mutex<Option<Identity>>,
}

impl Session {
    /// Rehydrate the session from the state directory. A missing file, or
    /// one that no longer parses, means signed out rather than an error.
    pub fn load(state_dir: &Path) -> anyhow::Result<Self> {
        let path = state_dir.join("session.json");
        let current = if path.exists() {
            let json = fs::read_to_string(&path)?;
            serde_json::from_str(&json).ok()
        } else {
            None
        };
        Ok(Session {
            path,
            current: Mutex::new(current),
        })
    }

    pub fn current_user(&self) -> Option<Identity> {
        self.lock().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.lock().as_ref().map(|identity| identity.token.clone())
    }

    /// Persist a freshly minted identity. A write failure leaves the
    /// in-memory session usable for the rest of the process lifetime.
    pub(crate) fn store(&self, identity: Identity) {
        match serde_json::to_string_pretty(&identity) {
            Ok(json) => {
                if let Err(e) = fs::write(&self.path, json) {
                    tracing::warn!("Failed to persist session: {}", e);
                }
            }
            Err(e) => tracing::warn!("Failed to serialize session: {}", e),
        }
        *self.lock() = Some(identity);
    }

    /// Drop the identity and its persisted copy. Called on logout and on
    /// the first 401 from any resource call.
    pub(crate) fn clear(&self) {
        if self.path.exists() {
            if let Err(e) = fs::remove_file(&self.path) {
                tracing::warn!("Failed to remove persisted session: {}", e);
            }
        }
        *self.lock() = None;
    }

    fn lock(&self) -> MutexGuard<'_, Option<Identity>> {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
