//! Authenticated-user context and its persistence port.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, anyhow};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use taskflow_shared::User;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

pub const SESSION_STORAGE_KEY: &str = "auth-storage";

/// Persisted form of the session, wrapped the same way the browser store
/// wraps it: `{"state": {...}, "version": 0}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub state: PersistedSession,
    #[serde(default)]
    pub version: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    pub token: Option<String>,
    pub user: Option<User>,
    #[serde(default)]
    pub is_authenticated: bool,
}

pub trait SessionStorage: Send + Sync {
    fn load(&self) -> anyhow::Result<Option<SessionSnapshot>>;
    fn save(&self, snapshot: &SessionSnapshot) -> anyhow::Result<()>;
}

/// Stores the session as `auth-storage.json` inside the data directory.
#[derive(Debug, Clone)]
pub struct FileSessionStorage {
    path: PathBuf,
}

impl FileSessionStorage {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(format!("{SESSION_STORAGE_KEY}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStorage for FileSessionStorage {
    #[tracing::instrument(skip(self), fields(file = %self.path.display()))]
    fn load(&self) -> anyhow::Result<Option<SessionSnapshot>> {
        if !self.path.exists() {
            debug!("no persisted session");
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed reading {}", self.path.display()))?;
        if raw.trim().is_empty() {
            return Ok(None);
        }
        let snapshot = serde_json::from_str(&raw)
            .with_context(|| format!("failed parsing {}", self.path.display()))?;
        Ok(Some(snapshot))
    }

    #[tracing::instrument(skip(self, snapshot), fields(file = %self.path.display()))]
    fn save(&self, snapshot: &SessionSnapshot) -> anyhow::Result<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

        let mut temp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer(&mut temp, snapshot)?;
        temp.flush()?;
        temp.persist(&self.path)
            .map_err(|err| anyhow!("failed to persist {}: {}", self.path.display(), err))?;
        Ok(())
    }
}

/// Keeps the snapshot in memory. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStorage {
    slot: Arc<Mutex<Option<SessionSnapshot>>>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Option<SessionSnapshot> {
        self.slot.lock().clone()
    }
}

impl SessionStorage for MemorySessionStorage {
    fn load(&self) -> anyhow::Result<Option<SessionSnapshot>> {
        Ok(self.slot.lock().clone())
    }

    fn save(&self, snapshot: &SessionSnapshot) -> anyhow::Result<()> {
        *self.slot.lock() = Some(snapshot.clone());
        Ok(())
    }
}

pub struct SessionState {
    token: Option<String>,
    user: Option<User>,
    storage: Box<dyn SessionStorage>,
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("user", &self.user)
            .finish()
    }
}

impl SessionState {
    /// Rehydrates from `storage`. Unreadable or half-written snapshots give
    /// an unauthenticated session.
    pub fn restore(storage: Box<dyn SessionStorage>) -> Self {
        let (token, user) = match storage.load() {
            Ok(Some(snapshot)) => {
                let PersistedSession { token, user, .. } = snapshot.state;
                match (token, user) {
                    (Some(token), Some(user)) => (Some(token), Some(user)),
                    _ => (None, None),
                }
            }
            Ok(None) => (None, None),
            Err(err) => {
                warn!(error = %format!("{err:#}"), "ignoring unreadable persisted session");
                (None, None)
            }
        };

        info!(
            authenticated = token.is_some(),
            user = ?user.as_ref().map(|u| u.username.as_str()),
            "session restored"
        );

        Self {
            token,
            user,
            storage,
        }
    }

    pub fn login(&mut self, token: String, user: User) {
        info!(user = %user.username, "session opened");
        self.token = Some(token);
        self.user = Some(user);
        self.persist();
    }

    pub fn logout(&mut self) {
        info!(user = ?self.user.as_ref().map(|u| u.username.as_str()), "session closed");
        self.token = None;
        self.user = None;
        self.persist();
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some() && self.user.is_some()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: PersistedSession {
                token: self.token.clone(),
                user: self.user.clone(),
                is_authenticated: self.is_authenticated(),
            },
            version: 0,
        }
    }

    fn persist(&self) {
        if let Err(err) = self.storage.save(&self.snapshot()) {
            warn!(error = %format!("{err:#}"), "failed to persist session");
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    fn user() -> User {
        User {
            id: "1".to_string(),
            username: "test".to_string(),
        }
    }

    #[test]
    fn login_then_logout_updates_derived_flag() {
        let mut session = SessionState::restore(Box::new(MemorySessionStorage::new()));
        assert!(!session.is_authenticated());

        session.login("tok".to_string(), user());
        assert!(session.is_authenticated());
        assert_eq!(session.token(), Some("tok"));
        assert_eq!(session.user().map(|u| u.username.as_str()), Some("test"));

        session.login("tok2".to_string(), user());
        assert_eq!(session.token(), Some("tok2"));

        session.logout();
        assert!(!session.is_authenticated());
        assert_eq!(session.token(), None);
        assert_eq!(session.user(), None);
    }

    #[test]
    fn every_mutation_is_saved() {
        let storage = MemorySessionStorage::new();
        let mut session = SessionState::restore(Box::new(storage.clone()));

        session.login("tok".to_string(), user());
        let saved = storage.snapshot().unwrap();
        assert!(saved.state.is_authenticated);
        assert_eq!(saved.state.token.as_deref(), Some("tok"));

        session.logout();
        let saved = storage.snapshot().unwrap();
        assert!(!saved.state.is_authenticated);
        assert_eq!(saved.state.user, None);
    }

    #[test]
    fn file_storage_survives_restart() {
        let temp = tempdir().unwrap();

        let mut session = SessionState::restore(Box::new(FileSessionStorage::new(temp.path())));
        session.login("fake-jwt-token-1".to_string(), user());
        drop(session);

        let raw = fs::read_to_string(temp.path().join("auth-storage.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["state"]["isAuthenticated"], true);
        assert_eq!(value["state"]["user"]["username"], "test");
        assert_eq!(value["version"], 0);

        let session = SessionState::restore(Box::new(FileSessionStorage::new(temp.path())));
        assert!(session.is_authenticated());
        assert_eq!(session.token(), Some("fake-jwt-token-1"));
    }

    #[test]
    fn corrupt_snapshot_restores_logged_out() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("auth-storage.json"), "{not json").unwrap();
        let session = SessionState::restore(Box::new(FileSessionStorage::new(temp.path())));
        assert!(!session.is_authenticated());
    }

    #[test]
    fn token_without_user_is_not_authenticated() {
        let storage = MemorySessionStorage::new();
        storage
            .save(&SessionSnapshot {
                state: PersistedSession {
                    token: Some("tok".to_string()),
                    user: None,
                    is_authenticated: true,
                },
                version: 0,
            })
            .unwrap();
        let session = SessionState::restore(Box::new(storage));
        assert!(!session.is_authenticated());
        assert_eq!(session.token(), None);
    }
}
