//! Admin session storage.
//!
//! Stores the session in `<base>/session.json` with restricted permissions
//! (0600). A separate `admin_hint` marker file is a low-trust hint for
//! display purposes only; the token is the single source of truth for
//! protected access and is re-validated by the backend on every call.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::paths;

/// Session filename under the enq home directory.
const SESSION_FILE: &str = "session.json";
/// Admin hint marker filename.
const ADMIN_HINT_FILE: &str = "admin_hint";

/// The authenticated user record returned by the backend.
///
/// Only `username` is interpreted; everything else is carried opaquely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// The authenticated identity and token held for the duration of an admin visit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: UserProfile,
}

/// File-backed session store.
#[derive(Debug, Clone)]
pub struct SessionStore {
    base: PathBuf,
}

impl SessionStore {
    /// Opens the store at the default enq home directory.
    pub fn open_default() -> Self {
        Self::at(paths::enq_home())
    }

    /// Opens the store at a specific base directory.
    pub fn at(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    fn session_path(&self) -> PathBuf {
        self.base.join(SESSION_FILE)
    }

    fn hint_path(&self) -> PathBuf {
        self.base.join(ADMIN_HINT_FILE)
    }

    /// Loads the stored session.
    ///
    /// An absent or malformed session file is treated as "not logged in",
    /// never as an error.
    pub fn load(&self) -> Option<Session> {
        let path = self.session_path();
        let contents = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&contents) {
            Ok(session) => Some(session),
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "Malformed session file, treating as logged out"
                );
                None
            }
        }
    }

    /// Persists the session and sets the admin hint marker.
    pub fn save(&self, session: &Session) -> Result<()> {
        let contents =
            serde_json::to_string_pretty(session).context("Failed to serialize session")?;
        write_restricted(&self.session_path(), &contents)?;
        write_restricted(&self.hint_path(), "true")?;
        Ok(())
    }

    /// Removes the session and the admin hint marker.
    ///
    /// Missing files are fine; clearing an empty store succeeds.
    pub fn clear(&self) -> Result<()> {
        remove_if_present(&self.session_path())?;
        remove_if_present(&self.hint_path())?;
        Ok(())
    }

    /// Fast, low-trust logged-in hint for display only.
    ///
    /// Independent of the token; never use it to gate protected access.
    pub fn admin_hint(&self) -> bool {
        self.hint_path().exists()
    }
}

/// Writes `contents` to `path` with mode 0600, creating parent directories.
fn write_restricted(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .with_context(|| format!("Failed to open {} for writing", path.display()))?;
        file.write_all(contents.as_bytes())
            .with_context(|| format!("Failed to write to {}", path.display()))?;
    }

    #[cfg(not(unix))]
    {
        fs::write(path, contents)
            .with_context(|| format!("Failed to write to {}", path.display()))?;
    }

    Ok(())
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => {
            Err(err).with_context(|| format!("Failed to remove {}", path.display()))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    fn sample_session() -> Session {
        Session {
            token: "tok-123".to_string(),
            user: UserProfile {
                username: "admin".to_string(),
                extra: serde_json::Map::new(),
            },
        }
    }

    #[test]
    fn test_load_absent_returns_none() {
        let dir = tempdir().unwrap();
        let store = SessionStore::at(dir.path());
        assert!(store.load().is_none());
    }

    #[test]
    fn test_load_malformed_returns_none() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("session.json"), "{not json").unwrap();

        let store = SessionStore::at(dir.path());
        assert!(store.load().is_none());
    }

    #[test]
    fn test_load_wrong_shape_returns_none() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("session.json"), r#"{"token": 42}"#).unwrap();

        let store = SessionStore::at(dir.path());
        assert!(store.load().is_none());
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let store = SessionStore::at(dir.path());

        store.save(&sample_session()).unwrap();

        let loaded = store.load().expect("session should load");
        assert_eq!(loaded.token, "tok-123");
        assert_eq!(loaded.user.username, "admin");
        assert!(store.admin_hint());
    }

    #[test]
    fn test_save_preserves_opaque_user_fields() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("session.json"),
            r#"{"token":"t","user":{"username":"admin","role":"superuser"}}"#,
        )
        .unwrap();

        let store = SessionStore::at(dir.path());
        let loaded = store.load().unwrap();
        assert_eq!(loaded.user.extra.get("role").unwrap(), "superuser");
    }

    #[test]
    fn test_clear_removes_session_and_hint() {
        let dir = tempdir().unwrap();
        let store = SessionStore::at(dir.path());

        store.save(&sample_session()).unwrap();
        store.clear().unwrap();

        assert!(store.load().is_none());
        assert!(!store.admin_hint());
    }

    #[test]
    fn test_clear_on_empty_store_is_fine() {
        let dir = tempdir().unwrap();
        let store = SessionStore::at(dir.path());
        store.clear().unwrap();
    }

    #[test]
    fn test_hint_is_independent_of_token() {
        let dir = tempdir().unwrap();
        let store = SessionStore::at(dir.path());

        // A stray hint without a session must not imply a usable token.
        fs::write(dir.path().join("admin_hint"), "true").unwrap();
        assert!(store.admin_hint());
        assert!(store.load().is_none());
    }
}
