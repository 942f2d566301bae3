use crate::common::{DevMode, MaskLensError, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

const STORAGE_VERSION: u32 = 1;
const SESSION_FILE: &str = "session.bincode";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub version: u32,
    pub token: String,
    pub fullname: String,
    #[serde(default)]
    pub role: Role,
}

/// File-backed holder of the current session token and cached profile
/// fields. An absent file is indistinguishable from a cleared session.
pub struct SessionStore {
    data_dir: PathBuf,
}

impl SessionStore {
    pub fn new_with_path(data_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }

    pub fn new_with_dev_mode(dev_mode: &DevMode) -> Result<Self> {
        let data_dir = if dev_mode.is_enabled() {
            dev_mode.session_dir()
        } else {
            let dirs = ProjectDirs::from("com", "masklens", "MaskLens")
                .ok_or_else(|| MaskLensError::Storage("Failed to get project dirs".into()))?;
            dirs.data_dir().to_path_buf()
        };

        fs::create_dir_all(&data_dir)?;

        if dev_mode.is_enabled() {
            tracing::debug!("SessionStore using dev directory: {:?}", data_dir);
        }

        Ok(Self { data_dir })
    }

    fn session_file(&self) -> PathBuf {
        self.data_dir.join(SESSION_FILE)
    }

    pub fn set_session(&self, token: &str, fullname: Option<&str>, role: Option<Role>) -> Result<()> {
        let session = Session {
            version: STORAGE_VERSION,
            token: token.to_string(),
            fullname: fullname.unwrap_or("User").to_string(),
            role: role.unwrap_or_default(),
        };

        let encoded = bincode::serialize(&session)
            .map_err(|e| MaskLensError::Storage(format!("Failed to serialize session: {}", e)))?;
        fs::write(self.session_file(), encoded)?;
        Ok(())
    }

    /// Current session, or None if logged out / never logged in.
    pub fn session(&self) -> Option<Session> {
        let file = self.session_file();
        if !file.exists() {
            return None;
        }

        let data = match fs::read(&file) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!("Failed to read session file: {}", e);
                return None;
            }
        };

        match bincode::deserialize::<Session>(&data) {
            Ok(mut session) => {
                if session.version < STORAGE_VERSION {
                    // Future migration logic would go here
                    session.version = STORAGE_VERSION;
                }
                Some(session)
            }
            Err(e) => {
                // A corrupt session file is treated as logged out
                tracing::warn!("Failed to deserialize session: {}", e);
                None
            }
        }
    }

    pub fn token(&self) -> Option<String> {
        self.session().map(|s| s.token)
    }

    /// Remove all session state. Clearing an already-clear store is a no-op.
    pub fn clear(&self) -> Result<()> {
        let file = self.session_file();
        if file.exists() {
            fs::remove_file(file)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, SessionStore) {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new_with_path(dir.path().to_path_buf()).unwrap();
        (dir, store)
    }

    #[test]
    fn absent_session_reads_as_none() {
        let (_dir, store) = store();
        assert!(store.session().is_none());
        assert!(store.token().is_none());
    }

    #[test]
    fn set_then_get_roundtrips_all_fields() {
        let (_dir, store) = store();
        store
            .set_session("tok-123", Some("Ada Lovelace"), Some(Role::Admin))
            .unwrap();

        let session = store.session().unwrap();
        assert_eq!(session.token, "tok-123");
        assert_eq!(session.fullname, "Ada Lovelace");
        assert_eq!(session.role, Role::Admin);
    }

    #[test]
    fn clear_is_idempotent_and_indistinguishable_from_absent() {
        let (_dir, store) = store();
        store.set_session("tok", None, None).unwrap();
        assert!(store.token().is_some());

        store.clear().unwrap();
        assert!(store.session().is_none());

        // Clearing again is a no-op
        store.clear().unwrap();
        assert!(store.session().is_none());
    }

    #[test]
    fn missing_optional_fields_default() {
        let (_dir, store) = store();
        store.set_session("tok", None, None).unwrap();
        let session = store.session().unwrap();
        assert_eq!(session.fullname, "User");
        assert_eq!(session.role, Role::User);
    }
}
