//! Persisted bearer token.
//!
//! The token lives in `credentials.toml` next to `config.toml`. Only the
//! CLI reads it; the chat core receives the token through an explicit
//! auth context instead of looking it up itself.

use std::fmt;
use std::path::{Path, PathBuf};

use learna_common::{LearnaError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::toml_loader::config_dir;

#[derive(Default, Serialize, Deserialize)]
struct CredentialsFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<String>,
}

/// File-backed token store.
pub struct CredentialStore {
    path: PathBuf,
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStore")
            .field("path", &self.path)
            .finish()
    }
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the platform default location.
    pub fn default_location() -> Result<Self> {
        Ok(Self::new(config_dir()?.join("credentials.toml")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored token. A missing file means no token.
    pub fn load_token(&self) -> Result<Option<String>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no credentials file");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let file: CredentialsFile = toml::from_str(&content).map_err(|e| {
            LearnaError::Credentials(format!("failed to parse {}: {e}", self.path.display()))
        })?;
        Ok(file.token.filter(|t| !t.trim().is_empty()))
    }

    pub fn save_token(&self, token: &str) -> Result<()> {
        let token = token.trim();
        if token.is_empty() {
            return Err(LearnaError::Credentials("token is empty".into()));
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = CredentialsFile {
            token: Some(token.to_string()),
        };
        let content = toml::to_string(&file)
            .map_err(|e| LearnaError::Credentials(format!("failed to serialize token: {e}")))?;
        std::fs::write(&self.path, content)?;

        info!(path = %self.path.display(), "stored credentials");
        Ok(())
    }

    /// Remove the stored token. Clearing an absent token is not an error.
    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "cleared credentials");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> CredentialStore {
        CredentialStore::new(dir.path().join("learna").join("credentials.toml"))
    }

    #[test]
    fn missing_file_means_no_token() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(store_in(&dir).load_token().unwrap(), None);
    }

    #[test]
    fn save_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save_token("  abc.def.ghi \n").unwrap();
        assert_eq!(store.load_token().unwrap().as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn empty_token_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = store_in(&dir).save_token("   ").unwrap_err();
        assert!(matches!(err, LearnaError::Credentials(_)));
    }

    #[test]
    fn clear_removes_token_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save_token("tok").unwrap();
        store.clear().unwrap();
        assert_eq!(store.load_token().unwrap(), None);
        store.clear().unwrap();
    }

    #[test]
    fn corrupt_file_is_a_credentials_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "token = [unterminated").unwrap();
        assert!(matches!(
            store.load_token().unwrap_err(),
            LearnaError::Credentials(_)
        ));
    }

    #[test]
    fn debug_does_not_leak_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save_token("secret-token").unwrap();
        assert!(!format!("{store:?}").contains("secret-token"));
    }
}
