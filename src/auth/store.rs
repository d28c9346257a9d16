//! Per-profile credential cache with atomic writes.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::AuthError;
use super::token::CredentialSet;
use crate::config::profile::is_valid_profile_name;
use crate::util::fs::{atomic_write, remove_if_exists};

const TOKEN_FILE_VERSION: u32 = 1;

/// Storage abstraction for cached credentials, one entry per profile.
pub trait TokenStore: Send + Sync {
    /// `Ok(None)` when the profile has never logged in or its record is unreadable.
    fn load(&self, profile: &str) -> Result<Option<CredentialSet>, AuthError>;
    fn save(&self, profile: &str, credentials: &CredentialSet) -> Result<(), AuthError>;
    /// Removing an absent entry succeeds.
    fn clear(&self, profile: &str) -> Result<(), AuthError>;
}

/// Configuration for file-backed token storage.
#[derive(Debug, Clone)]
pub struct TokenStoreConfig {
    pub base_dir: PathBuf,
}

impl TokenStoreConfig {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn default_dir() -> PathBuf {
        crate::config::default_home_dir().join("token_cache")
    }
}

/// File-backed token store writing one JSON record per profile.
///
/// # Example
/// ```no_run
/// use chrono::Utc;
/// use vantage::auth::{CredentialSet, FileTokenStore, TokenStore};
///
/// let store = FileTokenStore::new_default();
/// let now = Utc::now();
/// let credentials = CredentialSet {
///     access_token: "access".to_string(),
///     refresh_token: Some("refresh".to_string()),
///     token_type: "Bearer".to_string(),
///     issued_at: now,
///     expires_at: now + chrono::Duration::hours(1),
/// };
/// store.save("default", &credentials)?;
/// # Ok::<(), vantage::auth::AuthError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    base_dir: PathBuf,
}

impl FileTokenStore {
    pub fn new(config: TokenStoreConfig) -> Self {
        Self {
            base_dir: config.base_dir,
        }
    }

    pub fn new_default() -> Self {
        Self {
            base_dir: TokenStoreConfig::default_dir(),
        }
    }

    fn token_path(&self, profile: &str) -> Result<PathBuf, AuthError> {
        if !is_valid_profile_name(profile) {
            return Err(AuthError::InvalidProfile(profile.to_string()));
        }
        Ok(self.base_dir.join(format!("{profile}.json")))
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self, profile: &str) -> Result<Option<CredentialSet>, AuthError> {
        let path = self.token_path(profile)?;
        let raw = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(AuthError::Io(err.to_string())),
        };
        match serde_json::from_str::<TokenFile>(&raw) {
            Ok(file) if file.version == TOKEN_FILE_VERSION && file.profile == profile => {
                Ok(Some(file.credentials))
            }
            Ok(file) => {
                tracing::warn!(
                    path = %path.display(),
                    version = file.version,
                    "Ignoring token cache record for another version or profile"
                );
                Ok(None)
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "Ignoring corrupt token cache record");
                Ok(None)
            }
        }
    }

    fn save(&self, profile: &str, credentials: &CredentialSet) -> Result<(), AuthError> {
        let path = self.token_path(profile)?;
        let file = TokenFile {
            version: TOKEN_FILE_VERSION,
            profile: profile.to_string(),
            credentials: credentials.clone(),
            saved_at: Utc::now(),
        };
        let serialized = serde_json::to_vec_pretty(&file)
            .map_err(|e| AuthError::CacheWrite(e.to_string()))?;
        atomic_write(&path, &serialized)
            .map_err(|e| AuthError::CacheWrite(format!("{}: {e}", path.display())))?;
        tracing::debug!(profile, path = %path.display(), "Cached credentials");
        Ok(())
    }

    fn clear(&self, profile: &str) -> Result<(), AuthError> {
        let path = self.token_path(profile)?;
        remove_if_exists(&path)?;
        tracing::debug!(profile, "Cleared cached credentials");
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct TokenFile {
    version: u32,
    profile: String,
    credentials: CredentialSet,
    saved_at: DateTime<Utc>,
}
