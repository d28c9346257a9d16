//! Named profiles and the active-profile marker.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use super::{default_home_dir, ProfileSettings, DEFAULT_PROFILE};
use crate::auth::store::{FileTokenStore, TokenStore, TokenStoreConfig};
use crate::error::{Result, VantageError};
use crate::util::fs::{atomic_write, remove_if_exists};

const CONFIG_FILE: &str = "config.json";
const ACTIVE_PROFILE_FILE: &str = "active_profile";
const TOKEN_CACHE_DIR: &str = "token_cache";

/// Profile names double as file names, so keep them to a safe alphabet.
pub fn is_valid_profile_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 64
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// A profile name together with its settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub name: String,
    pub settings: ProfileSettings,
}

/// Listing entry for `vantage profile list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileSummary {
    pub name: String,
    pub settings: ProfileSettings,
    pub is_active: bool,
}

/// CRUD over `config.json` plus the `active_profile` marker.
///
/// Deleting a profile also clears its cached credentials through the
/// [`TokenStore`] this store was built with.
pub struct ProfileStore {
    home: PathBuf,
    tokens: Arc<dyn TokenStore>,
}

impl ProfileStore {
    pub fn new(home: PathBuf, tokens: Arc<dyn TokenStore>) -> Self {
        Self { home, tokens }
    }

    /// Store rooted at `home` with a file token cache under `home/token_cache`.
    pub fn at(home: PathBuf) -> Self {
        let tokens = FileTokenStore::new(TokenStoreConfig::new(home.join(TOKEN_CACHE_DIR)));
        Self::new(home, Arc::new(tokens))
    }

    pub fn new_default() -> Self {
        Self::at(default_home_dir())
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    fn config_path(&self) -> PathBuf {
        self.home.join(CONFIG_FILE)
    }

    fn active_path(&self) -> PathBuf {
        self.home.join(ACTIVE_PROFILE_FILE)
    }

    fn read_all(&self) -> Result<BTreeMap<String, ProfileSettings>> {
        let path = self.config_path();
        let raw = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => return Err(VantageError::Io(err)),
        };
        match serde_json::from_str(&raw) {
            Ok(profiles) => Ok(profiles),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "Ignoring unreadable profile settings");
                Ok(BTreeMap::new())
            }
        }
    }

    fn write_all(&self, profiles: &BTreeMap<String, ProfileSettings>) -> Result<()> {
        let serialized = serde_json::to_vec_pretty(profiles)?;
        atomic_write(&self.config_path(), &serialized)?;
        Ok(())
    }

    /// Create the `default` profile on first run.
    pub fn ensure_default(&self) -> Result<()> {
        let mut profiles = self.read_all()?;
        if profiles.contains_key(DEFAULT_PROFILE) {
            return Ok(());
        }
        tracing::debug!("Creating default profile on first run");
        profiles.insert(DEFAULT_PROFILE.to_string(), ProfileSettings::default());
        self.write_all(&profiles)
    }

    pub fn create(&self, name: &str, settings: ProfileSettings, overwrite: bool) -> Result<Profile> {
        if !is_valid_profile_name(name) {
            return Err(VantageError::InvalidProfileName(name.to_string()));
        }
        let mut profiles = self.read_all()?;
        if profiles.contains_key(name) && !overwrite {
            return Err(VantageError::ProfileExists(name.to_string()));
        }
        profiles.insert(name.to_string(), settings.clone());
        self.write_all(&profiles)?;
        tracing::info!(profile = name, "Created profile");
        Ok(Profile {
            name: name.to_string(),
            settings,
        })
    }

    pub fn get(&self, name: &str) -> Result<Profile> {
        let mut profiles = self.read_all()?;
        let settings = profiles
            .remove(name)
            .ok_or_else(|| VantageError::ProfileNotFound(name.to_string()))?;
        Ok(Profile {
            name: name.to_string(),
            settings,
        })
    }

    /// All profiles, sorted by name.
    pub fn list(&self) -> Result<Vec<ProfileSummary>> {
        let active = self.active()?;
        Ok(self
            .read_all()?
            .into_iter()
            .map(|(name, settings)| ProfileSummary {
                is_active: name == active,
                name,
                settings,
            })
            .collect())
    }

    /// Name of the active profile; `default` when unset or stale.
    pub fn active(&self) -> Result<String> {
        let marker = match fs::read_to_string(self.active_path()) {
            Ok(data) => data.trim().to_string(),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(err) => return Err(VantageError::Io(err)),
        };
        if marker.is_empty() {
            return Ok(DEFAULT_PROFILE.to_string());
        }
        if !self.read_all()?.contains_key(&marker) {
            tracing::warn!(profile = %marker, "Active profile no longer exists, using default");
            return Ok(DEFAULT_PROFILE.to_string());
        }
        Ok(marker)
    }

    pub fn set_active(&self, name: &str) -> Result<()> {
        if !self.read_all()?.contains_key(name) {
            return Err(VantageError::ProfileNotFound(name.to_string()));
        }
        atomic_write(&self.active_path(), name.as_bytes())?;
        tracing::info!(profile = name, "Activated profile");
        Ok(())
    }

    /// Remove a profile's settings and cached credentials.
    pub fn delete(&self, name: &str, force: bool) -> Result<()> {
        let mut profiles = self.read_all()?;
        if !profiles.contains_key(name) {
            return Err(VantageError::ProfileNotFound(name.to_string()));
        }
        if name == DEFAULT_PROFILE && !force {
            return Err(VantageError::DefaultProfileProtected);
        }
        let was_active = self.active()? == name;

        profiles.remove(name);
        self.write_all(&profiles)?;
        self.tokens.clear(name)?;
        if was_active {
            remove_if_exists(&self.active_path())?;
        }
        tracing::info!(profile = name, "Deleted profile");
        Ok(())
    }

    /// Resolve the profile for this invocation: the explicit name if given,
    /// otherwise the active one.
    pub fn resolve(&self, explicit: Option<&str>) -> Result<Profile> {
        let name = match explicit {
            Some(name) => name.to_string(),
            None => self.active()?,
        };
        self.get(&name)
    }

    /// Delete every profile, marker and cached token.
    pub fn clear_all(&self) -> Result<()> {
        match fs::remove_dir_all(&self.home) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(VantageError::Io(err)),
        }
    }
}
