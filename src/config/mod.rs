//! Profile settings and on-disk layout (layered: explicit flags > env > config file).

pub mod profile;

pub use profile::{Profile, ProfileStore, ProfileSummary};

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_PROFILE: &str = "default";
pub const DEFAULT_API_BASE_URL: &str = "https://apis.vantagecompute.ai";
pub const DEFAULT_OIDC_BASE_URL: &str = "https://auth.vantagecompute.ai";
pub const DEFAULT_TUNNEL_API_URL: &str = "https://tunnel.vantagecompute.ai";
pub const DEFAULT_OIDC_CLIENT_ID: &str = "default";
pub const DEFAULT_MAX_POLL_TIME_SECS: u64 = 5 * 60;
pub const DEFAULT_REFRESH_MARGIN_SECS: u64 = 5 * 60;

const OIDC_REALM_PATH: &str = "/realms/vantage";

/// Settings record stored for one profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileSettings {
    pub api_base_url: String,
    pub oidc_base_url: String,
    pub tunnel_api_url: String,
    pub oidc_client_id: String,
    /// Upper bound on device-login polling, in seconds.
    pub oidc_max_poll_time: u64,
    /// Refresh this many seconds before the access token expires.
    pub token_refresh_margin: u64,
}

impl Default for ProfileSettings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            oidc_base_url: DEFAULT_OIDC_BASE_URL.to_string(),
            tunnel_api_url: DEFAULT_TUNNEL_API_URL.to_string(),
            oidc_client_id: DEFAULT_OIDC_CLIENT_ID.to_string(),
            oidc_max_poll_time: DEFAULT_MAX_POLL_TIME_SECS,
            token_refresh_margin: DEFAULT_REFRESH_MARGIN_SECS,
        }
    }
}

impl ProfileSettings {
    /// Apply `VANTAGE_*` environment overrides (a `.env` file is honoured).
    pub fn with_env_overrides(self) -> Self {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let url_mappings: [(&str, &mut String); 3] = [
            ("VANTAGE_BASE_API_URL", &mut self.api_base_url),
            ("VANTAGE_OIDC_BASE_URL", &mut self.oidc_base_url),
            ("VANTAGE_TUNNEL_API_URL", &mut self.tunnel_api_url),
        ];
        for (env_var, field) in url_mappings {
            if let Some(value) = lookup(env_var).filter(|v| !v.trim().is_empty()) {
                tracing::debug!(env_var, "Applying settings override from environment");
                *field = value.trim().to_string();
            }
        }
        self
    }

    /// Keycloak realm base, e.g. `https://auth.example.com/realms/vantage`.
    pub fn oidc_realm_url(&self) -> String {
        format!("{}{OIDC_REALM_PATH}", self.oidc_base_url.trim_end_matches('/'))
    }

    pub fn oidc_device_url(&self) -> String {
        format!("{}/device", self.oidc_realm_url())
    }

    pub fn oidc_token_url(&self) -> String {
        format!("{}/protocol/openid-connect/token", self.oidc_realm_url())
    }

    pub fn max_poll_time(&self) -> Duration {
        Duration::from_secs(self.oidc_max_poll_time)
    }

    pub fn refresh_margin(&self) -> Duration {
        Duration::from_secs(self.token_refresh_margin)
    }
}

/// Root of all CLI state (`~/.vantage-cli`, or `$VANTAGE_CLI_HOME`).
pub fn default_home_dir() -> PathBuf {
    if let Some(value) = std::env::var_os("VANTAGE_CLI_HOME") {
        let path = PathBuf::from(value);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".vantage-cli"))
        .unwrap_or_else(|| PathBuf::from(".vantage-cli"))
}
