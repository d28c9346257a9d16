//! Token lifecycle orchestration: cache, refresh, or device login.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::device_code::{DeviceFlow, DevicePrompt, SilentPrompt};
use super::error::AuthError;
use super::oidc::{HttpOidcClient, OidcProvider};
use super::persona::{decode_persona, Persona};
use super::refresh::TokenRefresher;
use super::store::TokenStore;
use super::token::CredentialSet;
use crate::config::{ProfileSettings, DEFAULT_MAX_POLL_TIME_SECS, DEFAULT_REFRESH_MARGIN_SECS};
use crate::util::clock::{Clock, SystemClock};

/// Where the credential handed to the caller came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialSource {
    Cache,
    Refreshed,
    DeviceFlow,
}

/// A usable access token and the identity it carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Authenticated {
    pub profile: String,
    #[serde(skip)]
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    pub persona: Persona,
    pub source: CredentialSource,
}

/// Result of an explicit `login`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// A valid cached credential already exists; nothing was requested.
    AlreadyAuthenticated(Authenticated),
    LoggedIn(Authenticated),
}

/// Produces valid credentials for a profile with as little user interaction
/// as possible, and keeps the token cache current.
///
/// Per call: at most one refresh exchange and, if that fails or is not
/// possible, one device login. Every new credential is persisted before it
/// is returned.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use vantage::auth::{AuthService, FileTokenStore};
/// use vantage::config::ProfileSettings;
///
/// # async fn example() -> Result<(), vantage::auth::AuthError> {
/// let store = Arc::new(FileTokenStore::new_default());
/// let service = AuthService::for_settings(store, &ProfileSettings::default());
/// let auth = service.ensure_authenticated("default").await?;
/// println!("logged in as {}", auth.persona.email);
/// # Ok(())
/// # }
/// ```
pub struct AuthService {
    store: Arc<dyn TokenStore>,
    oidc: Arc<dyn OidcProvider>,
    clock: Arc<dyn Clock>,
    prompt: Arc<dyn DevicePrompt>,
    cancel: CancellationToken,
    refresh_margin: Duration,
    max_poll_time: Duration,
}

impl AuthService {
    pub fn new(store: Arc<dyn TokenStore>, oidc: Arc<dyn OidcProvider>) -> Self {
        Self {
            store,
            oidc,
            clock: Arc::new(SystemClock),
            prompt: Arc::new(SilentPrompt),
            cancel: CancellationToken::new(),
            refresh_margin: Duration::from_secs(DEFAULT_REFRESH_MARGIN_SECS),
            max_poll_time: Duration::from_secs(DEFAULT_MAX_POLL_TIME_SECS),
        }
    }

    /// Service talking to the OIDC endpoints and using the policy of one profile.
    pub fn for_settings(store: Arc<dyn TokenStore>, settings: &ProfileSettings) -> Self {
        Self::new(store, Arc::new(HttpOidcClient::new(settings)))
            .with_refresh_margin(settings.refresh_margin())
            .with_max_poll_time(settings.max_poll_time())
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_prompt(mut self, prompt: Arc<dyn DevicePrompt>) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_refresh_margin(mut self, margin: Duration) -> Self {
        self.refresh_margin = margin;
        self
    }

    pub fn with_max_poll_time(mut self, max_poll_time: Duration) -> Self {
        self.max_poll_time = max_poll_time;
        self
    }

    /// Return a valid access token and persona for `profile`.
    pub async fn ensure_authenticated(&self, profile: &str) -> Result<Authenticated, AuthError> {
        let cached = self.load_cached(profile)?;

        let Some(credentials) = cached else {
            tracing::debug!(profile, "No cached credentials, starting device login");
            let fresh = self.device_login(profile).await?;
            return self.finish(profile, fresh, CredentialSource::DeviceFlow);
        };

        if self.is_fresh(&credentials) {
            tracing::debug!(profile, expires_at = %credentials.expires_at, "Using cached credentials");
            return self.finish(profile, credentials, CredentialSource::Cache);
        }

        if credentials.can_refresh() {
            let refresher = TokenRefresher::new(self.oidc.as_ref(), self.clock.as_ref());
            match refresher.refresh(&credentials).await {
                Ok(refreshed) => {
                    self.store.save(profile, &refreshed)?;
                    tracing::debug!(profile, "Refreshed access token");
                    return self.finish(profile, refreshed, CredentialSource::Refreshed);
                }
                Err(failure) => {
                    tracing::debug!(profile, error = %failure, "Token refresh failed, falling back to device login");
                }
            }
        } else {
            tracing::debug!(profile, "Credentials near expiry and not refreshable");
        }

        let fresh = self.device_login(profile).await?;
        self.finish(profile, fresh, CredentialSource::DeviceFlow)
    }

    /// Explicit login: reuse a valid cached credential, otherwise run the device flow.
    pub async fn login(&self, profile: &str) -> Result<LoginOutcome, AuthError> {
        if let Some(credentials) = self.load_cached(profile)? {
            if self.is_fresh(&credentials) {
                match self.finish(profile, credentials, CredentialSource::Cache) {
                    Ok(auth) => return Ok(LoginOutcome::AlreadyAuthenticated(auth)),
                    Err(err) => {
                        tracing::debug!(profile, error = %err, "Cached token unusable, logging in again");
                    }
                }
            }
        }
        let fresh = self.device_login(profile).await?;
        Ok(LoginOutcome::LoggedIn(self.finish(
            profile,
            fresh,
            CredentialSource::DeviceFlow,
        )?))
    }

    /// Forget the cached credentials. Returns who was logged in, when known.
    pub fn logout(&self, profile: &str) -> Result<Option<Persona>, AuthError> {
        let persona = self
            .load_cached(profile)?
            .and_then(|credentials| decode_persona(&credentials.access_token).ok());
        self.store.clear(profile)?;
        Ok(persona)
    }

    /// Cached session for `profile`, without touching the network.
    pub fn status(&self, profile: &str) -> Result<Option<Authenticated>, AuthError> {
        self.load_cached(profile)?
            .map(|credentials| self.finish(profile, credentials, CredentialSource::Cache))
            .transpose()
    }

    fn load_cached(&self, profile: &str) -> Result<Option<CredentialSet>, AuthError> {
        Ok(self
            .store
            .load(profile)?
            .filter(|credentials| !credentials.access_token.is_empty()))
    }

    fn is_fresh(&self, credentials: &CredentialSet) -> bool {
        let margin = chrono::Duration::from_std(self.refresh_margin)
            .unwrap_or_else(|_| chrono::Duration::days(365));
        !credentials.is_near_expiry(self.clock.now(), margin)
    }

    async fn device_login(&self, profile: &str) -> Result<CredentialSet, AuthError> {
        let credentials = DeviceFlow::new(
            self.oidc.as_ref(),
            self.clock.as_ref(),
            self.prompt.as_ref(),
        )
        .with_cancellation(self.cancel.clone())
        .with_max_poll_time(self.max_poll_time)
        .run()
        .await?;
        self.store.save(profile, &credentials)?;
        Ok(credentials)
    }

    fn finish(
        &self,
        profile: &str,
        credentials: CredentialSet,
        source: CredentialSource,
    ) -> Result<Authenticated, AuthError> {
        let persona = decode_persona(&credentials.access_token)?;
        Ok(Authenticated {
            profile: profile.to_string(),
            access_token: credentials.access_token,
            expires_at: credentials.expires_at,
            persona,
            source,
        })
    }
}
