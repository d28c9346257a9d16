//! HTTP client for the OIDC provider's device and token endpoints.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use super::device_code::{DeviceCodePoll, DeviceCodeSession, DEFAULT_POLL_INTERVAL_SECS};
use super::error::{AuthError, RefreshFailure};
use super::token::TokenGrant;
use crate::config::ProfileSettings;

const DEVICE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The three OIDC exchanges the CLI performs.
#[async_trait]
pub trait OidcProvider: Send + Sync {
    /// Request a device authorization session.
    async fn start_device_authorization(&self) -> Result<DeviceCodeSession, AuthError>;

    /// Ask the token endpoint once whether the session has been authorized.
    async fn poll_device_token(
        &self,
        session: &DeviceCodeSession,
    ) -> Result<DeviceCodePoll, AuthError>;

    /// Exchange a refresh token for a new grant.
    async fn refresh_grant(&self, refresh_token: &str) -> Result<TokenGrant, RefreshFailure>;
}

/// Keycloak-flavoured OIDC client built from a profile's settings.
///
/// # Example
/// ```no_run
/// use vantage::auth::oidc::HttpOidcClient;
/// use vantage::config::ProfileSettings;
///
/// let oidc = HttpOidcClient::new(&ProfileSettings::default());
/// ```
pub struct HttpOidcClient {
    client: reqwest::Client,
    client_id: String,
    device_url: String,
    token_url: String,
}

impl HttpOidcClient {
    pub fn new(settings: &ProfileSettings) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            client_id: settings.oidc_client_id.clone(),
            device_url: settings.oidc_device_url(),
            token_url: settings.oidc_token_url(),
        }
    }

    pub fn with_device_url(mut self, url: impl Into<String>) -> Self {
        self.device_url = url.into();
        self
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }
}

#[async_trait]
impl OidcProvider for HttpOidcClient {
    async fn start_device_authorization(&self) -> Result<DeviceCodeSession, AuthError> {
        tracing::debug!(url = %self.device_url, "Requesting device authorization");
        let resp = self
            .client
            .post(&self.device_url)
            .header("Accept", "application/json")
            .form(&[("client_id", self.client_id.as_str())])
            .send()
            .await
            .map_err(|e| AuthError::DeviceAuthorization(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let detail = parse_error_body(&body)
                .map(|e| e.describe())
                .unwrap_or_else(|| format!("status {status}"));
            return Err(AuthError::DeviceAuthorization(detail));
        }
        let payload: DeviceAuthorizationResponse = resp
            .json()
            .await
            .map_err(|e| AuthError::DeviceAuthorization(format!("unexpected response: {e}")))?;
        Ok(DeviceCodeSession {
            device_code: payload.device_code,
            user_code: payload.user_code,
            verification_uri: payload.verification_uri,
            verification_uri_complete: payload.verification_uri_complete,
            interval_secs: payload
                .interval
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
            expires_in_secs: payload.expires_in,
        })
    }

    async fn poll_device_token(
        &self,
        session: &DeviceCodeSession,
    ) -> Result<DeviceCodePoll, AuthError> {
        let resp = self
            .client
            .post(&self.token_url)
            .header("Accept", "application/json")
            .form(&[
                ("grant_type", DEVICE_GRANT_TYPE),
                ("device_code", session.device_code.as_str()),
                ("client_id", self.client_id.as_str()),
            ])
            .send()
            .await?;
        let status = resp.status();
        if status.is_success() {
            let grant: TokenGrant = resp
                .json()
                .await
                .map_err(|e| AuthError::InvalidResponse(format!("token response: {e}")))?;
            return Ok(DeviceCodePoll::Authorized { grant });
        }
        let body = resp.text().await.unwrap_or_default();
        let error = parse_error_body(&body).ok_or_else(|| {
            AuthError::InvalidResponse(format!("Device token request failed with status {status}"))
        })?;
        match error.error.as_str() {
            "authorization_pending" => Ok(DeviceCodePoll::Pending),
            "slow_down" => Ok(DeviceCodePoll::SlowDown),
            "access_denied" => Ok(DeviceCodePoll::AccessDenied),
            "expired_token" => Ok(DeviceCodePoll::Expired),
            _ => Err(AuthError::InvalidResponse(format!(
                "Device code error: {}",
                error.describe()
            ))),
        }
    }

    async fn refresh_grant(&self, refresh_token: &str) -> Result<TokenGrant, RefreshFailure> {
        tracing::debug!(url = %self.token_url, "Requesting refreshed access token");
        let resp = self
            .client
            .post(&self.token_url)
            .header("Accept", "application/json")
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", self.client_id.as_str()),
            ])
            .send()
            .await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp.json().await?);
        }
        let body = resp.text().await.unwrap_or_default();
        let error = parse_error_body(&body);
        let is_invalid_grant = error.as_ref().is_some_and(|e| e.error == "invalid_grant");
        if is_invalid_grant
            && (status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED)
        {
            let detail = error.map(|e| e.describe()).unwrap_or_default();
            return Err(RefreshFailure::InvalidGrant(detail));
        }
        Err(RefreshFailure::Rejected {
            status: status.as_u16(),
            code: error.map(|e| e.error),
        })
    }
}

#[derive(Debug, Deserialize)]
struct DeviceAuthorizationResponse {
    device_code: String,
    user_code: String,
    verification_uri: String,
    #[serde(default)]
    verification_uri_complete: Option<String>,
    expires_in: u64,
    #[serde(default)]
    interval: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

impl OAuthErrorBody {
    fn describe(&self) -> String {
        match &self.error_description {
            Some(desc) if !desc.is_empty() => format!("{} ({desc})", self.error),
            _ => self.error.clone(),
        }
    }
}

fn parse_error_body(body: &str) -> Option<OAuthErrorBody> {
    serde_json::from_str(body).ok()
}
