use thiserror::Error;

/// Classified authentication failures surfaced to the command layer.
///
/// A cache miss is not represented here: [`super::TokenStore::load`] returns
/// `Ok(None)` for it.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Could not start device login: {0}")]
    DeviceAuthorization(String),
    #[error("Login was denied")]
    DeviceFlowDenied,
    #[error("Login was not completed in time")]
    DeviceFlowTimedOut,
    #[error("Login was cancelled")]
    DeviceFlowCancelled,
    #[error("Could not write token cache: {0}")]
    CacheWrite(String),
    #[error("Invalid access token: {0}")]
    InvalidToken(String),
    #[error("Invalid profile name: {0}")]
    InvalidProfile(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("IO error: {0}")]
    Io(String),
}

impl AuthError {
    /// Whether the user can recover by running `vantage login` again.
    pub fn needs_login(&self) -> bool {
        matches!(
            self,
            Self::DeviceFlowDenied
                | Self::DeviceFlowTimedOut
                | Self::DeviceFlowCancelled
                | Self::InvalidToken(_)
        )
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(error: reqwest::Error) -> Self {
        Self::Network(error.to_string())
    }
}

impl From<std::io::Error> for AuthError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

/// Why a refresh-token exchange did not produce new credentials.
///
/// Every variant is handled the same way by the orchestrator (fall back to the
/// device flow); the split exists for logging.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshFailure {
    #[error("no refresh token available")]
    MissingRefreshToken,
    #[error("refresh token rejected: {0}")]
    InvalidGrant(String),
    #[error("refresh request failed with status {status}")]
    Rejected { status: u16, code: Option<String> },
    #[error("refresh request failed: {0}")]
    Network(String),
    #[error("refresh response invalid: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for RefreshFailure {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::InvalidResponse(error.to_string())
        } else {
            Self::Network(error.to_string())
        }
    }
}
