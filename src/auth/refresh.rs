//! Refresh-token exchange.

use super::error::RefreshFailure;
use super::oidc::OidcProvider;
use super::token::CredentialSet;
use crate::util::clock::Clock;

/// Single-shot refresh of a credential set. Never retries.
pub struct TokenRefresher<'a> {
    oidc: &'a dyn OidcProvider,
    clock: &'a dyn Clock,
}

impl<'a> TokenRefresher<'a> {
    pub fn new(oidc: &'a dyn OidcProvider, clock: &'a dyn Clock) -> Self {
        Self { oidc, clock }
    }

    /// Exchange `credentials.refresh_token` for a new credential set.
    ///
    /// The access token is always replaced. The refresh token is replaced only
    /// when the provider rotates it.
    pub async fn refresh(&self, credentials: &CredentialSet) -> Result<CredentialSet, RefreshFailure> {
        let refresh_token = credentials
            .refresh_token
            .as_deref()
            .filter(|token| !token.is_empty())
            .ok_or(RefreshFailure::MissingRefreshToken)?;
        let grant = self.oidc.refresh_grant(refresh_token).await?;
        if grant.access_token.is_empty() {
            return Err(RefreshFailure::InvalidResponse(
                "refresh response carried an empty access token".to_string(),
            ));
        }
        Ok(CredentialSet::from_grant(
            grant,
            self.clock.now(),
            credentials.refresh_token.clone(),
        ))
    }
}
