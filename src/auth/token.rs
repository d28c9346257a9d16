//! OIDC credential set.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::persona::decode_claims;

/// Token payload returned by the OIDC token endpoint (device or refresh grant).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// One OIDC token grant as cached for a profile.
///
/// `expires_at` is fixed when the grant is received and is never recomputed.
///
/// # Example
/// ```
/// use chrono::{Duration, Utc};
/// use vantage::auth::{CredentialSet, TokenGrant};
///
/// let now = Utc::now();
/// let grant = TokenGrant {
///     access_token: "access".to_string(),
///     refresh_token: Some("refresh".to_string()),
///     token_type: Some("Bearer".to_string()),
///     expires_in: Some(3600),
/// };
/// let credentials = CredentialSet::from_grant(grant, now, None);
/// assert_eq!(credentials.expires_at, now + Duration::seconds(3600));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSet {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CredentialSet {
    /// Build a credential set from a token endpoint response received at `issued_at`.
    ///
    /// `previous_refresh_token` is kept when the provider does not rotate it.
    pub fn from_grant(
        grant: TokenGrant,
        issued_at: DateTime<Utc>,
        previous_refresh_token: Option<String>,
    ) -> Self {
        let expires_at = match grant.expires_in {
            Some(secs) => issued_at + Duration::seconds(secs.max(0)),
            None => expiry_claim(&grant.access_token).unwrap_or(issued_at),
        };
        Self {
            refresh_token: grant.refresh_token.or(previous_refresh_token),
            token_type: grant.token_type.unwrap_or_else(|| "Bearer".to_string()),
            access_token: grant.access_token,
            issued_at,
            expires_at,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// True once `now` is within `margin` of `expires_at` (or past it).
    pub fn is_near_expiry(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        now + margin >= self.expires_at
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token
            .as_deref()
            .is_some_and(|token| !token.is_empty())
    }

    /// Value for an `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

fn expiry_claim(access_token: &str) -> Option<DateTime<Utc>> {
    let claims = decode_claims(access_token).ok()?;
    DateTime::<Utc>::from_timestamp(claims.exp?, 0)
}
