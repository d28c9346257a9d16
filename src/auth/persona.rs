//! Identity claims decoded from an access token.

use std::collections::BTreeMap;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::AuthError;

/// Raw JWT claims the CLI cares about. The signature is not verified; the
/// token is only read to show who is logged in.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccessClaims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub azp: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub organization: Option<BTreeMap<String, serde_json::Value>>,
}

/// Who the current credential belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Persona {
    pub email: String,
    pub user_id: Option<String>,
    pub client_id: String,
    pub org_id: Option<String>,
    pub name: Option<String>,
    pub issued_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Decode the payload segment of a JWT without verifying it.
pub fn decode_claims(access_token: &str) -> Result<AccessClaims, AuthError> {
    let token = access_token.trim();
    if token.is_empty() {
        return Err(AuthError::InvalidToken("access token is empty".into()));
    }
    let mut parts = token.split('.');
    let _header = parts.next();
    let payload = parts
        .next()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AuthError::InvalidToken("missing JWT payload".into()))?;
    let decoded = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|_| AuthError::InvalidToken("payload is not base64url".into()))?;
    serde_json::from_slice(&decoded)
        .map_err(|e| AuthError::InvalidToken(format!("payload is not JSON: {e}")))
}

/// Extract the persona from an access token.
pub fn decode_persona(access_token: &str) -> Result<Persona, AuthError> {
    let claims = decode_claims(access_token)?;
    Ok(Persona {
        email: claims.email.unwrap_or_default(),
        org_id: claims.organization.as_ref().and_then(first_org_id),
        client_id: claims.azp.unwrap_or_else(|| "unknown".to_string()),
        user_id: claims.sub,
        name: claims.name,
        issued_at: claims.iat.and_then(|t| DateTime::<Utc>::from_timestamp(t, 0)),
        expires_at: claims.exp.and_then(|t| DateTime::<Utc>::from_timestamp(t, 0)),
    })
}

// The organization claim is keyed by org id: {"<id>": {"id": "<id>", ...}}.
fn first_org_id(organization: &BTreeMap<String, serde_json::Value>) -> Option<String> {
    let (key, value) = organization.iter().next()?;
    let id = value
        .get("id")
        .and_then(|v| v.as_str())
        .unwrap_or(key.as_str());
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}
