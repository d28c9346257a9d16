//! CLI-specific error formatting for user-facing messages.

use crate::auth::AuthError;
use crate::error::VantageError;

/// Map a [`VantageError`] to a short message with actionable guidance.
///
/// With `verbose`, the underlying error text is appended.
pub fn format_error_help(err: &VantageError, verbose: bool) -> String {
    let help = match err {
        VantageError::Auth(AuthError::DeviceFlowDenied) => {
            "Login was denied in the browser. Run: vantage login".to_string()
        }
        VantageError::Auth(AuthError::DeviceFlowTimedOut) => {
            "Login timed out before it was approved. Run: vantage login".to_string()
        }
        VantageError::Auth(AuthError::DeviceFlowCancelled) => "Login cancelled.".to_string(),
        VantageError::Auth(AuthError::InvalidToken(_)) => {
            "Your session token could not be read. Run: vantage login".to_string()
        }
        VantageError::Auth(AuthError::CacheWrite(_)) => {
            "Could not save credentials. Check permissions of ~/.vantage-cli".to_string()
        }
        VantageError::Auth(AuthError::DeviceAuthorization(_) | AuthError::Network(_)) => {
            "Could not reach the authentication server. Check your network or the profile's OIDC URL"
                .to_string()
        }
        VantageError::ProfileNotFound(name) => {
            format!("Profile '{name}' does not exist. Run: vantage profile list")
        }
        VantageError::DefaultProfileProtected => {
            "The default profile is protected. Run: vantage profile delete default --force"
                .to_string()
        }
        other => return format!("{other}"),
    };
    if verbose {
        format!("{help}\n  caused by: {err}")
    } else {
        help
    }
}
