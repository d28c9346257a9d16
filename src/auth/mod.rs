//! OIDC device-code login, token refresh, and the per-profile token cache.

pub mod device_code;
pub mod error;
pub mod oidc;
pub mod persona;
pub mod refresh;
pub mod service;
pub mod store;
pub mod token;

pub use device_code::{
    DeviceCodePoll, DeviceCodeSession, DeviceFlow, DevicePrompt, LoginInstructions, SilentPrompt,
};
pub use error::{AuthError, RefreshFailure};
pub use oidc::{HttpOidcClient, OidcProvider};
pub use persona::{decode_persona, Persona};
pub use refresh::TokenRefresher;
pub use service::{AuthService, Authenticated, CredentialSource, LoginOutcome};
pub use store::{FileTokenStore, TokenStore, TokenStoreConfig};
pub use token::{CredentialSet, TokenGrant};
