//! Vantage CLI authentication core.
//!
//! Keeps a per-profile OIDC credential cache, refreshes tokens before they
//! expire, and falls back to the device authorization grant when no usable
//! credential exists.
//!
//! # Quick Start
//!
//! ```no_run
//! use vantage::auth::AuthService;
//! use vantage::config::ProfileStore;
//!
//! # async fn example() -> vantage::error::Result<()> {
//! let profiles = ProfileStore::new_default();
//! profiles.ensure_default()?;
//! let profile = profiles.resolve(None)?;
//! let settings = profile.settings.with_env_overrides();
//!
//! let service = AuthService::for_settings(profiles.tokens().clone(), &settings);
//! let auth = service.ensure_authenticated(&profile.name).await?;
//! println!("{} ({})", auth.persona.email, auth.expires_at);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;
