//! Error types for the Vantage CLI.

use thiserror::Error;

use crate::auth::AuthError;

/// Primary error type for all CLI operations.
#[derive(Error, Debug)]
pub enum VantageError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Profile '{0}' does not exist")]
    ProfileNotFound(String),

    #[error("Profile '{0}' already exists")]
    ProfileExists(String),

    #[error("Invalid profile name '{0}' (use letters, digits, '-' or '_')")]
    InvalidProfileName(String),

    #[error("The default profile can only be deleted with --force")]
    DefaultProfileProtected,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl VantageError {
    /// Whether logging in again is the way out of this error.
    pub fn needs_login(&self) -> bool {
        match self {
            Self::Auth(err) => err.needs_login(),
            _ => false,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, VantageError>;
