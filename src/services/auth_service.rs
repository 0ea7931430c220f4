//! Domain service for credential exchange and bearer-token resolution.

use thiserror::Error;

use crate::db::{Privilege, StoreError};

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown username and wrong password collapse into this one variant
    /// so responses cannot be used to enumerate accounts.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    Internal(String),
}

/// An identity resolved from credentials, with its privilege set attached.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: String,
    pub username: String,

    /// Present after a fresh login or a bearer resolution; never persisted
    /// on the user row itself.
    pub token: Option<String>,

    pub privileges: Vec<Privilege>,
}

impl AuthenticatedUser {
    #[must_use]
    pub fn has_privilege(&self, name: &str) -> bool {
        self.privileges.iter().any(|p| p.name == name)
    }
}

/// Domain service trait for login, token resolution and logout.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Verifies a username/password pair, mints a bearer token, records
    /// the session and returns the identity with privileges attached.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] for an unknown username
    /// or a failed password check, indistinguishably.
    async fn login(&self, username: &str, password: &str) -> Result<AuthenticatedUser, AuthError>;

    /// Resolves a bearer token to a live identity with privileges attached.
    async fn resolve_token(&self, token: &str) -> Result<AuthenticatedUser, AuthError>;

    /// Revokes the session holding this token. Best-effort: an unknown or
    /// already-revoked token is not an error.
    async fn logout(&self, token: &str) -> Result<(), AuthError>;
}
