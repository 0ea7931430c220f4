//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;
use tokio::task;
use tracing::debug;

use crate::crypto;
use crate::db::Store;
use crate::services::auth_service::{AuthError, AuthService, AuthenticatedUser};

pub struct SeaOrmAuthService {
    store: Store,
    iterations: u32,
}

impl SeaOrmAuthService {
    #[must_use]
    pub const fn new(store: Store, iterations: u32) -> Self {
        Self { store, iterations }
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn login(&self, username: &str, password: &str) -> Result<AuthenticatedUser, AuthError> {
        let Some(secret) = self.store.get_user_secret(username).await? else {
            return Err(AuthError::InvalidCredentials);
        };

        // Key derivation is CPU-bound; keep it off the async runtime.
        let password = password.to_string();
        let iterations = self.iterations;
        let is_valid = task::spawn_blocking(move || {
            crypto::verify_password(&password, &secret.salt, &secret.hash, iterations)
        })
        .await
        .map_err(|e| AuthError::Internal(format!("verification task panicked: {e}")))?;

        if !is_valid {
            return Err(AuthError::InvalidCredentials);
        }

        let user = self
            .store
            .get_user_by_username(username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let token = crypto::generate_token();
        self.store.create_session(&user.id, &token).await?;

        let privileges = self.store.privileges_for(&user.id).await?;
        debug!("Session created for {}", user.username);

        Ok(AuthenticatedUser {
            id: user.id,
            username: user.username,
            token: Some(token),
            privileges,
        })
    }

    async fn resolve_token(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let user = self
            .store
            .resolve_session(token)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let privileges = self.store.privileges_for(&user.id).await?;

        Ok(AuthenticatedUser {
            id: user.id,
            username: user.username,
            token: Some(token.to_string()),
            privileges,
        })
    }

    async fn logout(&self, token: &str) -> Result<(), AuthError> {
        let revoked = self.store.revoke_session(token).await?;
        if revoked {
            debug!("Session revoked");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn service() -> (Store, SeaOrmAuthService) {
        let store = Store::new("sqlite::memory:").await.expect("in-memory store");
        let service = SeaOrmAuthService::new(store.clone(), crypto::DEFAULT_ITERATIONS);
        (store, service)
    }

    #[tokio::test]
    async fn login_then_resolve_round_trips() {
        let (store, service) = service().await;
        store
            .create_user("alice", "secret", crypto::DEFAULT_ITERATIONS)
            .await
            .unwrap();

        let identity = service.login("alice", "secret").await.unwrap();
        let token = identity.token.clone().expect("token minted at login");
        assert!(identity.has_privilege("user"));
        assert!(!identity.has_privilege("admin"));

        let resolved = service.resolve_token(&token).await.unwrap();
        assert_eq!(resolved.id, identity.id);
        assert_eq!(resolved.username, "alice");
    }

    #[tokio::test]
    async fn unknown_user_and_bad_password_are_indistinguishable() {
        let (store, service) = service().await;
        store
            .create_user("alice", "secret", crypto::DEFAULT_ITERATIONS)
            .await
            .unwrap();

        let unknown = service.login("nobody", "secret").await.unwrap_err();
        let wrong = service.login("alice", "wrong").await.unwrap_err();

        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn logout_invalidates_the_token() {
        let (store, service) = service().await;
        store
            .create_user("bob", "pw", crypto::DEFAULT_ITERATIONS)
            .await
            .unwrap();

        let identity = service.login("bob", "pw").await.unwrap();
        let token = identity.token.unwrap();

        service.logout(&token).await.unwrap();
        let err = service.resolve_token(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));

        // Logging out twice stays quiet.
        service.logout(&token).await.unwrap();
    }

    #[tokio::test]
    async fn garbage_token_does_not_resolve() {
        let (_store, service) = service().await;
        let err = service.resolve_token("deadbeef").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }
}
