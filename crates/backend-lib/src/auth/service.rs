// ============================
// crates/backend-lib/src/auth/service.rs
// ============================
//! Object-safe facade over the session lifecycle, for transports that hold
//! an `Arc<dyn AuthService>`.
use super::SessionManager;
use crate::error::AuthError;
use async_trait::async_trait;
use sessionvault_common::{LoginResponse, NewUser, PublicUser, TokenPair, UserId};

#[async_trait]
pub trait AuthService: Send + Sync {
    async fn register(&self, user: NewUser) -> Result<PublicUser, AuthError>;
    async fn login(&self, identifier: &str, password: &str) -> Result<LoginResponse, AuthError>;
    async fn renew(&self, renewal_token: &str) -> Result<TokenPair, AuthError>;
    async fn logout(&self, user_id: &UserId) -> Result<(), AuthError>;
    async fn change_password(
        &self,
        user_id: &UserId,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError>;
    async fn current_user(&self, access_token: &str) -> Result<PublicUser, AuthError>;
    fn verify_access_token(&self, access_token: &str) -> Result<UserId, AuthError>;
}

#[async_trait]
impl AuthService for SessionManager {
    async fn register(&self, user: NewUser) -> Result<PublicUser, AuthError> {
        SessionManager::register(self, user).await
    }

    async fn login(&self, identifier: &str, password: &str) -> Result<LoginResponse, AuthError> {
        SessionManager::login(self, identifier, password).await
    }

    async fn renew(&self, renewal_token: &str) -> Result<TokenPair, AuthError> {
        SessionManager::renew(self, renewal_token).await
    }

    async fn logout(&self, user_id: &UserId) -> Result<(), AuthError> {
        SessionManager::logout(self, user_id).await
    }

    async fn change_password(
        &self,
        user_id: &UserId,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        SessionManager::change_password(self, user_id, old_password, new_password).await
    }

    async fn current_user(&self, access_token: &str) -> Result<PublicUser, AuthError> {
        SessionManager::current_user(self, access_token).await
    }

    fn verify_access_token(&self, access_token: &str) -> Result<UserId, AuthError> {
        SessionManager::verify_access_token(self, access_token)
    }
}
