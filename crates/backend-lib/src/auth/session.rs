// ============================
// crates/backend-lib/src/auth/session.rs
// ============================
//! Session lifecycle over a user store.
//!
//! A user is logged in exactly when their record holds a renewal token.
//! Login fills the slot (last login wins), renewal rotates it through the
//! store's compare-and-swap, logout empties it. Access tokens are never
//! looked up: they verify on signature and expiry alone.
use super::issuer::TokenIssuer;
use super::password::{CredentialHasher, PasswordRequirements};
use super::rate_limit::AuthRateLimiter;
use super::token::SigningKeys;
use super::token_generator::constant_time_eq;
use super::verifier::TokenVerifier;
use crate::config::Settings;
use crate::error::{AuthError, StoreError, TokenError};
use crate::metrics::{
    LOGIN_FAILED, LOGIN_SUCCEEDED, LOGOUT, PASSWORD_CHANGED, REGISTRATION,
    RENEWAL_REUSE_DETECTED, RENEWAL_SUCCEEDED,
};
use crate::storage::{normalize_identifier, SlotSwap, UserRecord, UserStore};
use crate::validation::{validate_identifier, validate_new_user, validate_password};
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use sessionvault_common::{LoginResponse, NewUser, PublicUser, TokenPair, UserId};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Policy switches for the session lifecycle
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionPolicy {
    /// Empty the renewal slot when a user changes their password
    pub revoke_sessions_on_password_change: bool,
    /// Empty the renewal slot when a stale or reused renewal token shows up
    pub clear_slot_on_reuse: bool,
}

/// Session manager
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn UserStore>,
    hasher: CredentialHasher,
    issuer: TokenIssuer,
    verifier: TokenVerifier,
    requirements: PasswordRequirements,
    policy: SessionPolicy,
    limiter: AuthRateLimiter,
}

impl SessionManager {
    /// Create a manager with default policy, requirements and throttle
    pub fn new(store: Arc<dyn UserStore>, hasher: CredentialHasher, keys: Arc<SigningKeys>) -> Self {
        Self {
            store,
            hasher,
            issuer: TokenIssuer::new(keys.clone()),
            verifier: TokenVerifier::new(keys),
            requirements: PasswordRequirements::default(),
            policy: SessionPolicy::default(),
            limiter: AuthRateLimiter::default(),
        }
    }

    /// Build everything from validated settings.
    ///
    /// Any configuration problem is reported as [`AuthError::Fatal`].
    pub fn from_settings(settings: &Settings, store: Arc<dyn UserStore>) -> Result<Self, AuthError> {
        settings.validate()?;
        let keys = Arc::new(SigningKeys::from_settings(&settings.signing)?);
        let hasher = CredentialHasher::new(&settings.hasher)?;

        Ok(Self::new(store, hasher, keys)
            .with_policy(settings.policy.clone())
            .with_requirements(settings.password_requirements.clone())
            .with_rate_limiter(AuthRateLimiter::from_settings(&settings.login_throttle)))
    }

    pub fn with_policy(mut self, policy: SessionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_requirements(mut self, requirements: PasswordRequirements) -> Self {
        self.requirements = requirements;
        self
    }

    pub fn with_rate_limiter(mut self, limiter: AuthRateLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }

    pub fn policy(&self) -> &SessionPolicy {
        &self.policy
    }

    /// Register a new user. The account starts logged out.
    #[tracing::instrument(skip_all, fields(username = %user.username.trim()))]
    pub async fn register(&self, mut user: NewUser) -> Result<PublicUser, AuthError> {
        validate_new_user(&user, &self.requirements)?;

        let password_hash = self.hasher.hash_secure(&mut user.password)?;
        let record = UserRecord::new(&user.username, &user.email, &user.full_name, password_hash);
        let public = record.to_public();

        self.store.insert(record).await.map_err(|err| match err {
            StoreError::Conflict(_) => AuthError::AlreadyExists,
            other => AuthError::Store(other),
        })?;

        counter!(REGISTRATION).increment(1);
        info!(user_id = %public.id, "user registered");
        Ok(public)
    }

    /// Check credentials and start a session, replacing any previous one
    #[tracing::instrument(skip_all)]
    pub async fn login(&self, identifier: &str, password: &str) -> Result<LoginResponse, AuthError> {
        let key = normalize_identifier(validate_identifier(identifier)?);

        if !self.limiter.check_rate_limit(&key) {
            counter!(LOGIN_FAILED, "reason" => "rate_limited").increment(1);
            debug!("login rejected: identifier is locked out");
            return Err(AuthError::RateLimited);
        }

        let Some(record) = self.store.find_by_identifier(&key).await? else {
            self.hasher.verify_dummy(password);
            self.limiter.record_failed_attempt(&key);
            counter!(LOGIN_FAILED, "reason" => "not_found").increment(1);
            debug!("login failed: no such user");
            return Err(AuthError::NotFound);
        };

        if !self.hasher.verify(password, &record.password_hash) {
            self.limiter.record_failed_attempt(&key);
            counter!(LOGIN_FAILED, "reason" => "invalid_credentials").increment(1);
            warn!(user_id = %record.id, "login failed: invalid credentials");
            return Err(AuthError::InvalidCredentials);
        }
        self.limiter.record_success(&key);

        let tokens = self.issuer.issue_pair(&record.id)?;
        let record = self
            .store
            .set_renewal_token(&record.id, Some(tokens.renewal_token.clone()))
            .await?;

        counter!(LOGIN_SUCCEEDED).increment(1);
        info!(user_id = %record.id, "user logged in");
        Ok(LoginResponse {
            user: record.to_public(),
            tokens,
        })
    }

    /// Exchange the live renewal token for a fresh pair
    pub async fn renew(&self, presented: &str) -> Result<TokenPair, AuthError> {
        self.renew_at(presented, Utc::now()).await
    }

    #[tracing::instrument(skip_all)]
    pub async fn renew_at(&self, presented: &str, now: DateTime<Utc>) -> Result<TokenPair, AuthError> {
        let user_id = self
            .verifier
            .verify_renewal_token_at(presented, now)
            .inspect_err(|err| debug!(reason = %err, "renewal token rejected"))?;

        let record = self
            .store
            .find_by_id(&user_id)
            .await?
            .ok_or(AuthError::Invalid(TokenError::Malformed))?;

        let is_live = record
            .renewal_token
            .as_deref()
            .is_some_and(|stored| constant_time_eq(stored, presented));
        if !is_live {
            return Err(self.stale_or_reused(&user_id).await);
        }

        let tokens = self.issuer.issue_pair_at(&user_id, now)?;
        match self
            .store
            .swap_renewal_token(&user_id, presented, tokens.renewal_token.clone())
            .await?
        {
            SlotSwap::Swapped => {
                counter!(RENEWAL_SUCCEEDED).increment(1);
                info!(user_id = %user_id, "renewal token rotated");
                Ok(tokens)
            },
            // A concurrent renewal rotated the slot first
            SlotSwap::Mismatch => Err(self.stale_or_reused(&user_id).await),
        }
    }

    async fn stale_or_reused(&self, user_id: &UserId) -> AuthError {
        counter!(RENEWAL_REUSE_DETECTED).increment(1);
        warn!(user_id = %user_id, "stale or reused renewal token presented");

        if self.policy.clear_slot_on_reuse {
            if let Err(err) = self.store.set_renewal_token(user_id, None).await {
                return AuthError::Store(err);
            }
            info!(user_id = %user_id, "renewal slot cleared after reuse");
        }
        AuthError::StaleOrReused
    }

    /// End the user's session. Logging out twice is fine.
    #[tracing::instrument(skip_all, fields(user_id = %user_id))]
    pub async fn logout(&self, user_id: &UserId) -> Result<(), AuthError> {
        self.store
            .set_renewal_token(user_id, None)
            .await
            .map_err(missing_user)?;

        counter!(LOGOUT).increment(1);
        info!("user logged out");
        Ok(())
    }

    /// Replace the password after checking the current one
    #[tracing::instrument(skip_all, fields(user_id = %user_id))]
    pub async fn change_password(
        &self,
        user_id: &UserId,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let record = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::NotFound)?;

        if !self.hasher.verify(old_password, &record.password_hash) {
            warn!("password change rejected: invalid credentials");
            return Err(AuthError::InvalidCredentials);
        }
        validate_password(new_password, &self.requirements)?;

        let password_hash = self.hasher.hash(new_password)?;
        self.store
            .set_password_hash(user_id, password_hash)
            .await
            .map_err(missing_user)?;

        if self.policy.revoke_sessions_on_password_change {
            self.store
                .set_renewal_token(user_id, None)
                .await
                .map_err(missing_user)?;
            info!("renewal slot cleared after password change");
        }

        counter!(PASSWORD_CHANGED).increment(1);
        info!("password changed");
        Ok(())
    }

    /// Resolve an access token to the sanitized record it belongs to
    pub async fn current_user(&self, access_token: &str) -> Result<PublicUser, AuthError> {
        let user_id = self.verify_access_token(access_token)?;
        let record = self
            .store
            .find_by_id(&user_id)
            .await?
            .ok_or(AuthError::Invalid(TokenError::Malformed))?;
        Ok(record.to_public())
    }

    /// Stateless access-token check; never touches the store
    pub fn verify_access_token(&self, access_token: &str) -> Result<UserId, AuthError> {
        self.verifier.verify_access_token(access_token)
    }

    pub fn verify_access_token_at(
        &self,
        access_token: &str,
        now: DateTime<Utc>,
    ) -> Result<UserId, AuthError> {
        self.verifier.verify_access_token_at(access_token, now)
    }
}

fn missing_user(err: StoreError) -> AuthError {
    match err {
        StoreError::NotFound(_) => AuthError::NotFound,
        other => AuthError::Store(other),
    }
}
