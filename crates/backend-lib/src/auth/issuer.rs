// ============================
// crates/backend-lib/src/auth/issuer.rs
// ============================
//! Minting of signed access and renewal credentials.
use super::token::{Claims, SigningKeys, TokenKind};
use super::token_generator::generate_token_id;
use crate::error::AuthError;
use chrono::{DateTime, Utc};
use jsonwebtoken::{encode, Algorithm, Header};
use sessionvault_common::{TokenPair, UserId};
use std::sync::Arc;

/// A signed credential and the moment it stops verifying
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Token issuer
#[derive(Clone)]
pub struct TokenIssuer {
    keys: Arc<SigningKeys>,
}

impl TokenIssuer {
    pub fn new(keys: Arc<SigningKeys>) -> Self {
        Self { keys }
    }

    /// Issue a short-lived access token
    pub fn issue_access_token(&self, user_id: &UserId) -> Result<IssuedToken, AuthError> {
        self.issue_access_token_at(user_id, Utc::now())
    }

    pub fn issue_access_token_at(
        &self,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, AuthError> {
        self.sign(TokenKind::Access, user_id, now)
    }

    /// Issue a long-lived renewal token
    pub fn issue_renewal_token(&self, user_id: &UserId) -> Result<IssuedToken, AuthError> {
        self.issue_renewal_token_at(user_id, Utc::now())
    }

    pub fn issue_renewal_token_at(
        &self,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, AuthError> {
        self.sign(TokenKind::Renewal, user_id, now)
    }

    /// Issue both credentials at once
    pub fn issue_pair(&self, user_id: &UserId) -> Result<TokenPair, AuthError> {
        self.issue_pair_at(user_id, Utc::now())
    }

    pub fn issue_pair_at(
        &self,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> Result<TokenPair, AuthError> {
        let access = self.issue_access_token_at(user_id, now)?;
        let renewal = self.issue_renewal_token_at(user_id, now)?;
        Ok(TokenPair {
            access_token: access.token,
            renewal_token: renewal.token,
            access_expires_at: access.expires_at,
            renewal_expires_at: renewal.expires_at,
        })
    }

    fn sign(
        &self,
        kind: TokenKind,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, AuthError> {
        // JWT times are whole seconds, so the reported expiry must be too
        let now = DateTime::from_timestamp(now.timestamp(), 0)
            .ok_or_else(|| AuthError::Fatal("issue time is out of range".to_string()))?;
        let expires_at = now
            .checked_add_signed(self.keys.ttl(kind))
            .ok_or_else(|| AuthError::Fatal("token expiry is out of range".to_string()))?;
        let claims = Claims {
            sub: user_id.to_string(),
            iss: self.keys.issuer().to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: generate_token_id(),
            typ: kind,
        };

        // HS256 only fails on a broken key, which is a configuration problem
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.keys.keys(kind).encoding,
        )
        .map_err(|e| AuthError::Fatal(format!("token signing failed: {e}")))?;

        Ok(IssuedToken { token, expires_at })
    }
}
