// ============================
// crates/backend-lib/src/auth/verifier.rs
// ============================
//! Stateless verification of presented credentials.
//!
//! The verifier holds signing keys and nothing else. Whether a renewal token
//! is still the live one is decided by the session manager against the store.
use super::token::{Claims, SigningKeys, TokenKind};
use crate::error::{AuthError, TokenError};
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, Validation};
use sessionvault_common::UserId;
use std::sync::Arc;

/// Token verifier
#[derive(Clone)]
pub struct TokenVerifier {
    keys: Arc<SigningKeys>,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(keys: Arc<SigningKeys>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against an explicit clock below
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_issuer(&[keys.issuer()]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        Self { keys, validation }
    }

    /// Check an access token's signature, kind and expiry
    pub fn verify_access_token(&self, token: &str) -> Result<UserId, AuthError> {
        self.verify_access_token_at(token, Utc::now())
    }

    pub fn verify_access_token_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<UserId, AuthError> {
        Ok(self.verify(token, TokenKind::Access, now)?)
    }

    /// Check a renewal token's signature, kind and expiry (not its freshness)
    pub fn verify_renewal_token(&self, token: &str) -> Result<UserId, AuthError> {
        self.verify_renewal_token_at(token, Utc::now())
    }

    pub fn verify_renewal_token_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<UserId, AuthError> {
        Ok(self.verify(token, TokenKind::Renewal, now)?)
    }

    fn verify(&self, token: &str, kind: TokenKind, now: DateTime<Utc>) -> Result<UserId, TokenError> {
        let data = decode::<Claims>(token, &self.keys.keys(kind).decoding, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::BadSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            })?;
        let claims = data.claims;

        if claims.typ != kind {
            return Err(TokenError::WrongKind);
        }
        if now.timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }

        claims.sub.parse().map_err(|_| TokenError::Malformed)
    }
}
