// ============================
// crates/backend-lib/src/auth/token.rs
// ============================
//! Signing keys and the claim set shared by the issuer and the verifier.
use crate::config::{SigningSettings, MAX_TTL_SECS, MIN_SECRET_LENGTH};
use crate::error::AuthError;
use chrono::Duration;
use jsonwebtoken::{DecodingKey, EncodingKey};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which of the two credential kinds a token is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Renewal,
}

/// Claims carried by every issued credential
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Claims {
    /// User id
    pub sub: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    /// Random per-token id
    pub jti: String,
    pub typ: TokenKind,
}

pub(crate) struct KeyPair {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
}

impl KeyPair {
    fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

/// Signing material and lifetimes, built once at process start
pub struct SigningKeys {
    access: KeyPair,
    renewal: KeyPair,
    issuer: String,
    access_ttl: Duration,
    renewal_ttl: Duration,
}

impl fmt::Debug for SigningKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKeys")
            .field("issuer", &self.issuer)
            .field("access_ttl", &self.access_ttl)
            .field("renewal_ttl", &self.renewal_ttl)
            .finish_non_exhaustive()
    }
}

impl SigningKeys {
    /// Build keys from settings. Any problem here is fatal.
    pub fn from_settings(settings: &SigningSettings) -> Result<Self, AuthError> {
        let access_secret = require_secret("signing.access_secret", &settings.access_secret)?;
        let renewal_secret = match settings.renewal_secret.as_deref() {
            Some(secret) => require_secret("signing.renewal_secret", secret)?,
            None => access_secret,
        };

        if settings.issuer.trim().is_empty() {
            return Err(AuthError::Fatal("signing.issuer must not be empty".to_string()));
        }
        if settings.access_ttl_secs <= 0 {
            return Err(AuthError::Fatal(
                "signing.access_ttl_secs must be positive".to_string(),
            ));
        }
        if settings.renewal_ttl_secs <= settings.access_ttl_secs {
            return Err(AuthError::Fatal(
                "signing.renewal_ttl_secs must be longer than signing.access_ttl_secs".to_string(),
            ));
        }

        Ok(Self {
            access: KeyPair::from_secret(access_secret),
            renewal: KeyPair::from_secret(renewal_secret),
            issuer: settings.issuer.clone(),
            access_ttl: ttl_from_secs("signing.access_ttl_secs", settings.access_ttl_secs)?,
            renewal_ttl: ttl_from_secs("signing.renewal_ttl_secs", settings.renewal_ttl_secs)?,
        })
    }

    pub(crate) fn keys(&self, kind: TokenKind) -> &KeyPair {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Renewal => &self.renewal,
        }
    }

    /// Lifetime of tokens of the given kind
    pub fn ttl(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Renewal => self.renewal_ttl,
        }
    }

    /// Value of the `iss` claim
    pub fn issuer(&self) -> &str {
        &self.issuer
    }
}

fn ttl_from_secs(name: &str, secs: i64) -> Result<Duration, AuthError> {
    if secs > MAX_TTL_SECS {
        return Err(AuthError::Fatal(format!("{name} must not exceed {MAX_TTL_SECS}")));
    }
    Duration::try_seconds(secs)
        .ok_or_else(|| AuthError::Fatal(format!("{name} is out of range")))
}

fn require_secret<'a>(name: &str, secret: &'a str) -> Result<&'a [u8], AuthError> {
    if secret.is_empty() {
        return Err(AuthError::Fatal(format!("{name} is not set")));
    }
    if secret.len() < MIN_SECRET_LENGTH {
        return Err(AuthError::Fatal(format!(
            "{name} must be at least {MIN_SECRET_LENGTH} bytes"
        )));
    }
    Ok(secret.as_bytes())
}
