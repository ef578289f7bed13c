// crates/backend-lib/src/error.rs

//! Central error types for the session-credential core.
use thiserror::Error;

/// Why a presented token was rejected
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,

    #[error("token signature does not verify")]
    BadSignature,

    #[error("token has expired")]
    Expired,

    #[error("token is of the wrong kind")]
    WrongKind,
}

/// Failures reported by a user store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("user record not found: {0}")]
    NotFound(String),

    #[error("conflicting user record: {0}")]
    Conflict(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Error kinds surfaced by every session operation
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("user not found")]
    NotFound,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid token: {0}")]
    Invalid(#[from] TokenError),

    #[error("renewal token is stale or has already been used")]
    StaleOrReused,

    #[error("user with this username or email already exists")]
    AlreadyExists,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("too many failed login attempts")]
    RateLimited,

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("fatal misconfiguration: {0}")]
    Fatal(String),
}

impl AuthError {
    /// Stable error code for the transport layer
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::NotFound => "AUTH_001",
            AuthError::InvalidCredentials => "AUTH_002",
            AuthError::RateLimited => "AUTH_003",
            AuthError::Invalid(_) => "TOKEN_001",
            AuthError::StaleOrReused => "TOKEN_002",
            AuthError::AlreadyExists => "USER_001",
            AuthError::InvalidInput(_) => "VAL_001",
            AuthError::Store(_) => "STORE_001",
            AuthError::Fatal(_) => "FATAL_001",
        }
    }

    /// Message that is safe to hand to an unauthenticated caller.
    ///
    /// Unknown users and wrong passwords collapse to the same text so the
    /// response cannot be used to enumerate accounts.
    pub fn sanitized_message(&self) -> String {
        match self {
            AuthError::NotFound | AuthError::InvalidCredentials => {
                "Authentication failed".to_string()
            },
            AuthError::Invalid(_) => "Invalid or expired token".to_string(),
            AuthError::StaleOrReused => "Renewal token is expired or used".to_string(),
            AuthError::AlreadyExists => {
                "User with this username or email already exists".to_string()
            },
            AuthError::InvalidInput(msg) => format!("Invalid input: {msg}"),
            AuthError::RateLimited => {
                "Too many authentication attempts, please try again later".to_string()
            },
            AuthError::Store(_) => "An internal server error occurred".to_string(),
            AuthError::Fatal(_) => "Service unavailable".to_string(),
        }
    }

    /// Credential or token failure, as opposed to a server-side problem
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            AuthError::NotFound
                | AuthError::InvalidCredentials
                | AuthError::Invalid(_)
                | AuthError::StaleOrReused
        )
    }

    /// Not recoverable by retrying the request
    pub fn is_fatal(&self) -> bool {
        matches!(self, AuthError::Fatal(_))
    }
}
