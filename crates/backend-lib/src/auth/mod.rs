// ============================
// sessionvault-backend/src/auth/mod.rs
// ============================
//! Authentication module: password hashing, token issuance and
//! verification, and the session lifecycle built on them.

pub mod issuer;
pub mod password;
pub mod rate_limit;
pub mod session;
pub mod token;
pub mod token_generator;
pub mod verifier;
mod service;

pub use issuer::{IssuedToken, TokenIssuer};
pub use password::{
    validate_password_strength, CredentialHasher, HashAlgorithm, HasherSettings,
    PasswordRequirements, MIN_PASSWORD_LENGTH,
};
pub use rate_limit::{AuthRateLimiter, ThrottleSettings};
pub use service::AuthService;
pub use session::{SessionManager, SessionPolicy};
pub use token::{SigningKeys, TokenKind};
pub use verifier::TokenVerifier;
