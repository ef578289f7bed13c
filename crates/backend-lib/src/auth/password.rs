// ============================
// sessionvault-backend/src/auth/password.rs
// ============================
//! Password hashing and verification.
//!
//! Hashes are PHC strings, so the algorithm and its cost parameters travel
//! with every stored hash. Verification accepts both supported algorithms
//! regardless of which one is configured for new hashes.
use crate::error::AuthError;
use argon2::Argon2;
use scrypt::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Scrypt,
};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// Minimum password length
pub const MIN_PASSWORD_LENGTH: usize = 10;

/// Algorithm used for newly created hashes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Scrypt,
    Argon2id,
}

/// Hashing algorithm and cost parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HasherSettings {
    pub algorithm: HashAlgorithm,
    pub scrypt_log_n: u8,
    pub scrypt_r: u32,
    pub scrypt_p: u32,
    /// Argon2 memory cost in KiB
    pub argon2_m_cost: u32,
    pub argon2_t_cost: u32,
    pub argon2_p_cost: u32,
}

impl Default for HasherSettings {
    fn default() -> Self {
        Self {
            algorithm: HashAlgorithm::Scrypt,
            scrypt_log_n: scrypt::Params::RECOMMENDED_LOG_N,
            scrypt_r: scrypt::Params::RECOMMENDED_R,
            scrypt_p: scrypt::Params::RECOMMENDED_P,
            argon2_m_cost: argon2::Params::DEFAULT_M_COST,
            argon2_t_cost: argon2::Params::DEFAULT_T_COST,
            argon2_p_cost: argon2::Params::DEFAULT_P_COST,
        }
    }
}

impl HasherSettings {
    fn scrypt_params(&self) -> Result<scrypt::Params, String> {
        scrypt::Params::new(
            self.scrypt_log_n,
            self.scrypt_r,
            self.scrypt_p,
            scrypt::Params::RECOMMENDED_LEN,
        )
        .map_err(|e| format!("invalid scrypt parameters: {e}"))
    }

    fn argon2_params(&self) -> Result<argon2::Params, String> {
        argon2::Params::new(
            self.argon2_m_cost,
            self.argon2_t_cost,
            self.argon2_p_cost,
            None,
        )
        .map_err(|e| format!("invalid argon2 parameters: {e}"))
    }

    /// Check that both parameter sets are usable
    pub fn validate(&self) -> Result<(), String> {
        self.scrypt_params()?;
        self.argon2_params()?;
        Ok(())
    }
}

/// Password complexity requirements
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordRequirements {
    pub min_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_digit: bool,
    pub require_special: bool,
}

impl Default for PasswordRequirements {
    fn default() -> Self {
        Self {
            min_length: MIN_PASSWORD_LENGTH,
            require_uppercase: true,
            require_lowercase: true,
            require_digit: true,
            require_special: true,
        }
    }
}

/// One-way password hasher
#[derive(Clone)]
pub struct CredentialHasher {
    algorithm: HashAlgorithm,
    scrypt: scrypt::Params,
    argon2: Argon2<'static>,
    /// Verified against when the login identifier matched nobody
    dummy_hash: String,
}

impl std::fmt::Debug for CredentialHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialHasher")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl CredentialHasher {
    /// Build a hasher; invalid cost parameters are a fatal misconfiguration
    pub fn new(settings: &HasherSettings) -> Result<Self, AuthError> {
        let scrypt = settings.scrypt_params().map_err(AuthError::Fatal)?;
        let argon2 = Argon2::new(
            argon2::Algorithm::Argon2id,
            argon2::Version::V0x13,
            settings.argon2_params().map_err(AuthError::Fatal)?,
        );

        let mut hasher = Self {
            algorithm: settings.algorithm,
            scrypt,
            argon2,
            dummy_hash: String::new(),
        };
        hasher.dummy_hash = hasher.hash("sessionvault-dummy-password")?;
        Ok(hasher)
    }

    /// Algorithm used for new hashes
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Hash a password with a fresh random salt
    pub fn hash(&self, plain: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = match self.algorithm {
            HashAlgorithm::Scrypt => {
                Scrypt.hash_password_customized(plain.as_bytes(), None, None, self.scrypt, &salt)
            },
            HashAlgorithm::Argon2id => self.argon2.hash_password(plain.as_bytes(), &salt),
        }
        .map_err(|e| AuthError::Fatal(format!("password hashing failed: {e}")))?;
        Ok(hash.to_string())
    }

    /// Verify a password against a stored hash.
    ///
    /// Malformed or unsupported hashes verify as `false`.
    pub fn verify(&self, plain: &str, hash: &str) -> bool {
        let parsed_hash = match PasswordHash::new(hash) {
            Ok(h) => h,
            Err(_) => return false,
        };
        let verifiers: [&dyn PasswordVerifier; 2] = [&Scrypt, &self.argon2];
        parsed_hash
            .verify_password(&verifiers, plain.as_bytes())
            .is_ok()
    }

    /// Burn the same work as a real verification; always `false`
    pub fn verify_dummy(&self, plain: &str) -> bool {
        let _ = self.verify(plain, &self.dummy_hash);
        false
    }

    /// Hash a password and zeroize the original
    pub fn hash_secure(&self, plain: &mut String) -> Result<String, AuthError> {
        let hash = self.hash(plain);
        plain.zeroize();
        hash
    }
}

/// Check if a password meets the complexity requirements
pub fn validate_password_strength(password: &str, requirements: &PasswordRequirements) -> bool {
    if password.chars().count() < requirements.min_length {
        return false;
    }

    if requirements.require_uppercase && !password.chars().any(|c| c.is_uppercase()) {
        return false;
    }

    if requirements.require_lowercase && !password.chars().any(|c| c.is_lowercase()) {
        return false;
    }

    if requirements.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
        return false;
    }

    if requirements.require_special && !password.chars().any(|c| !c.is_alphanumeric()) {
        return false;
    }

    true
}
