// ============================
// sessionvault-backend/src/config.rs
// ============================
//! Configuration management.
//!
//! Settings are layered with figment: built-in defaults, then a TOML file,
//! then `SESSIONVAULT_`-prefixed environment variables (`__` separates
//! nested keys, e.g. `SESSIONVAULT_SIGNING__ACCESS_SECRET`).
use crate::auth::{HasherSettings, PasswordRequirements, SessionPolicy, ThrottleSettings};
use crate::error::AuthError;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default config file looked up in the working directory
pub const CONFIG_FILE: &str = "sessionvault.toml";

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "SESSIONVAULT_";

/// Signing secrets shorter than this are rejected at startup
pub const MIN_SECRET_LENGTH: usize = 32;

/// Longest accepted token lifetime (ten years)
pub const MAX_TTL_SECS: i64 = 10 * 365 * 24 * 60 * 60;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Configuration failures. All of them are fatal at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(Box<figment::Error>),

    #[error("configuration file not found: {0}")]
    MissingFile(PathBuf),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::Load(Box::new(err))
    }
}

impl From<ConfigError> for AuthError {
    fn from(err: ConfigError) -> Self {
        AuthError::Fatal(err.to_string())
    }
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Log level used when `RUST_LOG` is not set
    pub log_level: String,
    /// Emit logs as JSON lines
    pub log_json: bool,
    /// Flat-file user store location
    pub storage: StorageSettings,
    /// Token signing secrets and lifetimes
    pub signing: SigningSettings,
    /// Password hashing algorithm and cost
    pub hasher: HasherSettings,
    /// Password complexity requirements
    pub password_requirements: PasswordRequirements,
    /// Session policy switches
    pub policy: SessionPolicy,
    /// Failed-login lockout
    pub login_throttle: ThrottleSettings,
}

/// Storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Root directory of the flat-file store
    pub path: PathBuf,
}

/// Token signing settings
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SigningSettings {
    /// HMAC secret for access tokens
    pub access_secret: String,
    /// HMAC secret for renewal tokens; the access secret is reused when unset
    pub renewal_secret: Option<String>,
    /// `iss` claim written into and required from every token
    pub issuer: String,
    /// Access token lifetime in seconds
    pub access_ttl_secs: i64,
    /// Renewal token lifetime in seconds
    pub renewal_ttl_secs: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_json: false,
            storage: StorageSettings::default(),
            signing: SigningSettings::default(),
            hasher: HasherSettings::default(),
            password_requirements: PasswordRequirements::default(),
            policy: SessionPolicy::default(),
            login_throttle: ThrottleSettings::default(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data"),
        }
    }
}

impl Default for SigningSettings {
    fn default() -> Self {
        Self {
            access_secret: String::new(),
            renewal_secret: None,
            issuer: "sessionvault".to_string(),
            access_ttl_secs: 15 * 60,            // 15 minutes
            renewal_ttl_secs: 10 * 24 * 60 * 60, // 10 days
        }
    }
}

// Secrets never show up in logs or panic messages.
impl fmt::Debug for SigningSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningSettings")
            .field("access_secret", &"<redacted>")
            .field(
                "renewal_secret",
                &self.renewal_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("issuer", &self.issuer)
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("renewal_ttl_secs", &self.renewal_ttl_secs)
            .finish()
    }
}

impl Settings {
    /// Load settings from `sessionvault.toml` (if present) and the environment
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Self::figment(Path::new(CONFIG_FILE)).extract()?;
        Ok(settings)
    }

    /// Load settings from an explicit file, which must exist
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::MissingFile(path.to_path_buf()));
        }
        let settings = Self::figment(path).extract()?;
        Ok(settings)
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Check every startup-fatal condition, reporting all of them at once
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();

        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            problems.push(format!("log_level `{}` is not a known level", self.log_level));
        }

        let signing = &self.signing;
        check_secret(
            "signing.access_secret",
            Some(signing.access_secret.as_str()),
            &mut problems,
        );
        if signing.renewal_secret.is_some() {
            check_secret(
                "signing.renewal_secret",
                signing.renewal_secret.as_deref(),
                &mut problems,
            );
        }
        if signing.issuer.trim().is_empty() {
            problems.push("signing.issuer must not be empty".to_string());
        }
        if signing.access_ttl_secs <= 0 {
            problems.push("signing.access_ttl_secs must be positive".to_string());
        }
        for (name, ttl) in [
            ("signing.access_ttl_secs", signing.access_ttl_secs),
            ("signing.renewal_ttl_secs", signing.renewal_ttl_secs),
        ] {
            if ttl > MAX_TTL_SECS {
                problems.push(format!("{name} must not exceed {MAX_TTL_SECS}"));
            }
        }
        if signing.renewal_ttl_secs <= signing.access_ttl_secs {
            problems.push(
                "signing.renewal_ttl_secs must be longer than signing.access_ttl_secs".to_string(),
            );
        }

        if let Err(err) = self.hasher.validate() {
            problems.push(err);
        }

        if self.password_requirements.min_length < 8 {
            problems.push("password_requirements.min_length must be at least 8".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(problems.join("; ")))
        }
    }
}

fn check_secret(name: &str, secret: Option<&str>, problems: &mut Vec<String>) {
    match secret {
        None => problems.push(format!("{name} is not set")),
        Some(s) if s.is_empty() => problems.push(format!("{name} is not set")),
        Some(s) if s.len() < MIN_SECRET_LENGTH => {
            problems.push(format!("{name} must be at least {MIN_SECRET_LENGTH} bytes"))
        },
        Some(_) => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::HashAlgorithm;
    use figment::Jail;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn valid_settings() -> Settings {
        let mut settings = Settings::default();
        settings.signing.access_secret = SECRET.to_string();
        settings
    }

    #[test]
    fn test_settings_default() {
        let settings = Settings::default();
        assert_eq!(settings.log_level, "info");
        assert_eq!(settings.storage.path, PathBuf::from("data"));
        assert_eq!(settings.signing.access_ttl_secs, 900);
        assert!(settings.signing.renewal_ttl_secs > settings.signing.access_ttl_secs);
        assert!(!settings.policy.revoke_sessions_on_password_change);
        assert_eq!(settings.hasher.algorithm, HashAlgorithm::Scrypt);
    }

    #[test]
    fn test_missing_secret_is_fatal() {
        let settings = Settings::default();
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("signing.access_secret is not set"));

        let fatal: AuthError = err.into();
        assert!(fatal.is_fatal());
    }

    #[test]
    fn test_settings_validation() {
        assert!(valid_settings().validate().is_ok());

        let mut invalid = valid_settings();
        invalid.log_level = "invalid".to_string();
        assert!(invalid.validate().is_err());

        let mut invalid = valid_settings();
        invalid.signing.access_secret = "short".to_string();
        assert!(invalid.validate().is_err());

        let mut invalid = valid_settings();
        invalid.signing.renewal_secret = Some("short".to_string());
        assert!(invalid.validate().is_err());

        let mut invalid = valid_settings();
        invalid.signing.access_ttl_secs = 0;
        assert!(invalid.validate().is_err());

        let mut invalid = valid_settings();
        invalid.signing.renewal_ttl_secs = invalid.signing.access_ttl_secs;
        assert!(invalid.validate().is_err());

        let mut invalid = valid_settings();
        invalid.signing.renewal_ttl_secs = 10_000_000_000_000;
        let message = invalid.validate().unwrap_err().to_string();
        assert!(message.contains("signing.renewal_ttl_secs must not exceed"));

        let mut at_limit = valid_settings();
        at_limit.signing.renewal_ttl_secs = MAX_TTL_SECS;
        assert!(at_limit.validate().is_ok());

        let mut invalid = valid_settings();
        invalid.password_requirements.min_length = 4;
        assert!(invalid.validate().is_err());

        let mut invalid = valid_settings();
        invalid.hasher.scrypt_log_n = 0;
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_validation_reports_every_problem() {
        let mut settings = Settings::default();
        settings.signing.access_ttl_secs = -1;
        let message = settings.validate().unwrap_err().to_string();
        assert!(message.contains("access_secret"));
        assert!(message.contains("access_ttl_secs"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut settings = valid_settings();
        settings.signing.renewal_secret = Some("fedcba9876543210fedcba9876543210".to_string());
        let rendered = format!("{settings:?}");
        assert!(!rendered.contains(SECRET));
        assert!(!rendered.contains("fedcba9876543210"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_load_settings_from_file_and_env() {
        Jail::expect_with(|jail| {
            jail.create_file(
                CONFIG_FILE,
                r#"
                log_level = "debug"

                [storage]
                path = "test_data"

                [signing]
                access_secret = "0123456789abcdef0123456789abcdef"
                access_ttl_secs = 60

                [policy]
                revoke_sessions_on_password_change = true
                "#,
            )?;
            jail.set_env("SESSIONVAULT_LOG_LEVEL", "warn");
            jail.set_env("SESSIONVAULT_SIGNING__RENEWAL_TTL_SECS", "3600");

            let settings = Settings::load().map_err(|e| e.to_string())?;
            // Environment variables take precedence over the file
            assert_eq!(settings.log_level, "warn");
            assert_eq!(settings.storage.path, PathBuf::from("test_data"));
            assert_eq!(settings.signing.access_secret, SECRET);
            assert_eq!(settings.signing.access_ttl_secs, 60);
            assert_eq!(settings.signing.renewal_ttl_secs, 3600);
            assert!(settings.policy.revoke_sessions_on_password_change);
            // Untouched sections keep their defaults
            assert_eq!(settings.signing.issuer, "sessionvault");
            assert!(settings.validate().is_ok());
            Ok(())
        });
    }

    #[test]
    fn test_load_from_missing_file() {
        let err = Settings::load_from("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::MissingFile(_)));
    }

    #[test]
    fn test_load_from_explicit_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "custom.toml",
                r#"
                [hasher]
                algorithm = "argon2id"
                "#,
            )?;

            let settings = Settings::load_from("custom.toml").map_err(|e| e.to_string())?;
            assert_eq!(settings.hasher.algorithm, HashAlgorithm::Argon2id);
            Ok(())
        });
    }
}
