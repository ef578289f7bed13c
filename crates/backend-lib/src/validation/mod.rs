// ============================
// crates/backend-lib/src/validation/mod.rs
// ============================
//! Input validation for registration, login and password changes.

use crate::auth::{validate_password_strength, PasswordRequirements};
use crate::error::AuthError;
use regex::Regex;
use sessionvault_common::NewUser;
use std::sync::LazyLock;
use thiserror::Error;

const MIN_USERNAME_LENGTH: usize = 3;
const MAX_USERNAME_LENGTH: usize = 32;
const MAX_PASSWORD_LENGTH: usize = 128;
const MAX_FULL_NAME_LENGTH: usize = 100;
const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321 SMTP limit

// Usernames are checked after lower-casing
static USERNAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9_.-]+$").expect("username pattern compiles"));
static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern compiles")
});
static FULL_NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^<>/\\{}\[\];]*$").expect("full name pattern compiles"));

/// Possible validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("Invalid full name: {0}")]
    InvalidFullName(String),

    #[error("Invalid password: {0}")]
    InvalidPassword(String),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),
}

impl From<ValidationError> for AuthError {
    fn from(err: ValidationError) -> Self {
        AuthError::InvalidInput(err.to_string())
    }
}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validate a username
pub fn validate_username(username: &str) -> ValidationResult<&str> {
    let username = username.trim();
    let length = username.chars().count();

    if length < MIN_USERNAME_LENGTH || length > MAX_USERNAME_LENGTH {
        return Err(ValidationError::InvalidUsername(format!(
            "Username must be between {MIN_USERNAME_LENGTH} and {MAX_USERNAME_LENGTH} characters"
        )));
    }

    if !USERNAME_REGEX.is_match(&username.to_lowercase()) {
        return Err(ValidationError::InvalidUsername(
            "Username may only contain letters, digits, '.', '_' and '-'".to_string(),
        ));
    }

    Ok(username)
}

/// Validate an email address
pub fn validate_email(email: &str) -> ValidationResult<&str> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::InvalidEmail(
            "Email address cannot be empty".to_string(),
        ));
    }

    if email.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::InvalidEmail(format!(
            "Email address cannot exceed {MAX_EMAIL_LENGTH} characters"
        )));
    }

    if !EMAIL_REGEX.is_match(email) {
        return Err(ValidationError::InvalidEmail(
            "Invalid email address format".to_string(),
        ));
    }

    Ok(email)
}

/// Validate a display name
pub fn validate_full_name(full_name: &str) -> ValidationResult<&str> {
    let full_name = full_name.trim();

    if full_name.is_empty() {
        return Err(ValidationError::InvalidFullName(
            "Full name must not be empty".to_string(),
        ));
    }

    if full_name.chars().count() > MAX_FULL_NAME_LENGTH {
        return Err(ValidationError::InvalidFullName(format!(
            "Full name cannot exceed {MAX_FULL_NAME_LENGTH} characters"
        )));
    }

    if !FULL_NAME_REGEX.is_match(full_name) {
        return Err(ValidationError::InvalidFullName(
            "Full name contains invalid characters".to_string(),
        ));
    }

    Ok(full_name)
}

/// Validate a new password against the configured requirements
pub fn validate_password<'a>(
    password: &'a str,
    requirements: &PasswordRequirements,
) -> ValidationResult<&'a str> {
    if password.chars().count() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::InvalidPassword(format!(
            "Password cannot exceed {MAX_PASSWORD_LENGTH} characters"
        )));
    }

    if !validate_password_strength(password, requirements) {
        return Err(ValidationError::InvalidPassword(format!(
            "Password must be at least {} characters and meet the complexity requirements",
            requirements.min_length
        )));
    }

    Ok(password)
}

/// Validate a login identifier (username or email)
pub fn validate_identifier(identifier: &str) -> ValidationResult<&str> {
    let identifier = identifier.trim();
    if identifier.is_empty() {
        return Err(ValidationError::InvalidIdentifier(
            "Username or email must not be empty".to_string(),
        ));
    }
    if identifier.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::InvalidIdentifier(
            "Username or email is too long".to_string(),
        ));
    }
    Ok(identifier)
}

/// Validate every field of a registration request
pub fn validate_new_user(
    user: &NewUser,
    requirements: &PasswordRequirements,
) -> ValidationResult<()> {
    validate_username(&user.username)?;
    validate_email(&user.email)?;
    validate_full_name(&user.full_name)?;
    validate_password(&user.password, requirements)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user() -> NewUser {
        NewUser {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            full_name: "Alice Liddell".to_string(),
            password: "Wonderland#2024".to_string(),
        }
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("Alice.B_c-1").is_ok());
        assert_eq!(validate_username("  bob  "), Ok("bob"));

        assert!(matches!(
            validate_username("ab"),
            Err(ValidationError::InvalidUsername(_))
        ));
        assert!(matches!(
            validate_username(&"a".repeat(33)),
            Err(ValidationError::InvalidUsername(_))
        ));
        assert!(matches!(
            validate_username("al ice"),
            Err(ValidationError::InvalidUsername(_))
        ));
        assert!(matches!(
            validate_username("alice@example.com"),
            Err(ValidationError::InvalidUsername(_))
        ));
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("test@example.com").is_ok());
        assert!(validate_email("user.name+tag@example.co.uk").is_ok());

        assert!(matches!(
            validate_email(""),
            Err(ValidationError::InvalidEmail(_))
        ));
        assert!(matches!(
            validate_email("invalid-email"),
            Err(ValidationError::InvalidEmail(_))
        ));
        assert!(matches!(
            validate_email("user@domain"),
            Err(ValidationError::InvalidEmail(_))
        ));

        let long_email = format!("{}@example.com", "a".repeat(250));
        assert!(matches!(
            validate_email(&long_email),
            Err(ValidationError::InvalidEmail(_))
        ));
    }

    #[test]
    fn test_validate_full_name() {
        assert!(validate_full_name("Alice Liddell").is_ok());
        assert!(validate_full_name("   ").is_err());
        assert!(validate_full_name("<script>").is_err());
        assert!(validate_full_name(&"x".repeat(101)).is_err());
    }

    #[test]
    fn test_validate_password() {
        let requirements = PasswordRequirements::default();
        assert!(validate_password("Wonderland#2024", &requirements).is_ok());

        assert!(matches!(
            validate_password("short", &requirements),
            Err(ValidationError::InvalidPassword(_))
        ));
        assert!(matches!(
            validate_password("nouppercase#2024", &requirements),
            Err(ValidationError::InvalidPassword(_))
        ));

        let long = format!("Aa1#{}", "x".repeat(130));
        assert!(matches!(
            validate_password(&long, &requirements),
            Err(ValidationError::InvalidPassword(_))
        ));
    }

    #[test]
    fn test_validate_identifier() {
        assert_eq!(validate_identifier(" alice "), Ok("alice"));
        assert!(matches!(
            validate_identifier("   "),
            Err(ValidationError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_validate_new_user() {
        let requirements = PasswordRequirements::default();
        assert!(validate_new_user(&new_user(), &requirements).is_ok());

        let mut bad_email = new_user();
        bad_email.email = "nope".to_string();
        assert!(matches!(
            validate_new_user(&bad_email, &requirements),
            Err(ValidationError::InvalidEmail(_))
        ));
    }

    #[test]
    fn test_converts_to_invalid_input() {
        let err: AuthError = ValidationError::InvalidEmail("bad".into()).into();
        assert!(matches!(err, AuthError::InvalidInput(_)));
    }
}
