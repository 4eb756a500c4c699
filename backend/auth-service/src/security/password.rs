//! Password hashing and input validation.

use bcrypt::{hash, verify, DEFAULT_COST};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{AuthError, Result};

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("hardcoded email regex is invalid - fix source code")
});

pub fn hash_password(password: &str) -> Result<String> {
    Ok(hash(password, DEFAULT_COST)?)
}

pub fn verify_password(password: &str, hashed: &str) -> Result<bool> {
    Ok(verify(password, hashed)?)
}

pub fn validate_email(email: &str) -> bool {
    !email.is_empty() && email.len() <= 254 && EMAIL_REGEX.is_match(email)
}

/// Minimum 8 chars with at least one letter and one digit.
pub fn validate_password(password: &str) -> bool {
    password.len() >= 8
        && password.chars().any(|c| c.is_ascii_alphabetic())
        && password.chars().any(|c| c.is_ascii_digit())
}

pub fn check_registration_input(email: &str, password: &str) -> Result<()> {
    if !validate_email(email) {
        return Err(AuthError::Validation("invalid email format".into()));
    }
    if !validate_password(password) {
        return Err(AuthError::Validation(
            "password must be at least 8 characters with letters and digits".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_round_trip() {
        let hashed = hash_password("Passw0rd!").unwrap();
        assert!(verify_password("Passw0rd!", &hashed).unwrap());
        assert!(!verify_password("wrong", &hashed).unwrap());
    }

    #[test]
    fn email_validation() {
        assert!(validate_email("u@x.co"));
        assert!(validate_email("user.name+tag@example.com"));
        assert!(!validate_email(""));
        assert!(!validate_email("not-an-email"));
        assert!(!validate_email("@example.com"));
    }

    #[test]
    fn password_validation() {
        assert!(validate_password("Passw0rd"));
        assert!(!validate_password("short1"));
        assert!(!validate_password("alllowercase"));
        assert!(!validate_password("12345678"));
    }
}
