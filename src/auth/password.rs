//! Password policy, bcrypt hashing and the random secrets handed out by
//! invitation and reset flows.

use bcrypt::{hash, verify, DEFAULT_COST};
use rand::{distributions::Alphanumeric, Rng};
use regex::RegexSet;
use thiserror::Error;

pub const MIN_PASSWORD_CHARS: usize = 8;
pub const MAX_PASSWORD_CHARS: usize = 128;

const RESET_TOKEN_CHARS: usize = 32;
const TEMPORARY_PASSWORD_CHARS: usize = 24;

/// Character classes every password needs, paired with the message shown
/// when one is absent. Order decides which complaint the user sees first.
const REQUIRED_CLASSES: [(&str, &str); 4] = [
    (r"\p{Lu}", "an uppercase letter"),
    (r"\p{Ll}", "a lowercase letter"),
    (r"\p{N}", "a number"),
    (r"[^\p{L}\p{N}]", "a special character"),
];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PasswordError {
    #[error("Password must be between 8 and 128 characters long")]
    Length,
    #[error("Password must contain at least {0}")]
    MissingClass(&'static str),
    #[error("Failed to hash password")]
    HashingFailed,
    #[error("Failed to verify password")]
    VerificationFailed,
}

impl PasswordError {
    /// Policy violations are the caller's fault; hashing failures are not.
    pub fn is_policy_violation(&self) -> bool {
        matches!(self, PasswordError::Length | PasswordError::MissingClass(_))
    }
}

pub fn check_password_policy(password: &str) -> Result<(), PasswordError> {
    let length = password.chars().count();
    if !(MIN_PASSWORD_CHARS..=MAX_PASSWORD_CHARS).contains(&length) {
        return Err(PasswordError::Length);
    }

    let classes = RegexSet::new(REQUIRED_CLASSES.iter().map(|(pattern, _)| *pattern))
        .map_err(|_| PasswordError::HashingFailed)?;
    let present = classes.matches(password);

    match REQUIRED_CLASSES
        .iter()
        .enumerate()
        .find(|(index, _)| !present.matched(*index))
    {
        Some((_, (_, missing))) => Err(PasswordError::MissingClass(*missing)),
        None => Ok(()),
    }
}

/// Bcrypt hash of a password that passes [`check_password_policy`]
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    check_password_policy(password)?;
    hash(password, DEFAULT_COST).map_err(|_| PasswordError::HashingFailed)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    verify(password, hash).map_err(|_| PasswordError::VerificationFailed)
}

fn random_alphanumeric(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Single-use secret for reset and invitation links
pub fn generate_reset_token() -> String {
    random_alphanumeric(RESET_TOKEN_CHARS)
}

/// Throwaway password for invited accounts. Never shown to anyone; the
/// invitee sets a real one through the reset link.
pub fn generate_temporary_password() -> String {
    // Random letters alone may miss a class, so append one of each
    format!("{}Aa1!", random_alphanumeric(TEMPORARY_PASSWORD_CHARS))
}

/// Digest stored in place of refresh and reset tokens
pub fn hash_token(token: &str) -> String {
    format!("{:x}", md5::compute(token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_policy_reports_first_missing_class() {
        assert_eq!(check_password_policy("Sh0rt!"), Err(PasswordError::Length));
        assert_eq!(check_password_policy(&"Aa1!".repeat(33)), Err(PasswordError::Length));

        assert_matches!(
            check_password_policy("lowercase123!"),
            Err(PasswordError::MissingClass("an uppercase letter"))
        );
        assert_matches!(
            check_password_policy("UPPERCASE123!"),
            Err(PasswordError::MissingClass("a lowercase letter"))
        );
        assert_matches!(check_password_policy("Password!"), Err(PasswordError::MissingClass("a number")));
        assert_matches!(
            check_password_policy("Password123"),
            Err(PasswordError::MissingClass("a special character"))
        );

        assert!(check_password_policy("Password123!").is_ok());
        assert!(check_password_policy("Señorita 2024").is_ok());
    }

    #[test]
    fn test_policy_errors_read_as_sentences() {
        let err = check_password_policy("password123!").unwrap_err();
        assert!(err.is_policy_violation());
        assert_eq!(err.to_string(), "Password must contain at least an uppercase letter");
        assert!(!PasswordError::HashingFailed.is_policy_violation());
    }

    #[test]
    fn test_password_hashing() {
        let password = "TestPassword123!";
        let hash = hash_password(password).unwrap();

        assert!(verify_password(password, &hash).unwrap());
        assert!(!verify_password("WrongPassword", &hash).unwrap());
        assert_matches!(hash_password("weak"), Err(PasswordError::Length));
    }

    #[test]
    fn test_temporary_password_meets_policy() {
        let password = generate_temporary_password();
        assert!(check_password_policy(&password).is_ok());
        assert_ne!(password, generate_temporary_password());
    }

    #[test]
    fn test_reset_token_generation() {
        let token = generate_reset_token();

        assert_eq!(token.len(), RESET_TOKEN_CHARS);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(token, generate_reset_token());
        assert_eq!(hash_token(&token).len(), 32);
        assert_eq!(hash_token(&token), hash_token(&token));
    }
}
