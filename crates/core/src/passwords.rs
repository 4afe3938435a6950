//! Password hashing with Argon2id and a random salt per hash.

use crate::constants::MIN_PASSWORD_LEN;
use crate::{CoreError, CoreResult};
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rand_core::OsRng;

pub fn hash_password(password: &str) -> CoreResult<String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(CoreError::invalid(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| CoreError::PasswordHash)
}

/// Checks `password` against a stored PHC hash string.
///
/// A mismatch is `Ok(false)`; only an unreadable stored hash is an error.
pub fn verify_password(stored_hash: &str, password: &str) -> CoreResult<bool> {
    let parsed = PasswordHash::new(stored_hash).map_err(|_| CoreError::PasswordHash)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let hash = hash_password("rahasia123").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(&hash, "rahasia123").unwrap());
        assert!(!verify_password(&hash, "wrong-password").unwrap());
    }

    #[test]
    fn test_short_password_rejected() {
        let err = hash_password("12345").unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }

    #[test]
    fn test_same_password_gets_distinct_salts() {
        assert_ne!(
            hash_password("rahasia123").unwrap(),
            hash_password("rahasia123").unwrap()
        );
    }

    #[test]
    fn test_garbage_hash_is_an_error() {
        assert!(verify_password("not-a-hash", "whatever").is_err());
    }
}
