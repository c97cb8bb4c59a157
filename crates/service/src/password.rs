//! Argon2 password hashing shared by registration and the admin service.

use argon2::password_hash::{PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Argon2, PasswordHash};
use rand::rngs::OsRng;

use crate::errors::ServiceError;

pub fn hash(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ServiceError::Repository(format!("password hashing failed: {e}")))?;
    Ok(hash.to_string())
}

/// A malformed stored hash counts as a mismatch rather than an error; login
/// reports generic invalid credentials either way.
pub fn verify(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
        Err(_) => false,
    }
}
