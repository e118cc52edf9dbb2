//! Stored passwords are argon2id PHC strings (`$argon2id$v=19$...`).

use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;

/// Hashes `plain` under a fresh salt, so equal passwords never share a hash.
pub fn hash_password(plain: &str) -> password_hash::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let phc = Argon2::default().hash_password(plain.as_bytes(), &salt)?;
    Ok(phc.to_string())
}

/// A wrong password is `Ok(false)`. Errors are reserved for stored values
/// that are not a usable PHC string.
pub fn verify_password(plain: &str, stored: &str) -> password_hash::Result<bool> {
    let phc = PasswordHash::new(stored)?;
    match Argon2::default().verify_password(plain.as_bytes(), &phc) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e),
    }
}
