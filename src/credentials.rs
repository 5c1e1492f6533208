//! Credential hashing collaborator.
//!
//! Snapshots never carry plaintext or hashed credentials, so every
//! restored account gets a freshly hashed replacement password. The
//! hasher sits behind a trait so restore logic and tests do not depend
//! on a concrete algorithm.

use anyhow::Result;
use argon2::Argon2;
use argon2::password_hash::{PasswordHasher, SaltString, rand_core::OsRng};

/// Produces password hashes for seeded credentials.
pub trait CredentialHasher {
    /// Hash a plaintext password into its stored form.
    fn hash(&self, plaintext: &str) -> Result<String>;
}

/// Argon2id hasher with library defaults, emitting PHC strings.
#[derive(Debug, Default)]
pub struct Argon2Hasher;

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, plaintext: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?;
        Ok(hash.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_phc_string() {
        let hash = Argon2Hasher.hash("changeme123").expect("hashing failed");
        assert!(hash.starts_with("$argon2id$"));
    }

    #[test]
    fn test_hash_salts_differ() {
        let a = Argon2Hasher.hash("changeme123").expect("hashing failed");
        let b = Argon2Hasher.hash("changeme123").expect("hashing failed");
        assert_ne!(a, b);
    }
}
