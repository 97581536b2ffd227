//! Password hashing.
//!
//! Argon2id with a random salt per hash. The PHC string stores the salt and
//! the cost parameters, so hashes made under older settings keep verifying
//! after the configuration changes.

use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher as _, PasswordVerifier, Version};

use crate::error::{EngineError, EngineResult};

/// Hashes and verifies account passwords.
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl PasswordHasher {
    /// Builds a hasher with the given memory cost (KiB) and iteration count.
    pub fn new(memory_kib: u32, iterations: u32) -> EngineResult<Self> {
        let params = Params::new(memory_kib, iterations, 1, None)
            .map_err(|e| EngineError::Internal(format!("Invalid password hashing parameters: {e}")))?;

        Ok(PasswordHasher {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hashes a plaintext password into a PHC string.
    pub fn hash(&self, password: &str) -> EngineResult<String> {
        let salt = SaltString::generate(&mut OsRng);

        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| EngineError::Internal(format!("Failed to hash password: {e}")))?;

        Ok(hash.to_string())
    }

    /// True when `password` matches `hash`. Unparseable hashes never match.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        let parsed_hash = match PasswordHash::new(hash) {
            Ok(h) => h,
            Err(_) => return false,
        };

        self.argon2
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(64, 1).unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = hasher();
        let hash = hasher.hash("s3cret").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("s3cret", &hash));
        assert!(!hasher.verify("S3cret", &hash));
    }

    #[test]
    fn test_salts_differ() {
        let hasher = hasher();
        assert_ne!(hasher.hash("same").unwrap(), hasher.hash("same").unwrap());
    }

    #[test]
    fn test_garbage_hash_never_matches() {
        assert!(!hasher().verify("anything", "not-a-phc-string"));
        assert!(!hasher().verify("", ""));
    }

    #[test]
    fn test_old_parameters_still_verify() {
        let old = PasswordHasher::new(128, 2).unwrap().hash("pw").unwrap();
        assert!(hasher().verify("pw", &old));
    }

    #[test]
    fn test_rejects_invalid_parameters() {
        assert!(PasswordHasher::new(1, 1).is_err());
    }
}
