// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Password hashing and key derivation.
//!
//! Both operations are Argon2id (v0x13) with parameters from [`VaultConfig`];
//! they differ only in the salt they are fed and in what the output is used for.

use coffer_config::model::VaultConfig;
use coffer_core::CofferError;
use secrecy::{ExposeSecret, SecretString};

use crate::crypto;
use crate::secret::{PasswordDigest, SecretKey, KEY_LEN};

/// Pluggable password hashing / key derivation capability.
pub trait KeyDerivation: Send + Sync {
    /// Hash a password for storage and later timing-safe comparison.
    fn hash_password(&self, password: &[u8], salt: &[u8]) -> Result<Vec<u8>, CofferError>;

    /// Derive a symmetric key from a password.
    fn derive_key(&self, password: &[u8], salt: &[u8]) -> Result<SecretKey, CofferError>;
}

/// Argon2id-backed [`KeyDerivation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Argon2Kdf {
    memory_cost: u32,
    iterations: u32,
    parallelism: u32,
}

impl Argon2Kdf {
    pub fn new(memory_cost: u32, iterations: u32, parallelism: u32) -> Self {
        Self {
            memory_cost,
            iterations,
            parallelism,
        }
    }

    pub fn from_config(config: &VaultConfig) -> Self {
        Self::new(
            config.kdf_memory_cost,
            config.kdf_iterations,
            config.kdf_parallelism,
        )
    }

    fn hash_into(&self, password: &[u8], salt: &[u8], output: &mut [u8]) -> Result<(), CofferError> {
        let params = argon2::Params::new(
            self.memory_cost,
            self.iterations,
            self.parallelism,
            Some(output.len()),
        )
        .map_err(|e| CofferError::Crypto(format!("invalid Argon2id parameters: {e}")))?;

        argon2::Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params)
            .hash_password_into(password, salt, output)
            .map_err(|e| CofferError::Crypto(format!("Argon2id derivation failed: {e}")))
    }
}

impl KeyDerivation for Argon2Kdf {
    fn hash_password(&self, password: &[u8], salt: &[u8]) -> Result<Vec<u8>, CofferError> {
        let mut hash = vec![0u8; KEY_LEN];
        self.hash_into(password, salt, &mut hash)?;
        Ok(hash)
    }

    fn derive_key(&self, password: &[u8], salt: &[u8]) -> Result<SecretKey, CofferError> {
        let mut key = SecretKey::zeroed();
        self.hash_into(password, salt, key.expose_mut())?;
        Ok(key)
    }
}

/// Generate a random salt of `len` bytes.
pub fn generate_salt(len: usize) -> Result<Vec<u8>, CofferError> {
    crypto::random_bytes(len)
}

/// Hash `password` under a fresh salt; the plaintext is never retained.
pub fn digest_password(
    kdf: &dyn KeyDerivation,
    password: &SecretString,
    salt_len: usize,
) -> Result<PasswordDigest, CofferError> {
    let salt = generate_salt(salt_len)?;
    let hash = kdf.hash_password(password.expose_secret().as_bytes(), &salt)?;
    Ok(PasswordDigest { hash, salt })
}

/// Timing-safe check of `attempt` against a stored digest.
pub fn verify_password(
    kdf: &dyn KeyDerivation,
    attempt: &SecretString,
    digest: &PasswordDigest,
) -> Result<bool, CofferError> {
    let computed = kdf.hash_password(attempt.expose_secret().as_bytes(), &digest.salt)?;
    Ok(crypto::constant_time_eq(&computed, &digest.hash))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kdf() -> Argon2Kdf {
        // Low cost for fast tests.
        Argon2Kdf::new(1024, 1, 1)
    }

    #[test]
    fn derive_key_is_deterministic() {
        let salt = [1u8; 16];
        let a = kdf().derive_key(b"passphrase", &salt).unwrap();
        let b = kdf().derive_key(b"passphrase", &salt).unwrap();
        assert!(a.ct_eq(&b));
    }

    #[test]
    fn derive_key_depends_on_password_and_salt() {
        let base = kdf().derive_key(b"one", &[1u8; 16]).unwrap();
        let other_password = kdf().derive_key(b"two", &[1u8; 16]).unwrap();
        let other_salt = kdf().derive_key(b"one", &[2u8; 16]).unwrap();
        assert!(!base.ct_eq(&other_password));
        assert!(!base.ct_eq(&other_salt));
    }

    #[test]
    fn hash_and_key_differ_for_different_salts() {
        let hash = kdf().hash_password(b"pw", &[3u8; 16]).unwrap();
        let key = kdf().derive_key(b"pw", &[4u8; 16]).unwrap();
        assert_eq!(hash.len(), KEY_LEN);
        assert_ne!(hash.as_slice(), key.expose());
    }

    #[test]
    fn digest_and_verify() {
        let password = SecretString::from("gp1".to_string());
        let digest = digest_password(&kdf(), &password, 16).unwrap();
        assert_eq!(digest.salt.len(), 16);

        assert!(verify_password(&kdf(), &password, &digest).unwrap());
        let wrong = SecretString::from("wrong".to_string());
        assert!(!verify_password(&kdf(), &wrong, &digest).unwrap());
    }

    #[test]
    fn digests_use_fresh_salts() {
        let password = SecretString::from("same".to_string());
        let a = digest_password(&kdf(), &password, 16).unwrap();
        let b = digest_password(&kdf(), &password, 16).unwrap();
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn invalid_params_are_reported() {
        let bad = Argon2Kdf::new(1, 1, 1);
        assert!(matches!(bad.hash_password(b"pw", &[0u8; 16]), Err(CofferError::Crypto(_))));
    }
}
