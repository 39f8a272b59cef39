// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key material and password digests.

use ring::rand::{SecureRandom, SystemRandom};
use schemars::JsonSchema;
use secrecy::{ExposeSecret, ExposeSecretMut, SecretBox};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::crypto;

/// Length of every symmetric key (AES-256).
pub const KEY_LEN: usize = 32;

/// A primary or visibility-group key.
///
/// The bytes live in a heap allocation that is zeroized on drop. Before a key
/// is released by the Key-Scope Registry it is additionally [`scrub`]bed, so
/// the last meaningful value never lingers until deallocation.
///
/// [`scrub`]: SecretKey::scrub
pub struct SecretKey(SecretBox<[u8; KEY_LEN]>);

impl SecretKey {
    /// A zero-filled key, to be written in place by a KDF.
    pub(crate) fn zeroed() -> Self {
        Self(SecretBox::new(Box::new([0u8; KEY_LEN])))
    }

    pub fn from_bytes(mut bytes: [u8; KEY_LEN]) -> Self {
        let key = Self(SecretBox::new(Box::new(bytes)));
        bytes.zeroize();
        key
    }

    pub fn generate() -> Result<Self, coffer_core::CofferError> {
        let mut key = Self::zeroed();
        SystemRandom::new()
            .fill(key.0.expose_secret_mut())
            .map_err(|_| coffer_core::CofferError::Crypto("failed to generate random key".to_string()))?;
        Ok(key)
    }

    pub fn expose(&self) -> &[u8; KEY_LEN] {
        self.0.expose_secret()
    }

    pub(crate) fn expose_mut(&mut self) -> &mut [u8; KEY_LEN] {
        self.0.expose_secret_mut()
    }

    /// Overwrite the key bytes with fresh random data (zeroes if the RNG fails).
    pub fn scrub(&mut self) {
        let bytes = self.0.expose_secret_mut();
        if SystemRandom::new().fill(bytes).is_err() {
            bytes.zeroize();
        }
    }

    /// Timing-safe comparison of two keys.
    pub fn ct_eq(&self, other: &SecretKey) -> bool {
        crypto::constant_time_eq(self.expose(), other.expose())
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretKey([REDACTED])")
    }
}

/// Hash of a password together with the salt it was computed with.
///
/// Stored in place of the plaintext password inside sealed payloads.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct PasswordDigest {
    #[serde(with = "hex_bytes")]
    #[schemars(with = "String")]
    pub hash: Vec<u8>,
    #[serde(with = "hex_bytes")]
    #[schemars(with = "String")]
    pub salt: Vec<u8>,
}

impl std::fmt::Debug for PasswordDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordDigest")
            .field("hash", &"[REDACTED]")
            .field("salt_len", &self.salt.len())
            .finish()
    }
}

/// Serde adapter storing byte vectors as lowercase hex strings.
pub(crate) mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        hex::decode(encoded).map_err(serde::de::Error::custom)
    }
}
