// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Low-level AES-256-GCM seal/open operations and timing-safe comparison.
//!
//! Every call to [`seal`] generates a fresh random 96-bit nonce via the system
//! CSPRNG. Nonce reuse would be catastrophic for GCM security.

use coffer_core::{Ciphertext, CofferError};
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};

/// Length of the GCM authentication tag.
pub const TAG_LEN: usize = 16;

fn cipher(key: &[u8; 32]) -> Result<LessSafeKey, CofferError> {
    let unbound = UnboundKey::new(&AES_256_GCM, key)
        .map_err(|_| CofferError::Crypto("failed to create AES-256-GCM key".to_string()))?;
    Ok(LessSafeKey::new(unbound))
}

/// Encrypt `plaintext` under `key`, authenticating `aad` alongside it.
pub fn seal(key: &[u8; 32], aad: &[u8], plaintext: &[u8]) -> Result<Ciphertext, CofferError> {
    let cipher = cipher(key)?;

    let mut iv = [0u8; NONCE_LEN];
    SystemRandom::new()
        .fill(&mut iv)
        .map_err(|_| CofferError::Crypto("failed to generate random nonce".to_string()))?;

    let mut data = plaintext.to_vec();
    let tag = cipher
        .seal_in_place_separate_tag(Nonce::assume_unique_for_key(iv), Aad::from(aad), &mut data)
        .map_err(|_| CofferError::Crypto("AES-256-GCM encryption failed".to_string()))?;

    Ok(Ciphertext {
        iv: iv.to_vec(),
        auth_tag: tag.as_ref().to_vec(),
        data,
    })
}

/// Decrypt and authenticate a [`Ciphertext`].
///
/// Wrong key, wrong `aad`, tampered data and malformed iv/tag all produce the
/// same error.
pub fn open(key: &[u8; 32], aad: &[u8], ciphertext: &Ciphertext) -> Result<Vec<u8>, CofferError> {
    let failed =
        || CofferError::Corruption("AES-256-GCM decryption failed -- wrong key or corrupted data".to_string());

    let iv: [u8; NONCE_LEN] = ciphertext.iv.as_slice().try_into().map_err(|_| failed())?;
    if ciphertext.auth_tag.len() != TAG_LEN {
        return Err(failed());
    }

    let cipher = cipher(key)?;
    let mut in_out = Vec::with_capacity(ciphertext.data.len() + TAG_LEN);
    in_out.extend_from_slice(&ciphertext.data);
    in_out.extend_from_slice(&ciphertext.auth_tag);

    let plaintext = cipher
        .open_in_place(Nonce::assume_unique_for_key(iv), Aad::from(aad), &mut in_out)
        .map_err(|_| failed())?;
    Ok(plaintext.to_vec())
}

/// Fill a fresh buffer of `len` bytes from the system CSPRNG.
pub fn random_bytes(len: usize) -> Result<Vec<u8>, CofferError> {
    let mut bytes = vec![0u8; len];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| CofferError::Crypto("failed to generate random bytes".to_string()))?;
    Ok(bytes)
}

/// Constant-time byte comparison.
///
/// Only the length check short-circuits; lengths of stored hashes are public.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    std::hint::black_box(diff) == 0
}
