// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Coffer vault.

use thiserror::Error;

/// The primary error type used across all Coffer adapter traits and core operations.
///
/// Authentication failures (wrong username, wrong password, wrong group
/// password) are deliberately absent: they are reported as `false` / `0`
/// return values so that no error path can act as an oracle.
#[derive(Debug, Error)]
pub enum CofferError {
    /// Malformed input rejected before any storage mutation or key derivation.
    #[error("validation error: {0}")]
    Validation(String),

    /// Caller or programmer error: no session, account storage unset, the
    /// targeted visibility group is not open, and similar.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// A decrypted payload failed schema validation, or decryption failed
    /// (wrong key and tampered ciphertext are indistinguishable).
    #[error("corrupted record: {0}")]
    Corruption(String),

    /// Key derivation, random generation, or cipher setup failed.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// Storage backend could not serve a request the core depends on.
    #[error("storage error: {0}")]
    Storage(String),

    /// Configuration errors (invalid TOML, out-of-range KDF parameters).
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CofferError {
    /// Shorthand used by the registries when an operation needs a signed-in user.
    pub fn no_session() -> Self {
        CofferError::Precondition("no user is signed in".to_string())
    }

    /// Shorthand used when account storage has not been configured.
    pub fn no_account_storage() -> Self {
        CofferError::Precondition("account storage is not set".to_string())
    }
}
