// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Account storage: user credentials plus the records sealed under user keys.

use async_trait::async_trait;
use uuid::Uuid;

use crate::traits::record_store::{RecordStore, StorageLifecycle};
use crate::types::{PasswordHashSalt, SecuredSignUp};

/// Adapter persisting per-user credentials and ciphertext records.
///
/// All methods swallow I/O errors at this boundary: failures are logged by the
/// implementation and surfaced as `false` / `None`.
#[async_trait]
pub trait CredentialStore: RecordStore + StorageLifecycle {
    /// Inserts a new user. Returns `false` on duplicate username/id or I/O failure.
    async fn add_user(&self, user: SecuredSignUp) -> bool;

    /// Looks up a user id by username.
    async fn get_user_id(&self, username: &str) -> Option<Uuid>;

    /// Loads the stored password hash and its salt.
    async fn get_password_hash_salt(&self, user_id: Uuid) -> Option<PasswordHashSalt>;

    /// Loads the salt the primary key is derived with.
    async fn get_primary_key_salt(&self, user_id: Uuid) -> Option<Vec<u8>>;

    /// Number of registered users.
    async fn get_user_count(&self) -> Option<u64>;
}
