// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end vault testing.
//!
//! `TestHarness` wires a [`Vault`] to in-memory adapters and a fast KDF, and
//! offers shortcuts for the setup steps most scenarios repeat.

use std::sync::Arc;

use coffer_core::{CofferError, CredentialStore, DataStorageBackend};
use coffer_vault::{
    NewDataStorageConfig, NewVisibilityGroup, OpenVisibilityGroups, SignIn, SignUp, Vault,
};
use secrecy::SecretString;
use uuid::Uuid;

use crate::fast_kdf;
use crate::memory_store::{MemoryConnector, MemoryCredentialStore};

/// Salt length used by harness vaults.
pub const TEST_SALT_LEN: usize = 16;

/// Wrap a test password.
pub fn secret(value: &str) -> SecretString {
    SecretString::from(value.to_string())
}

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    salt_len: usize,
    attach_account_storage: bool,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            salt_len: TEST_SALT_LEN,
            attach_account_storage: true,
        }
    }

    pub fn with_salt_len(mut self, salt_len: usize) -> Self {
        self.salt_len = salt_len;
        self
    }

    /// Leave the vault without account storage.
    pub fn without_account_storage(mut self) -> Self {
        self.attach_account_storage = false;
        self
    }

    pub async fn build(self) -> Result<TestHarness, CofferError> {
        let connector = Arc::new(MemoryConnector::new());
        let vault = Vault::new(Arc::new(fast_kdf()), self.salt_len, connector.clone());
        let credentials = MemoryCredentialStore::opened().await;
        if self.attach_account_storage {
            let store: Arc<dyn CredentialStore> = credentials.clone();
            vault.set_account_storage(Some(store)).await?;
        }
        Ok(TestHarness {
            vault,
            credentials,
            connector,
        })
    }
}

/// A vault plus handles on the adapters behind it.
pub struct TestHarness {
    pub vault: Vault,
    pub credentials: Arc<MemoryCredentialStore>,
    pub connector: Arc<MemoryConnector>,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Harness with default settings and account storage attached.
    pub async fn new() -> Result<Self, CofferError> {
        Self::builder().build().await
    }

    /// Register `username` and sign in. Returns the new user id.
    pub async fn sign_up_and_in(&self, username: &str, password: &str) -> Result<Uuid, CofferError> {
        let created = self
            .vault
            .sign_up(SignUp {
                username: username.to_string(),
                password: secret(password),
            })
            .await?;
        if !created {
            return Err(CofferError::Precondition(format!("could not sign up `{username}`")));
        }
        self.sign_in(username, password).await?;
        self.vault
            .signed_in_user()
            .await
            .map(|session| session.user_id)
            .ok_or_else(CofferError::no_session)
    }

    pub async fn sign_in(&self, username: &str, password: &str) -> Result<bool, CofferError> {
        self.vault
            .sign_in(SignIn {
                username: username.to_string(),
                password: secret(password),
            })
            .await
    }

    /// Create a visibility group. Returns its id.
    pub async fn create_group(
        &self,
        user_id: Uuid,
        name: &str,
        password: &str,
    ) -> Result<Uuid, CofferError> {
        let request = NewVisibilityGroup::new(user_id, name, "", secret(password));
        let id = request.id;
        if !self.vault.create_visibility_group(request).await? {
            return Err(CofferError::Storage(format!("visibility group `{name}` was rejected")));
        }
        Ok(id)
    }

    pub async fn open_groups(&self, user_id: Uuid, password: &str) -> Result<usize, CofferError> {
        self.vault
            .open_visibility_groups(OpenVisibilityGroups {
                user_id,
                password: secret(password),
            })
            .await
    }

    /// Add an in-memory data storage config. Returns its id.
    pub async fn add_memory_config(
        &self,
        user_id: Uuid,
        visibility_group_id: Option<Uuid>,
        name: &str,
    ) -> Result<Uuid, CofferError> {
        let request =
            NewDataStorageConfig::new(user_id, visibility_group_id, name, DataStorageBackend::Memory);
        let id = request.id;
        if !self.vault.add_data_storage_config(request).await? {
            return Err(CofferError::Storage(format!("data storage config `{name}` was rejected")));
        }
        Ok(id)
    }

    /// Initialise and open the storage for `config_id`.
    pub async fn open_storage(&self, config_id: Uuid) -> Result<(), CofferError> {
        self.vault.initialise_data_storage(config_id).await?;
        if !self.vault.open_data_storage(config_id).await? {
            return Err(CofferError::Storage(format!("data storage {config_id} did not open")));
        }
        Ok(())
    }
}
