// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `Vault` facade.
//!
//! Every operation takes the single state lock, runs to completion, and only
//! then publishes the events it queued. No caller can observe a half-applied
//! transition.

use std::sync::Arc;

use coffer_config::model::VaultConfig;
use coffer_core::{CofferError, CredentialStore, DataStorageConnector};
use tokio::sync::{Mutex, broadcast};
use uuid::Uuid;

use crate::events::{DEFAULT_EVENT_CAPACITY, VaultEvent};
use crate::kdf::{Argon2Kdf, KeyDerivation};
use crate::model::{
    BoxInfo, ConfigListFilter, DataStorageConfigInfo, DataStorageInfo, EntryInfo, NewBox,
    NewDataStorageConfig, NewEntry, NewTemplate, NewVisibilityGroup, OpenVisibilityGroups,
    SessionSummary, SignIn, SignUp, TemplateInfo, VisibilityGroupInfo,
};
use crate::state::VaultState;

/// Entry point for every vault operation.
pub struct Vault {
    state: Mutex<VaultState>,
}

impl Vault {
    pub fn new(
        kdf: Arc<dyn KeyDerivation>,
        salt_len: usize,
        connector: Arc<dyn DataStorageConnector>,
    ) -> Self {
        Self {
            state: Mutex::new(VaultState::new(kdf, salt_len, connector, DEFAULT_EVENT_CAPACITY)),
        }
    }

    /// Build a vault with Argon2id parameters and salt length from config.
    pub fn from_config(config: &VaultConfig, connector: Arc<dyn DataStorageConnector>) -> Self {
        Self::new(
            Arc::new(Argon2Kdf::from_config(config)),
            config.salt_len,
            connector,
        )
    }

    /// Receive every event published after this call.
    pub async fn subscribe(&self) -> broadcast::Receiver<VaultEvent> {
        self.state.lock().await.events.subscribe()
    }

    // --- Account ---

    pub async fn set_account_storage(
        &self,
        store: Option<Arc<dyn CredentialStore>>,
    ) -> Result<(), CofferError> {
        let mut state = self.state.lock().await;
        let result = state.set_account_storage(store).await;
        state.events.flush();
        result
    }

    pub async fn has_account_storage(&self) -> bool {
        self.state.lock().await.account_storage.is_some()
    }

    pub async fn sign_up(&self, request: SignUp) -> Result<bool, CofferError> {
        let mut state = self.state.lock().await;
        let result = state.sign_up(request).await;
        state.events.flush();
        result
    }

    /// Returns `Ok(false)` for an unknown username or a wrong password.
    pub async fn sign_in(&self, request: SignIn) -> Result<bool, CofferError> {
        let mut state = self.state.lock().await;
        let result = state.sign_in(request).await;
        state.events.flush();
        result
    }

    pub async fn sign_out(&self) -> Result<Option<SessionSummary>, CofferError> {
        let mut state = self.state.lock().await;
        let result = state.sign_out().await;
        state.events.flush();
        result
    }

    pub async fn signed_in_user(&self) -> Option<SessionSummary> {
        self.state.lock().await.signed_in_user()
    }

    pub async fn user_count(&self) -> Result<u64, CofferError> {
        self.state.lock().await.user_count().await
    }

    pub async fn username_available(&self, username: &str) -> Result<bool, CofferError> {
        self.state.lock().await.username_available(username).await
    }

    // --- Visibility groups ---

    pub async fn create_visibility_group(
        &self,
        request: NewVisibilityGroup,
    ) -> Result<bool, CofferError> {
        let mut state = self.state.lock().await;
        let result = state.create_visibility_group(request).await;
        state.events.flush();
        result
    }

    pub async fn visibility_group_name_available(&self, name: &str) -> Result<bool, CofferError> {
        self.state.lock().await.visibility_group_name_available(name).await
    }

    /// Returns how many closed groups the password opened.
    pub async fn open_visibility_groups(
        &self,
        request: OpenVisibilityGroups,
    ) -> Result<usize, CofferError> {
        let mut state = self.state.lock().await;
        let result = state.open_visibility_groups(request).await;
        state.events.flush();
        result
    }

    /// Returns how many of `ids` were open.
    pub async fn close_visibility_groups(&self, ids: &[Uuid]) -> usize {
        let mut state = self.state.lock().await;
        let count = state.close_visibility_groups(ids).await;
        state.events.flush();
        count
    }

    pub async fn list_open_visibility_groups(&self) -> Vec<VisibilityGroupInfo> {
        self.state.lock().await.list_open_visibility_groups()
    }

    // --- Data storage configs ---

    pub async fn add_data_storage_config(
        &self,
        request: NewDataStorageConfig,
    ) -> Result<bool, CofferError> {
        let mut state = self.state.lock().await;
        let result = state.add_data_storage_config(request).await;
        state.events.flush();
        result
    }

    pub async fn list_data_storage_configs(
        &self,
        filter: ConfigListFilter,
    ) -> Result<Vec<DataStorageConfigInfo>, CofferError> {
        self.state.lock().await.list_data_storage_configs(filter).await
    }

    pub async fn list_available_data_storage_configs(&self) -> Vec<DataStorageConfigInfo> {
        self.state.lock().await.available_data_storage_configs()
    }

    pub async fn data_storage_config_name_available(&self, name: &str) -> Result<bool, CofferError> {
        self.state.lock().await.data_storage_config_name_available(name)
    }

    // --- Data storages ---

    pub async fn initialise_data_storage(&self, config_id: Uuid) -> Result<bool, CofferError> {
        let mut state = self.state.lock().await;
        let result = state.initialise_data_storage(config_id).await;
        state.events.flush();
        result
    }

    pub async fn terminate_data_storages(&self, ids: &[Uuid]) -> usize {
        let mut state = self.state.lock().await;
        let count = state.terminate_data_storages(ids).await;
        state.events.flush();
        count
    }

    pub async fn open_data_storage(&self, id: Uuid) -> Result<bool, CofferError> {
        let mut state = self.state.lock().await;
        let result = state.open_data_storage(id).await;
        state.events.flush();
        result
    }

    pub async fn close_data_storage(&self, id: Uuid) -> Result<bool, CofferError> {
        let mut state = self.state.lock().await;
        let result = state.close_data_storage(id).await;
        state.events.flush();
        result
    }

    pub async fn list_initialised_data_storages(&self) -> Vec<DataStorageInfo> {
        self.state.lock().await.list_initialised_data_storages()
    }

    // --- Boxes, templates, entries ---

    pub async fn add_box(&self, request: NewBox) -> Result<bool, CofferError> {
        let mut state = self.state.lock().await;
        let result = state.add_box(request).await;
        state.events.flush();
        result
    }

    pub async fn add_template(&self, request: NewTemplate) -> Result<bool, CofferError> {
        let mut state = self.state.lock().await;
        let result = state.add_template(request).await;
        state.events.flush();
        result
    }

    pub async fn add_entry(&self, request: NewEntry) -> Result<bool, CofferError> {
        let mut state = self.state.lock().await;
        let result = state.add_entry(request).await;
        state.events.flush();
        result
    }

    pub async fn list_available_boxes(&self) -> Vec<BoxInfo> {
        self.state.lock().await.list_available_boxes()
    }

    pub async fn list_available_templates(&self) -> Vec<TemplateInfo> {
        self.state.lock().await.list_available_templates()
    }

    pub async fn list_available_entries(&self) -> Vec<EntryInfo> {
        self.state.lock().await.list_available_entries()
    }
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault").finish_non_exhaustive()
    }
}
