// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data storage config registry.

use coffer_core::{CofferError, RecordFilter, RecordKind};
use tracing::{info, warn};

use crate::envelope;
use crate::model::{
    self, ConfigListFilter, DataStorageConfigInfo, DataStorageConfigPayload, NewDataStorageConfig,
    Routing, Securable,
};
use crate::state::{VaultState, fetch_records, open_records};

impl VaultState {
    /// Seal a config under the key of its scope and persist it.
    ///
    /// Naming a visibility group that is not open is a precondition error.
    pub(crate) async fn add_data_storage_config(
        &mut self,
        request: NewDataStorageConfig,
    ) -> Result<bool, CofferError> {
        request.validate()?;
        let user_id = self.require_user(request.user_id)?;
        let store = self.account()?;
        let routing = Routing {
            id: request.id,
            user_id,
            visibility_group_id: request.visibility_group_id,
            parent_id: None,
        };
        self.require_key(routing.scope())?;

        let secured = envelope::to_secured(request, routing, self.kdf.as_ref(), self.salt_len)?;
        let record = envelope::to_storage_secured(&secured, self.require_key(routing.scope())?)?;
        if !store.add_record(record).await {
            warn!(data_storage_config_id = %routing.id, "account storage rejected data storage config");
            return Ok(false);
        }

        info!(
            data_storage_config_id = %routing.id,
            scope = %routing.scope(),
            "data storage config added"
        );
        self.config_added(secured)?;
        Ok(true)
    }

    /// Read configs from account storage and decrypt them.
    ///
    /// Without explicit scopes the listing covers the primary scope and every
    /// open group. Explicitly requesting a closed group fails.
    pub(crate) async fn list_data_storage_configs(
        &self,
        filter: ConfigListFilter,
    ) -> Result<Vec<DataStorageConfigInfo>, CofferError> {
        let user_id = self.session_user()?;
        let store = self.account()?;

        let mut records_filter = RecordFilter::new(RecordKind::DataStorageConfig, user_id)
            .excluding_ids(filter.exclude_ids)
            .excluding_scopes(filter.visibility_groups.exclude_ids);
        if let Some(ids) = filter.ids {
            records_filter = records_filter.with_ids(ids);
        }
        records_filter = match filter.visibility_groups.ids {
            Some(scopes) => records_filter.in_scopes(scopes),
            None => records_filter.in_scopes(self.keys.available_scopes()),
        };

        let records = fetch_records(store.as_ref(), &records_filter).await?;
        let configs =
            open_records::<DataStorageConfigPayload>(&records, |scope| self.keys.key_for(scope))?;
        Ok(configs.iter().map(DataStorageConfigInfo::from).collect())
    }

    pub(crate) fn available_data_storage_configs(&self) -> Vec<DataStorageConfigInfo> {
        self.configs.infos()
    }

    /// Whether no available config already uses `name`.
    pub(crate) fn data_storage_config_name_available(&self, name: &str) -> Result<bool, CofferError> {
        model::validate_name("data storage config name", name)?;
        self.session_user()?;
        Ok(!self.configs.iter().any(|config| config.payload.name == name))
    }
}
