// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Visibility group manager.

use coffer_core::{CofferError, KeyScope, RecordFilter, RecordKind};
use secrecy::ExposeSecret;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::envelope;
use crate::kdf;
use crate::model::{
    self, DataStorageConfigPayload, NewVisibilityGroup, OpenVisibilityGroups, Routing, Securable,
    Secured, VisibilityGroupInfo, VisibilityGroupPayload,
};
use crate::state::{VaultState, fetch_records, open_records};

impl VaultState {
    /// Every visibility group of the signed-in user except `exclude`, decrypted.
    async fn load_groups(
        &self,
        exclude: &[Uuid],
    ) -> Result<Vec<Secured<VisibilityGroupPayload>>, CofferError> {
        let user_id = self.session_user()?;
        let store = self.account()?;
        let filter = RecordFilter::new(RecordKind::VisibilityGroup, user_id)
            .in_scopes([KeyScope::Primary])
            .excluding_ids(exclude.iter().copied());
        let records = fetch_records(store.as_ref(), &filter).await?;
        open_records(&records, |scope| self.keys.key_for(scope))
    }

    pub(crate) async fn create_visibility_group(
        &mut self,
        request: NewVisibilityGroup,
    ) -> Result<bool, CofferError> {
        request.validate()?;
        let user_id = self.require_user(request.user_id)?;
        let store = self.account()?;

        if !self.visibility_group_name_available(&request.name).await? {
            return Err(CofferError::Validation(format!(
                "a visibility group named `{}` already exists",
                request.name
            )));
        }

        let routing = Routing {
            id: request.id,
            user_id,
            visibility_group_id: None,
            parent_id: None,
        };
        let secured = envelope::to_secured(request, routing, self.kdf.as_ref(), self.salt_len)?;
        let record = envelope::to_storage_secured(&secured, self.require_key(KeyScope::Primary)?)?;

        if !store.add_record(record).await {
            warn!(visibility_group_id = %routing.id, "account storage rejected visibility group");
            return Ok(false);
        }
        info!(visibility_group_id = %routing.id, "visibility group created");
        Ok(true)
    }

    pub(crate) async fn visibility_group_name_available(
        &self,
        name: &str,
    ) -> Result<bool, CofferError> {
        model::validate_name("visibility group name", name)?;
        let groups = self.load_groups(&[]).await?;
        Ok(!groups.iter().any(|group| group.payload.name == name))
    }

    /// Try the password against every closed group. Returns how many opened.
    pub(crate) async fn open_visibility_groups(
        &mut self,
        request: OpenVisibilityGroups,
    ) -> Result<usize, CofferError> {
        if request.password.expose_secret().is_empty() {
            return Err(CofferError::Validation(
                "visibility group password must not be empty".to_string(),
            ));
        }
        let user_id = self.require_user(request.user_id)?;
        let store = self.account()?;

        let closed = self.load_groups(&self.keys.open_group_ids()).await?;
        let mut matched = Vec::new();
        for group in closed {
            // Every closed group costs one hash, matching or not.
            if kdf::verify_password(self.kdf.as_ref(), &request.password, &group.payload.password)? {
                let key = self.kdf.derive_key(
                    request.password.expose_secret().as_bytes(),
                    &group.payload.key_salt,
                )?;
                matched.push((group, key));
            }
        }
        if matched.is_empty() {
            debug!("no closed visibility group matched");
            return Ok(0);
        }

        let scopes: Vec<KeyScope> = matched
            .iter()
            .map(|(group, _)| KeyScope::Group(group.routing.id))
            .collect();
        let filter = RecordFilter::new(RecordKind::DataStorageConfig, user_id).in_scopes(scopes);
        let records = fetch_records(store.as_ref(), &filter).await?;
        let configs = open_records::<DataStorageConfigPayload>(&records, |scope| {
            matched
                .iter()
                .find(|(group, _)| Some(group.routing.id) == scope.group_id())
                .map(|(_, key)| key)
        })?;

        let count = self.groups_opened(matched, configs)?;
        info!(count, "visibility groups opened");
        Ok(count)
    }

    pub(crate) async fn close_visibility_groups(&mut self, ids: &[Uuid]) -> usize {
        let count = self.groups_closed(ids).await;
        info!(count, requested = ids.len(), "visibility groups closed");
        count
    }

    pub(crate) fn list_open_visibility_groups(&self) -> Vec<VisibilityGroupInfo> {
        self.open_groups.infos()
    }
}
