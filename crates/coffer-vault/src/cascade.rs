// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cascade rules keeping the availability caches consistent with the keys.
//!
//! | Transition | Effect |
//! |---|---|
//! | session replaced or cleared | groups closed, every record cache cleared, open storages closed |
//! | groups opened | keys registered, group infos and their configs made available |
//! | groups closed | keys scrubbed, their configs dropped along with storages built on them |
//! | config added | config made available |
//! | storage opened / closed | its boxes, templates and entries loaded / dropped |
//!
//! Callers decrypt everything they need before invoking a rule, so a rule
//! only commits. Events queued by a rule are published by the facade once the
//! whole operation is finished.

use coffer_core::CofferError;
use tracing::{error, info};
use uuid::Uuid;

use crate::events::VaultEvent;
use crate::keyscope::Session;
use crate::model::{
    BoxPayload, DataStorageConfigPayload, EntryPayload, Secured, TemplatePayload,
    VisibilityGroupInfo, VisibilityGroupPayload,
};
use crate::secret::SecretKey;
use crate::state::{InitialisedStorage, Stored, VaultState};

impl VaultState {
    /// Install, replace or clear the session, then make `prefetched` available.
    pub(crate) async fn replace_session(
        &mut self,
        new: Option<Session>,
        prefetched: Vec<Secured<DataStorageConfigPayload>>,
    ) -> Result<(), CofferError> {
        let transition = self.keys.set_session(new)?;
        if transition.replaced {
            // Retired keys were scrubbed by the registry.
            drop(transition);
            self.open_groups.clear(&mut self.events);
            self.clear_record_caches().await;
        }

        let summary = self.keys.session().map(Session::summary);
        self.events.queue(VaultEvent::SessionChanged(summary));

        if !prefetched.is_empty() {
            self.configs.add(prefetched, &mut self.events)?;
        }
        Ok(())
    }

    async fn clear_record_caches(&mut self) {
        self.entries.clear(&mut self.events);
        self.templates.clear(&mut self.events);
        self.boxes.clear(&mut self.events);
        let storages = self.storages.clear(&mut self.events);
        self.close_handles(storages).await;
        self.configs.clear(&mut self.events);
    }

    /// Register freshly derived group keys and the configs they unlock.
    pub(crate) fn groups_opened(
        &mut self,
        opened: Vec<(Secured<VisibilityGroupPayload>, SecretKey)>,
        configs: Vec<Secured<DataStorageConfigPayload>>,
    ) -> Result<usize, CofferError> {
        let mut infos = Vec::new();
        for (group, key) in opened {
            if self.keys.open_group(group.routing.id, key)? {
                infos.push(VisibilityGroupInfo::from(&group));
            }
        }
        let count = self.open_groups.add(infos, &mut self.events)?;
        self.configs.add(configs, &mut self.events)?;
        Ok(count)
    }

    /// Close groups and drop everything they protect. Returns how many closed.
    pub(crate) async fn groups_closed(&mut self, ids: &[Uuid]) -> usize {
        let retired = self.keys.close_groups(ids);
        let closed: Vec<Uuid> = retired.iter().filter_map(|r| r.scope.group_id()).collect();
        drop(retired);
        if closed.is_empty() {
            return 0;
        }

        self.open_groups.remove(&closed, &mut self.events);
        let dropped_configs: Vec<Uuid> = self
            .configs
            .remove_where(
                |config| {
                    config
                        .routing
                        .visibility_group_id
                        .is_some_and(|group| closed.contains(&group))
                },
                &mut self.events,
            )
            .iter()
            .map(|config| config.routing.id)
            .collect();
        self.drop_storages(&dropped_configs).await;
        closed.len()
    }

    pub(crate) fn config_added(
        &mut self,
        config: Secured<DataStorageConfigPayload>,
    ) -> Result<(), CofferError> {
        self.configs.add(vec![config], &mut self.events)?;
        Ok(())
    }

    pub(crate) fn storage_initialised(
        &mut self,
        storage: InitialisedStorage,
    ) -> Result<(), CofferError> {
        self.storages.add(vec![storage], &mut self.events)?;
        Ok(())
    }

    /// Publish a storage's nested records after it was opened.
    pub(crate) fn storage_opened(
        &mut self,
        storage_id: Uuid,
        boxes: Vec<Stored<BoxPayload>>,
        templates: Vec<Stored<TemplatePayload>>,
        entries: Vec<Stored<EntryPayload>>,
    ) -> Result<(), CofferError> {
        self.events.queue(VaultEvent::DataStorageOpenChanged {
            id: storage_id,
            open: true,
        });
        self.boxes.add(boxes, &mut self.events)?;
        self.templates.add(templates, &mut self.events)?;
        self.entries.add(entries, &mut self.events)?;
        Ok(())
    }

    /// Drop a storage's nested records after it was closed.
    pub(crate) fn storage_closed(&mut self, storage_id: Uuid) {
        self.drop_nested(&[storage_id]);
        self.events.queue(VaultEvent::DataStorageOpenChanged {
            id: storage_id,
            open: false,
        });
    }

    /// Terminate the storages built on `config_ids`. Returns how many were terminated.
    pub(crate) async fn drop_storages(&mut self, config_ids: &[Uuid]) -> usize {
        if config_ids.is_empty() {
            return 0;
        }
        self.drop_nested(config_ids);
        let storages = self
            .storages
            .remove_where(|s| config_ids.contains(&s.config_id), &mut self.events);
        let count = storages.len();
        self.close_handles(storages).await;
        count
    }

    fn drop_nested(&mut self, storage_ids: &[Uuid]) {
        self.entries
            .remove_where(|e| storage_ids.contains(&e.storage_id), &mut self.events);
        self.templates
            .remove_where(|t| storage_ids.contains(&t.storage_id), &mut self.events);
        self.boxes
            .remove_where(|b| storage_ids.contains(&b.storage_id), &mut self.events);
    }

    async fn close_handles(&mut self, storages: Vec<InitialisedStorage>) {
        for storage in storages {
            if storage.handle.is_closed() {
                continue;
            }
            if storage.handle.close().await {
                self.events.queue(VaultEvent::DataStorageOpenChanged {
                    id: storage.config_id,
                    open: false,
                });
                info!(data_storage_id = %storage.config_id, "data storage closed");
            } else {
                error!(data_storage_id = %storage.config_id, "failed to close data storage");
            }
        }
    }
}
