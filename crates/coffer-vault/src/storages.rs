// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data storage lifecycle and the box, template and entry registries.
//!
//! Nested records live in the data storage their config points at and are
//! sealed under the key governing that config.

use std::sync::Arc;

use coffer_core::{CofferError, DataStorage, KeyScope, RecordFilter, RecordKind};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::envelope;
use crate::model::{
    BoxInfo, BoxPayload, DataStorageInfo, EntryInfo, EntryPayload, NewBox, NewEntry, NewTemplate,
    Payload, Routing, Securable, Secured, TemplateInfo, TemplatePayload,
};
use crate::state::{InitialisedStorage, Stored, VaultState, fetch_records, open_records};

type NestedRecords = (
    Vec<Stored<BoxPayload>>,
    Vec<Stored<TemplatePayload>>,
    Vec<Stored<EntryPayload>>,
);

impl VaultState {
    /// Connect a storage for an available config. Returns `false` if it already is.
    pub(crate) async fn initialise_data_storage(&mut self, config_id: Uuid) -> Result<bool, CofferError> {
        self.session_user()?;
        let config = self.configs.get(config_id).ok_or_else(|| {
            CofferError::Precondition(format!("data storage config {config_id} is not available"))
        })?;
        if self.storages.contains(config_id) {
            warn!(data_storage_id = %config_id, "data storage is already initialised");
            return Ok(false);
        }

        let visibility_group_id = config.routing.visibility_group_id;
        let name = config.payload.name.clone();
        let backend = config.payload.backend.clone();
        let handle = self.connector.connect(config_id, &backend).await?;

        self.storage_initialised(InitialisedStorage {
            config_id,
            visibility_group_id,
            name,
            handle,
        })?;
        info!(data_storage_id = %config_id, "data storage initialised");
        Ok(true)
    }

    /// Close and forget storages. Returns how many were terminated.
    pub(crate) async fn terminate_data_storages(&mut self, ids: &[Uuid]) -> usize {
        for id in ids {
            if !self.storages.contains(*id) {
                warn!(data_storage_id = %id, "data storage is not initialised, skipping terminate");
            }
        }
        let count = self.drop_storages(ids).await;
        info!(count, "data storages terminated");
        count
    }

    fn storage_handle(&self, id: Uuid) -> Result<(Arc<dyn DataStorage>, KeyScope), CofferError> {
        let storage = self.storages.get(id).ok_or_else(|| {
            CofferError::Precondition(format!("data storage {id} is not initialised"))
        })?;
        Ok((Arc::clone(&storage.handle), storage.scope()))
    }

    /// Handle of an initialised storage that must also be open.
    fn open_storage_handle(&self, id: Uuid) -> Result<(Arc<dyn DataStorage>, KeyScope), CofferError> {
        let (handle, scope) = self.storage_handle(id)?;
        if !handle.is_open() {
            return Err(CofferError::Precondition(format!("data storage {id} is not open")));
        }
        Ok((handle, scope))
    }

    /// Open a storage and make its nested records available.
    pub(crate) async fn open_data_storage(&mut self, id: Uuid) -> Result<bool, CofferError> {
        let user_id = self.session_user()?;
        let (handle, scope) = self.storage_handle(id)?;
        if handle.is_open() {
            warn!(data_storage_id = %id, "data storage is already open");
            return Ok(false);
        }
        if !handle.open().await {
            error!(data_storage_id = %id, "failed to open data storage");
            return Ok(false);
        }

        let loaded = self.load_nested(handle.as_ref(), id, user_id, scope).await;
        let (boxes, templates, entries) = match loaded {
            Ok(nested) => nested,
            Err(e) => {
                handle.close().await;
                return Err(e);
            }
        };

        info!(
            data_storage_id = %id,
            boxes = boxes.len(),
            templates = templates.len(),
            entries = entries.len(),
            "data storage opened"
        );
        self.storage_opened(id, boxes, templates, entries)?;
        Ok(true)
    }

    async fn load_nested(
        &self,
        handle: &dyn DataStorage,
        storage_id: Uuid,
        user_id: Uuid,
        scope: KeyScope,
    ) -> Result<NestedRecords, CofferError> {
        let key_for = |s: KeyScope| (s == scope).then(|| self.keys.key_for(s)).flatten();

        let filter = RecordFilter::new(RecordKind::Box, user_id).with_parents([storage_id]);
        let boxes: Vec<Secured<BoxPayload>> =
            open_records(&fetch_records(handle, &filter).await?, key_for)?;

        let filter = RecordFilter::new(RecordKind::Template, user_id).with_parents([storage_id]);
        let templates: Vec<Secured<TemplatePayload>> =
            open_records(&fetch_records(handle, &filter).await?, key_for)?;

        let box_ids: Vec<Uuid> = boxes.iter().map(|b| b.routing.id).collect();
        let entries: Vec<Secured<EntryPayload>> = if box_ids.is_empty() {
            Vec::new()
        } else {
            let filter = RecordFilter::new(RecordKind::Entry, user_id).with_parents(box_ids);
            open_records(&fetch_records(handle, &filter).await?, key_for)?
        };

        Ok((
            into_stored(storage_id, boxes),
            into_stored(storage_id, templates),
            into_stored(storage_id, entries),
        ))
    }

    /// Close an open storage and drop its nested records.
    pub(crate) async fn close_data_storage(&mut self, id: Uuid) -> Result<bool, CofferError> {
        let (handle, _) = self.storage_handle(id)?;
        if handle.is_closed() {
            warn!(data_storage_id = %id, "data storage is not open, skipping close");
            return Ok(false);
        }
        if !handle.close().await {
            error!(data_storage_id = %id, "failed to close data storage");
            return Ok(false);
        }
        self.storage_closed(id);
        info!(data_storage_id = %id, "data storage closed");
        Ok(true)
    }

    pub(crate) fn list_initialised_data_storages(&self) -> Vec<DataStorageInfo> {
        self.storages.infos()
    }

    /// Seal a nested record under its storage's key and write it to the storage.
    async fn add_nested<T: Securable>(
        &mut self,
        request: T,
        storage_id: Uuid,
        parent_id: Uuid,
    ) -> Result<Option<Stored<T::Payload>>, CofferError> {
        let user_id = self.session_user()?;
        let (handle, scope) = self.open_storage_handle(storage_id)?;
        self.require_key(scope)?;

        let routing = Routing {
            id: request.id(),
            user_id,
            visibility_group_id: scope.group_id(),
            parent_id: Some(parent_id),
        };
        let secured = envelope::to_secured(request, routing, self.kdf.as_ref(), self.salt_len)?;

        let record = envelope::to_storage_secured(&secured, self.require_key(scope)?)?;
        if !handle.add_record(record).await {
            warn!(
                kind = %<T::Payload as Payload>::KIND,
                data_storage_id = %storage_id,
                "data storage rejected record"
            );
            return Ok(None);
        }
        Ok(Some(Stored {
            storage_id,
            record: secured,
        }))
    }

    pub(crate) async fn add_box(&mut self, request: NewBox) -> Result<bool, CofferError> {
        request.validate()?;
        let (id, storage_id) = (request.id, request.storage_id);
        let Some(stored) = self.add_nested(request, storage_id, storage_id).await? else {
            return Ok(false);
        };
        self.boxes.add(vec![stored], &mut self.events)?;
        info!(box_id = %id, data_storage_id = %storage_id, "box added");
        Ok(true)
    }

    pub(crate) async fn add_template(&mut self, request: NewTemplate) -> Result<bool, CofferError> {
        request.validate()?;
        let (id, storage_id) = (request.id, request.storage_id);
        let Some(stored) = self.add_nested(request, storage_id, storage_id).await? else {
            return Ok(false);
        };
        self.templates.add(vec![stored], &mut self.events)?;
        info!(template_id = %id, data_storage_id = %storage_id, "template added");
        Ok(true)
    }

    /// Add an entry to an available box, checking it against an available
    /// template of the same storage.
    pub(crate) async fn add_entry(&mut self, request: NewEntry) -> Result<bool, CofferError> {
        request.validate()?;
        let storage_id = self
            .boxes
            .get(request.box_id)
            .map(|b| b.storage_id)
            .ok_or_else(|| {
                CofferError::Precondition(format!("box {} is not available", request.box_id))
            })?;
        let template = self
            .templates
            .get(request.template_id)
            .filter(|t| t.storage_id == storage_id)
            .ok_or_else(|| {
                CofferError::Precondition(format!(
                    "template {} is not available in data storage {storage_id}",
                    request.template_id
                ))
            })?;
        request.check_against(&template.record.payload)?;

        let (id, box_id) = (request.id, request.box_id);
        let Some(stored) = self.add_nested(request, storage_id, box_id).await? else {
            return Ok(false);
        };
        self.entries.add(vec![stored], &mut self.events)?;
        info!(entry_id = %id, box_id = %box_id, "entry added");
        Ok(true)
    }

    pub(crate) fn list_available_boxes(&self) -> Vec<BoxInfo> {
        self.boxes.infos()
    }

    pub(crate) fn list_available_templates(&self) -> Vec<TemplateInfo> {
        self.templates.infos()
    }

    pub(crate) fn list_available_entries(&self) -> Vec<EntryInfo> {
        self.entries.infos()
    }
}

fn into_stored<P>(storage_id: Uuid, records: Vec<Secured<P>>) -> Vec<Stored<P>> {
    records
        .into_iter()
        .map(|record| Stored { storage_id, record })
        .collect()
}
