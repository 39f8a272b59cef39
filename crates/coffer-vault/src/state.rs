// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mutable vault state guarded by the facade's single lock.

use std::sync::Arc;

use coffer_core::{
    CiphertextRecord, CofferError, CredentialStore, DataStorage, DataStorageConnector, KeyScope,
    RecordFilter, RecordStore,
};
use uuid::Uuid;

use crate::cache::{Cache, Cacheable};
use crate::envelope;
use crate::events::{EventQueue, VaultEvent};
use crate::kdf::KeyDerivation;
use crate::keyscope::KeyScopeRegistry;
use crate::model::{
    BoxInfo, BoxPayload, DataStorageConfigInfo, DataStorageConfigPayload, DataStorageInfo,
    EntryInfo, EntryPayload, Payload, Secured, TemplateInfo, TemplatePayload, VisibilityGroupInfo,
};
use crate::secret::SecretKey;

/// A data storage connected from an available config.
pub struct InitialisedStorage {
    pub config_id: Uuid,
    pub visibility_group_id: Option<Uuid>,
    pub name: String,
    pub handle: Arc<dyn DataStorage>,
}

impl InitialisedStorage {
    pub fn scope(&self) -> KeyScope {
        KeyScope::from(self.visibility_group_id)
    }
}

/// A decrypted record living inside a data storage.
#[derive(Debug, Clone)]
pub struct Stored<P> {
    pub storage_id: Uuid,
    pub record: Secured<P>,
}

impl Cacheable for VisibilityGroupInfo {
    type Info = VisibilityGroupInfo;

    fn cache_id(&self) -> Uuid {
        self.id
    }

    fn info(&self) -> VisibilityGroupInfo {
        self.clone()
    }
}

impl Cacheable for Secured<DataStorageConfigPayload> {
    type Info = DataStorageConfigInfo;

    fn cache_id(&self) -> Uuid {
        self.routing.id
    }

    fn info(&self) -> DataStorageConfigInfo {
        DataStorageConfigInfo::from(self)
    }
}

impl Cacheable for InitialisedStorage {
    type Info = DataStorageInfo;

    fn cache_id(&self) -> Uuid {
        self.config_id
    }

    fn info(&self) -> DataStorageInfo {
        DataStorageInfo {
            id: self.config_id,
            visibility_group_id: self.visibility_group_id,
            name: self.name.clone(),
            open: self.handle.is_open(),
        }
    }
}

impl Cacheable for Stored<BoxPayload> {
    type Info = BoxInfo;

    fn cache_id(&self) -> Uuid {
        self.record.routing.id
    }

    fn info(&self) -> BoxInfo {
        BoxInfo {
            id: self.record.routing.id,
            storage_id: self.storage_id,
            visibility_group_id: self.record.routing.visibility_group_id,
            name: self.record.payload.name.clone(),
            description: self.record.payload.description.clone(),
            has_access_password: self.record.payload.access_password.is_some(),
        }
    }
}

impl Cacheable for Stored<TemplatePayload> {
    type Info = TemplateInfo;

    fn cache_id(&self) -> Uuid {
        self.record.routing.id
    }

    fn info(&self) -> TemplateInfo {
        TemplateInfo {
            id: self.record.routing.id,
            storage_id: self.storage_id,
            visibility_group_id: self.record.routing.visibility_group_id,
            name: self.record.payload.name.clone(),
            fields: self.record.payload.fields.clone(),
        }
    }
}

impl Cacheable for Stored<EntryPayload> {
    type Info = EntryInfo;

    fn cache_id(&self) -> Uuid {
        self.record.routing.id
    }

    fn info(&self) -> EntryInfo {
        EntryInfo {
            id: self.record.routing.id,
            storage_id: self.storage_id,
            box_id: self.record.routing.parent_id.unwrap_or_default(),
            template_id: self.record.payload.template_id,
            visibility_group_id: self.record.routing.visibility_group_id,
            name: self.record.payload.name.clone(),
            values: self.record.payload.values.clone(),
        }
    }
}

pub(crate) struct VaultState {
    pub(crate) kdf: Arc<dyn KeyDerivation>,
    pub(crate) salt_len: usize,
    pub(crate) connector: Arc<dyn DataStorageConnector>,
    pub(crate) account_storage: Option<Arc<dyn CredentialStore>>,
    pub(crate) keys: KeyScopeRegistry,
    pub(crate) open_groups: Cache<VisibilityGroupInfo>,
    pub(crate) configs: Cache<Secured<DataStorageConfigPayload>>,
    pub(crate) storages: Cache<InitialisedStorage>,
    pub(crate) boxes: Cache<Stored<BoxPayload>>,
    pub(crate) templates: Cache<Stored<TemplatePayload>>,
    pub(crate) entries: Cache<Stored<EntryPayload>>,
    pub(crate) events: EventQueue,
}

impl VaultState {
    pub(crate) fn new(
        kdf: Arc<dyn KeyDerivation>,
        salt_len: usize,
        connector: Arc<dyn DataStorageConnector>,
        event_capacity: usize,
    ) -> Self {
        Self {
            kdf,
            salt_len,
            connector,
            account_storage: None,
            keys: KeyScopeRegistry::new(),
            open_groups: Cache::new(
                "open visibility groups",
                VaultEvent::OpenVisibilityGroupsChanged,
            ),
            configs: Cache::new(
                "available data storage configs",
                VaultEvent::AvailableDataStorageConfigsChanged,
            ),
            storages: Cache::new(
                "initialised data storages",
                VaultEvent::InitialisedDataStoragesChanged,
            ),
            boxes: Cache::new("available boxes", VaultEvent::AvailableBoxesChanged),
            templates: Cache::new("available templates", VaultEvent::AvailableTemplatesChanged),
            entries: Cache::new("available entries", VaultEvent::AvailableEntriesChanged),
            events: EventQueue::new(event_capacity),
        }
    }

    pub(crate) fn account(&self) -> Result<Arc<dyn CredentialStore>, CofferError> {
        self.account_storage
            .clone()
            .ok_or_else(CofferError::no_account_storage)
    }

    /// Signed-in user id, or a precondition error.
    pub(crate) fn session_user(&self) -> Result<Uuid, CofferError> {
        Ok(self.keys.require_session()?.user_id())
    }

    /// Reject requests made on behalf of a user other than the signed-in one.
    pub(crate) fn require_user(&self, user_id: Uuid) -> Result<Uuid, CofferError> {
        let current = self.session_user()?;
        if current != user_id {
            return Err(CofferError::Precondition(format!(
                "user {user_id} is not the signed-in user"
            )));
        }
        Ok(current)
    }

    /// Key for `scope`, failing loudly when it is not present.
    pub(crate) fn require_key(&self, scope: KeyScope) -> Result<&SecretKey, CofferError> {
        self.keys.key_for(scope).ok_or_else(|| match scope {
            KeyScope::Primary => CofferError::no_session(),
            KeyScope::Group(id) => {
                CofferError::Precondition(format!("visibility group {id} is not open"))
            }
        })
    }
}

/// List records, treating an unreadable store as an error.
pub(crate) async fn fetch_records<S: RecordStore + ?Sized>(
    store: &S,
    filter: &RecordFilter,
) -> Result<Vec<CiphertextRecord>, CofferError> {
    store.list_records(filter).await.ok_or_else(|| {
        CofferError::Storage(format!("failed to list {} records", filter.kind))
    })
}

/// Decrypt every record with the key governing its scope.
///
/// A record whose key is absent is an error, never silently dropped.
pub(crate) fn open_records<'k, P: Payload>(
    records: &[CiphertextRecord],
    key_for: impl Fn(KeyScope) -> Option<&'k SecretKey>,
) -> Result<Vec<Secured<P>>, CofferError> {
    records
        .iter()
        .map(|record| {
            let key = key_for(record.scope()).ok_or_else(|| {
                CofferError::Precondition(format!(
                    "{} {} is governed by {}, which is not open",
                    record.kind,
                    record.id,
                    record.scope()
                ))
            })?;
            envelope::from_storage_secured(record, key)
        })
        .collect()
}
