// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite data storages and the connector building them from configs.

use std::sync::Arc;

use async_trait::async_trait;
use coffer_core::{
    CiphertextRecord, CofferError, DataStorage, DataStorageBackend, DataStorageConnector,
    RecordFilter, RecordStore, StorageLifecycle,
};
use tracing::debug;
use uuid::Uuid;

use crate::handle::{Location, StoreHandle};

/// Holds the boxes, templates and entries of one data storage config.
pub struct SqliteDataStorage {
    config_id: Uuid,
    handle: StoreHandle,
}

impl SqliteDataStorage {
    pub fn new(config_id: Uuid, backend: &DataStorageBackend) -> Result<Self, CofferError> {
        let location = match backend {
            DataStorageBackend::Sqlite { path } if path.trim().is_empty() => {
                return Err(CofferError::Validation(
                    "sqlite data storage path must not be empty".to_string(),
                ));
            }
            DataStorageBackend::Sqlite { path } => Location::File(path.clone()),
            DataStorageBackend::Memory => Location::Memory,
        };
        Ok(Self {
            config_id,
            handle: StoreHandle::new("data", location),
        })
    }
}

#[async_trait]
impl StorageLifecycle for SqliteDataStorage {
    async fn open(&self) -> bool {
        self.handle.open().await
    }

    async fn close(&self) -> bool {
        self.handle.close().await
    }

    fn is_open(&self) -> bool {
        self.handle.is_open()
    }
}

#[async_trait]
impl RecordStore for SqliteDataStorage {
    async fn add_record(&self, record: CiphertextRecord) -> bool {
        self.handle.add_record(record).await
    }

    async fn list_records(&self, filter: &RecordFilter) -> Option<Vec<CiphertextRecord>> {
        self.handle.list_records(filter).await
    }
}

impl DataStorage for SqliteDataStorage {
    fn config_id(&self) -> Uuid {
        self.config_id
    }
}

/// Builds a closed [`SqliteDataStorage`] for each config.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteConnector;

#[async_trait]
impl DataStorageConnector for SqliteConnector {
    async fn connect(
        &self,
        config_id: Uuid,
        backend: &DataStorageBackend,
    ) -> Result<Arc<dyn DataStorage>, CofferError> {
        let storage = SqliteDataStorage::new(config_id, backend)?;
        debug!(data_storage_id = %config_id, "data storage connected");
        Ok(Arc::new(storage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coffer_core::{Ciphertext, RecordKind};
    use tempfile::tempdir;

    fn entry(user_id: Uuid, box_id: Uuid) -> CiphertextRecord {
        CiphertextRecord {
            kind: RecordKind::Entry,
            id: Uuid::new_v4(),
            user_id,
            visibility_group_id: None,
            parent_id: Some(box_id),
            ciphertext: Ciphertext {
                iv: vec![1; 12],
                auth_tag: vec![2; 16],
                data: vec![3; 8],
            },
        }
    }

    #[tokio::test]
    async fn connector_rejects_empty_path() {
        let result = SqliteConnector
            .connect(
                Uuid::new_v4(),
                &DataStorageBackend::Sqlite {
                    path: " ".to_string(),
                },
            )
            .await;
        assert!(matches!(result, Err(CofferError::Validation(_))));
    }

    #[tokio::test]
    async fn memory_storage_keeps_records_across_close() {
        let id = Uuid::new_v4();
        let storage = SqliteConnector.connect(id, &DataStorageBackend::Memory).await.unwrap();
        assert_eq!(storage.config_id(), id);
        assert!(storage.is_closed());
        assert!(storage.open().await);

        let user = Uuid::new_v4();
        let box_id = Uuid::new_v4();
        assert!(storage.add_record(entry(user, box_id)).await);
        assert!(storage.close().await);
        assert!(storage.open().await);

        let filter = RecordFilter::new(RecordKind::Entry, user).with_parents([box_id]);
        assert_eq!(storage.list_records(&filter).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn file_storage_persists_between_connections() {
        let dir = tempdir().unwrap();
        let backend = DataStorageBackend::Sqlite {
            path: dir.path().join("data.db").to_string_lossy().into_owned(),
        };
        let id = Uuid::new_v4();
        let user = Uuid::new_v4();
        let box_id = Uuid::new_v4();

        let first = SqliteConnector.connect(id, &backend).await.unwrap();
        first.open().await;
        first.add_record(entry(user, box_id)).await;
        first.close().await;

        let second = SqliteConnector.connect(id, &backend).await.unwrap();
        assert!(second.open().await);
        let filter = RecordFilter::new(RecordKind::Entry, user);
        assert_eq!(second.list_records(&filter).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn closed_storage_refuses_io() {
        let storage = SqliteDataStorage::new(Uuid::new_v4(), &DataStorageBackend::Memory).unwrap();
        assert!(!storage.add_record(entry(Uuid::new_v4(), Uuid::new_v4())).await);
        assert!(
            storage
                .list_records(&RecordFilter::new(RecordKind::Entry, Uuid::new_v4()))
                .await
                .is_none()
        );
    }
}
