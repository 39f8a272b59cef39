// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data storages: the backends holding boxes, templates and entries.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::CofferError;
use crate::traits::record_store::{RecordStore, StorageLifecycle};
use crate::types::DataStorageBackend;

/// A physical storage a data storage config points at.
pub trait DataStorage: RecordStore + StorageLifecycle {
    /// Id of the data storage config this storage was initialised from.
    fn config_id(&self) -> Uuid;
}

/// Factory turning a decrypted data storage config into a live storage handle.
#[async_trait]
pub trait DataStorageConnector: Send + Sync {
    /// Creates a (closed) storage handle for the given backend.
    async fn connect(
        &self,
        config_id: Uuid,
        backend: &DataStorageBackend,
    ) -> Result<Arc<dyn DataStorage>, CofferError>;
}
