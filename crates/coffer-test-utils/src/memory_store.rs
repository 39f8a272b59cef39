// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory storage adapters.
//!
//! Both stores refuse every read and write while closed, like the SQLite
//! adapters, and can be told to fail reads or writes on demand.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use coffer_core::{
    CiphertextRecord, CofferError, CredentialStore, DataStorage, DataStorageBackend,
    DataStorageConnector, PasswordHashSalt, RecordFilter, RecordKind, RecordStore,
    SecuredSignUp, StorageLifecycle,
};
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

/// Shared record table with lifecycle and failure switches.
#[derive(Default)]
struct RecordTable {
    records: Mutex<Vec<CiphertextRecord>>,
    open: AtomicBool,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl RecordTable {
    fn readable(&self) -> bool {
        self.open.load(Ordering::SeqCst) && !self.fail_reads.load(Ordering::SeqCst)
    }

    fn writable(&self) -> bool {
        self.open.load(Ordering::SeqCst) && !self.fail_writes.load(Ordering::SeqCst)
    }

    async fn add(&self, record: CiphertextRecord) -> bool {
        if !self.writable() {
            warn!(id = %record.id, "memory store refused write");
            return false;
        }
        let mut records = self.records.lock().await;
        if records.iter().any(|r| r.kind == record.kind && r.id == record.id) {
            return false;
        }
        records.push(record);
        true
    }

    async fn list(&self, filter: &RecordFilter) -> Option<Vec<CiphertextRecord>> {
        if !self.readable() {
            warn!(kind = %filter.kind, "memory store refused read");
            return None;
        }
        let records = self.records.lock().await;
        Some(records.iter().filter(|r| filter.matches(r)).cloned().collect())
    }

    /// Flip one bit of a stored record's ciphertext.
    async fn tamper(&self, kind: RecordKind, id: Uuid) -> bool {
        let mut records = self.records.lock().await;
        match records.iter_mut().find(|r| r.kind == kind && r.id == id) {
            Some(record) if !record.ciphertext.data.is_empty() => {
                record.ciphertext.data[0] ^= 0x01;
                true
            }
            _ => false,
        }
    }
}

/// In-memory [`CredentialStore`].
#[derive(Default)]
pub struct MemoryCredentialStore {
    users: Mutex<Vec<SecuredSignUp>>,
    table: RecordTable,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that is already open.
    pub async fn opened() -> Arc<Self> {
        let store = Arc::new(Self::new());
        store.open().await;
        store
    }

    /// Make every subsequent read return `None`.
    pub fn fail_reads(&self, fail: bool) {
        self.table.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent write return `false`.
    pub fn fail_writes(&self, fail: bool) {
        self.table.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of stored records of `kind`, regardless of owner.
    pub async fn record_count(&self, kind: RecordKind) -> usize {
        self.table
            .records
            .lock()
            .await
            .iter()
            .filter(|r| r.kind == kind)
            .count()
    }

    /// Snapshot of every stored record.
    pub async fn records(&self) -> Vec<CiphertextRecord> {
        self.table.records.lock().await.clone()
    }

    pub async fn tamper(&self, kind: RecordKind, id: Uuid) -> bool {
        self.table.tamper(kind, id).await
    }

    /// Remove a user's credential row but keep the user id resolvable.
    pub async fn corrupt_password_row(&self, username: &str) {
        let mut users = self.users.lock().await;
        if let Some(user) = users.iter_mut().find(|u| u.username == username) {
            user.password_hash.clear();
            user.password_salt.clear();
        }
    }
}

#[async_trait]
impl StorageLifecycle for MemoryCredentialStore {
    async fn open(&self) -> bool {
        self.table.open.store(true, Ordering::SeqCst);
        true
    }

    async fn close(&self) -> bool {
        self.table.open.store(false, Ordering::SeqCst);
        true
    }

    fn is_open(&self) -> bool {
        self.table.open.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for MemoryCredentialStore {
    async fn add_record(&self, record: CiphertextRecord) -> bool {
        self.table.add(record).await
    }

    async fn list_records(&self, filter: &RecordFilter) -> Option<Vec<CiphertextRecord>> {
        self.table.list(filter).await
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn add_user(&self, user: SecuredSignUp) -> bool {
        if !self.table.writable() {
            return false;
        }
        let mut users = self.users.lock().await;
        if users
            .iter()
            .any(|u| u.username == user.username || u.user_id == user.user_id)
        {
            return false;
        }
        users.push(user);
        true
    }

    async fn get_user_id(&self, username: &str) -> Option<Uuid> {
        if !self.table.readable() {
            return None;
        }
        let users = self.users.lock().await;
        users.iter().find(|u| u.username == username).map(|u| u.user_id)
    }

    async fn get_password_hash_salt(&self, user_id: Uuid) -> Option<PasswordHashSalt> {
        if !self.table.readable() {
            return None;
        }
        let users = self.users.lock().await;
        users
            .iter()
            .find(|u| u.user_id == user_id && !u.password_hash.is_empty())
            .map(|u| PasswordHashSalt {
                hash: u.password_hash.clone(),
                salt: u.password_salt.clone(),
            })
    }

    async fn get_primary_key_salt(&self, user_id: Uuid) -> Option<Vec<u8>> {
        if !self.table.readable() {
            return None;
        }
        let users = self.users.lock().await;
        users
            .iter()
            .find(|u| u.user_id == user_id)
            .map(|u| u.primary_key_salt.clone())
    }

    async fn get_user_count(&self) -> Option<u64> {
        if !self.table.readable() {
            return None;
        }
        Some(self.users.lock().await.len() as u64)
    }
}

/// In-memory [`DataStorage`]. Starts closed.
pub struct MemoryDataStorage {
    config_id: Uuid,
    table: RecordTable,
}

impl MemoryDataStorage {
    pub fn new(config_id: Uuid) -> Self {
        Self {
            config_id,
            table: RecordTable::default(),
        }
    }

    pub fn fail_reads(&self, fail: bool) {
        self.table.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.table.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn records(&self) -> Vec<CiphertextRecord> {
        self.table.records.lock().await.clone()
    }

    pub async fn tamper(&self, kind: RecordKind, id: Uuid) -> bool {
        self.table.tamper(kind, id).await
    }
}

#[async_trait]
impl StorageLifecycle for MemoryDataStorage {
    async fn open(&self) -> bool {
        self.table.open.store(true, Ordering::SeqCst);
        true
    }

    async fn close(&self) -> bool {
        self.table.open.store(false, Ordering::SeqCst);
        true
    }

    fn is_open(&self) -> bool {
        self.table.open.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for MemoryDataStorage {
    async fn add_record(&self, record: CiphertextRecord) -> bool {
        self.table.add(record).await
    }

    async fn list_records(&self, filter: &RecordFilter) -> Option<Vec<CiphertextRecord>> {
        self.table.list(filter).await
    }
}

impl DataStorage for MemoryDataStorage {
    fn config_id(&self) -> Uuid {
        self.config_id
    }
}

/// Hands out one [`MemoryDataStorage`] per config id, reused across connects.
#[derive(Default)]
pub struct MemoryConnector {
    storages: Mutex<HashMap<Uuid, Arc<MemoryDataStorage>>>,
    connects: AtomicUsize,
    fail_connect: AtomicBool,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// The storage connected for `config_id`, if any.
    pub async fn storage(&self, config_id: Uuid) -> Option<Arc<MemoryDataStorage>> {
        self.storages.lock().await.get(&config_id).cloned()
    }

    /// How many times `connect` succeeded.
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl DataStorageConnector for MemoryConnector {
    async fn connect(
        &self,
        config_id: Uuid,
        _backend: &DataStorageBackend,
    ) -> Result<Arc<dyn DataStorage>, CofferError> {
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(CofferError::Storage(format!(
                "memory connector refused data storage {config_id}"
            )));
        }
        let mut storages = self.storages.lock().await;
        let storage = storages
            .entry(config_id)
            .or_insert_with(|| Arc::new(MemoryDataStorage::new(config_id)))
            .clone();
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(storage)
    }
}
