// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the account storage.

use async_trait::async_trait;
use coffer_core::{
    CiphertextRecord, CredentialStore, PasswordHashSalt, RecordFilter, RecordStore,
    SecuredSignUp, StorageLifecycle,
};
use uuid::Uuid;

use crate::handle::{Location, StoreHandle};
use crate::queries::users;

/// Account storage backed by a SQLite file.
///
/// Starts closed; call [`StorageLifecycle::open`] before use.
pub struct SqliteCredentialStore {
    handle: StoreHandle,
}

impl SqliteCredentialStore {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            handle: StoreHandle::new("account", Location::File(path.into())),
        }
    }

    /// An account storage that lives only as long as this value.
    pub fn in_memory() -> Self {
        Self {
            handle: StoreHandle::new("account", Location::Memory),
        }
    }
}

#[async_trait]
impl StorageLifecycle for SqliteCredentialStore {
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
impl RecordStore for SqliteCredentialStore {
    async fn add_record(&self, record: CiphertextRecord) -> bool {
        self.handle.add_record(record).await
    }

    async fn list_records(&self, filter: &RecordFilter) -> Option<Vec<CiphertextRecord>> {
        self.handle.list_records(filter).await
    }
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn add_user(&self, user: SecuredSignUp) -> bool {
        self.handle
            .query("add_user", |db| async move { users::insert_user(&db, user).await })
            .await
            .unwrap_or(false)
    }

    async fn get_user_id(&self, username: &str) -> Option<Uuid> {
        let username = username.to_string();
        self.handle
            .query("get_user_id", |db| async move {
                users::get_user_id(&db, &username).await
            })
            .await
            .flatten()
    }

    async fn get_password_hash_salt(&self, user_id: Uuid) -> Option<PasswordHashSalt> {
        self.handle
            .query("get_password_hash_salt", |db| async move {
                users::get_password_hash_salt(&db, user_id).await
            })
            .await
            .flatten()
    }

    async fn get_primary_key_salt(&self, user_id: Uuid) -> Option<Vec<u8>> {
        self.handle
            .query("get_primary_key_salt", |db| async move {
                users::get_primary_key_salt(&db, user_id).await
            })
            .await
            .flatten()
    }

    async fn get_user_count(&self) -> Option<u64> {
        self.handle
            .query("get_user_count", |db| async move { users::count_users(&db).await })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coffer_core::{Ciphertext, RecordKind};
    use tempfile::tempdir;

    fn sign_up(name: &str) -> SecuredSignUp {
        SecuredSignUp {
            user_id: Uuid::new_v4(),
            username: name.to_string(),
            password_hash: vec![9; 32],
            password_salt: vec![1; 16],
            primary_key_salt: vec![2; 16],
        }
    }

    #[tokio::test]
    async fn closed_store_reports_failures_as_values() {
        let store = SqliteCredentialStore::in_memory();
        assert!(store.is_closed());
        assert!(!store.add_user(sign_up("alice")).await);
        assert!(store.get_user_id("alice").await.is_none());
        assert!(store.get_user_count().await.is_none());
    }

    #[tokio::test]
    async fn users_persist_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("account.db");
        let store = SqliteCredentialStore::new(path.to_str().unwrap());
        assert!(store.open().await);
        let alice = sign_up("alice");
        let id = alice.user_id;
        assert!(store.add_user(alice).await);
        assert!(store.close().await);
        assert!(store.get_user_id("alice").await.is_none());

        assert!(store.open().await);
        assert_eq!(store.get_user_id("alice").await, Some(id));
        assert_eq!(store.get_user_count().await, Some(1));
        assert_eq!(store.get_primary_key_salt(id).await, Some(vec![2; 16]));
    }

    #[tokio::test]
    async fn records_round_trip_through_the_store() {
        let store = SqliteCredentialStore::in_memory();
        store.open().await;
        let user = Uuid::new_v4();
        let record = CiphertextRecord {
            kind: RecordKind::DataStorageConfig,
            id: Uuid::new_v4(),
            user_id: user,
            visibility_group_id: None,
            parent_id: None,
            ciphertext: Ciphertext {
                iv: vec![0; 12],
                auth_tag: vec![0; 16],
                data: vec![42],
            },
        };
        assert!(store.add_record(record.clone()).await);
        assert!(!store.add_record(record.clone()).await);
        let listed = store
            .list_records(&RecordFilter::new(RecordKind::DataStorageConfig, user))
            .await
            .unwrap();
        assert_eq!(listed, vec![record]);
    }

    #[tokio::test]
    async fn unopenable_path_fails_open() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let store = SqliteCredentialStore::new(blocker.join("account.db").to_str().unwrap());
        assert!(!store.open().await);
        assert!(store.is_closed());
    }
}
