// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter traits for the collaborators the vault core consumes.

pub mod credential_store;
pub mod data_storage;
pub mod record_store;

pub use credential_store::CredentialStore;
pub use data_storage::{DataStorage, DataStorageConnector};
pub use record_store::{RecordStore, StorageLifecycle};
