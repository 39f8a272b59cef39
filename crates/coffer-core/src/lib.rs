// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Coffer secrets vault.
//!
//! Defines the error type, the at-rest ciphertext record layout, record
//! filters, and the adapter traits (credential store, data storage) that the
//! vault core consumes and the storage crates implement.

pub mod error;
pub mod traits;
pub mod types;

pub use error::CofferError;
pub use types::{
    Ciphertext, CiphertextRecord, DataStorageBackend, KeyScope, PasswordHashSalt, RecordFilter,
    RecordKind, ScopeFilter, SecuredSignUp,
};

pub use traits::{
    CredentialStore, DataStorage, DataStorageConnector, RecordStore, StorageLifecycle,
};
