// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key hierarchy and encrypted record core of the Coffer vault.
//!
//! A user's login password derives a primary key at sign-in. Visibility groups
//! carry their own passwords and keys; each record is sealed under exactly one
//! of these keys and is available only while that key is held.
//!
//! # Architecture
//!
//! - [`crypto`] - AES-256-GCM seal/open and constant-time comparison
//! - [`kdf`] - Argon2id password hashing and key derivation
//! - [`keyscope`] - session and open-group keys, scrubbed on release
//! - [`envelope`] - plain -> secured -> ciphertext record codec
//! - [`cache`] - availability caches emitting `{removed, added}` diffs
//! - [`Vault`] - facade serializing every operation behind one lock

pub mod cache;
pub mod crypto;
pub mod envelope;
pub mod events;
pub mod kdf;
pub mod keyscope;
pub mod model;
pub mod prompt;
pub mod secret;
pub mod vault;

mod auth;
mod cascade;
mod groups;
mod records;
mod state;
mod storages;

pub use cache::CacheDiff;
pub use events::VaultEvent;
pub use kdf::{Argon2Kdf, KeyDerivation};
pub use model::{
    BoxInfo, ConfigListFilter, DataStorageConfigInfo, DataStorageInfo, EntryInfo, FieldKind,
    NewBox, NewDataStorageConfig, NewEntry, NewTemplate, NewVisibilityGroup, OpenVisibilityGroups,
    SessionSummary, SignIn, SignUp, TemplateField, TemplateInfo, VisibilityGroupInfo,
};
pub use prompt::{get_password, get_password_with_confirm};
pub use secret::SecretKey;
pub use vault::Vault;
