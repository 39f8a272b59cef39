// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared types that cross the adapter trait boundaries.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Every kind of record the vault seals with the envelope codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RecordKind {
    VisibilityGroup,
    DataStorageConfig,
    Box,
    Template,
    Entry,
}

/// Which key governs a record.
///
/// Records with `visibility_group_id = None` are sealed under the primary key;
/// all others under the key of their visibility group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyScope {
    Primary,
    Group(Uuid),
}

impl KeyScope {
    pub fn group_id(&self) -> Option<Uuid> {
        match self {
            KeyScope::Primary => None,
            KeyScope::Group(id) => Some(*id),
        }
    }
}

impl From<Option<Uuid>> for KeyScope {
    fn from(group: Option<Uuid>) -> Self {
        match group {
            Some(id) => KeyScope::Group(id),
            None => KeyScope::Primary,
        }
    }
}

impl std::fmt::Display for KeyScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyScope::Primary => write!(f, "primary"),
            KeyScope::Group(id) => write!(f, "group:{id}"),
        }
    }
}

/// Authenticated-encryption output split into its three stored parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ciphertext {
    pub iv: Vec<u8>,
    pub auth_tag: Vec<u8>,
    pub data: Vec<u8>,
}

/// At-rest form of every protected record.
///
/// Routing fields stay in cleartext so stores can filter without a key;
/// everything else lives inside `ciphertext`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiphertextRecord {
    pub kind: RecordKind,
    pub id: Uuid,
    pub user_id: Uuid,
    pub visibility_group_id: Option<Uuid>,
    /// Owning record for nested kinds (storage for boxes/templates, box for entries).
    pub parent_id: Option<Uuid>,
    pub ciphertext: Ciphertext,
}

impl CiphertextRecord {
    pub fn scope(&self) -> KeyScope {
        KeyScope::from(self.visibility_group_id)
    }
}

/// Include/exclude filter over key scopes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeFilter {
    /// When set, only records in these scopes match.
    pub ids: Option<Vec<KeyScope>>,
    /// Records in these scopes never match.
    pub exclude_ids: Vec<KeyScope>,
}

impl ScopeFilter {
    pub fn matches(&self, scope: KeyScope) -> bool {
        if self.exclude_ids.contains(&scope) {
            return false;
        }
        match &self.ids {
            Some(ids) => ids.contains(&scope),
            None => true,
        }
    }
}

/// Filter passed to [`RecordStore::list_records`](crate::traits::RecordStore::list_records).
///
/// `kind` and `user_id` are always applied; the remaining fields narrow further.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFilter {
    pub kind: RecordKind,
    pub user_id: Uuid,
    pub ids: Option<Vec<Uuid>>,
    pub exclude_ids: Vec<Uuid>,
    pub parent_ids: Option<Vec<Uuid>>,
    pub visibility_groups: ScopeFilter,
}

impl RecordFilter {
    pub fn new(kind: RecordKind, user_id: Uuid) -> Self {
        Self {
            kind,
            user_id,
            ids: None,
            exclude_ids: Vec::new(),
            parent_ids: None,
            visibility_groups: ScopeFilter::default(),
        }
    }

    pub fn with_ids(mut self, ids: impl IntoIterator<Item = Uuid>) -> Self {
        self.ids = Some(ids.into_iter().collect());
        self
    }

    pub fn excluding_ids(mut self, ids: impl IntoIterator<Item = Uuid>) -> Self {
        self.exclude_ids.extend(ids);
        self
    }

    pub fn with_parents(mut self, parents: impl IntoIterator<Item = Uuid>) -> Self {
        self.parent_ids = Some(parents.into_iter().collect());
        self
    }

    pub fn in_scopes(mut self, scopes: impl IntoIterator<Item = KeyScope>) -> Self {
        self.visibility_groups.ids = Some(scopes.into_iter().collect());
        self
    }

    pub fn excluding_scopes(mut self, scopes: impl IntoIterator<Item = KeyScope>) -> Self {
        self.visibility_groups.exclude_ids.extend(scopes);
        self
    }

    /// Whether a record passes every clause of this filter.
    pub fn matches(&self, record: &CiphertextRecord) -> bool {
        if record.kind != self.kind || record.user_id != self.user_id {
            return false;
        }
        if self.exclude_ids.contains(&record.id) {
            return false;
        }
        if let Some(ids) = &self.ids
            && !ids.contains(&record.id)
        {
            return false;
        }
        if let Some(parents) = &self.parent_ids {
            match record.parent_id {
                Some(parent) if parents.contains(&parent) => {}
                _ => return false,
            }
        }
        self.visibility_groups.matches(record.scope())
    }
}

/// Credential row produced by sign-up; never contains the plaintext password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecuredSignUp {
    pub user_id: Uuid,
    pub username: String,
    pub password_hash: Vec<u8>,
    pub password_salt: Vec<u8>,
    pub primary_key_salt: Vec<u8>,
}

/// Stored password hash together with the salt it was computed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHashSalt {
    pub hash: Vec<u8>,
    pub salt: Vec<u8>,
}

/// Physical backend a data storage config points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DataStorageBackend {
    /// SQLite database file at `path`.
    Sqlite { path: String },
    /// Process-local storage that disappears when terminated.
    Memory,
}
