// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session-lifetime holder of the primary key and the open visibility-group keys.
//!
//! Every key leaving the registry is scrubbed first. Keys handed back to the
//! caller as [`RetiredKey`] are already overwritten.

use std::collections::HashMap;

use coffer_core::{CofferError, KeyScope};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::model::SessionSummary;
use crate::secret::SecretKey;

/// A signed-in user and their primary key.
pub struct Session {
    /// Distinguishes two sign-ins of the same user.
    token: Uuid,
    user_id: Uuid,
    username: String,
    primary_key: SecretKey,
}

impl Session {
    pub fn new(user_id: Uuid, username: impl Into<String>, primary_key: SecretKey) -> Self {
        Self {
            token: Uuid::new_v4(),
            user_id,
            username: username.into(),
            primary_key,
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn primary_key(&self) -> &SecretKey {
        &self.primary_key
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            user_id: self.user_id,
            username: self.username.clone(),
        }
    }

    fn validate(&self) -> Result<(), CofferError> {
        if self.user_id.is_nil() {
            return Err(CofferError::Validation("session user id must not be nil".to_string()));
        }
        if self.username.trim().is_empty() {
            return Err(CofferError::Validation("session username must not be empty".to_string()));
        }
        Ok(())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("username", &self.username)
            .field("primary_key", &self.primary_key)
            .finish()
    }
}

/// A key removed from the registry. Its bytes were scrubbed on removal.
#[derive(Debug)]
pub struct RetiredKey {
    pub scope: KeyScope,
    pub key: SecretKey,
}

fn retire(scope: KeyScope, mut key: SecretKey) -> RetiredKey {
    key.scrub();
    RetiredKey { scope, key }
}

/// Result of [`KeyScopeRegistry::set_session`].
#[derive(Debug)]
pub struct SessionTransition {
    /// `false` when the new value equals the current one and nothing was touched.
    pub replaced: bool,
    /// Old primary key and every group key closed by the replacement.
    pub retired: Vec<RetiredKey>,
}

impl SessionTransition {
    /// Ids of the visibility groups the replacement closed.
    pub fn closed_groups(&self) -> Vec<Uuid> {
        self.retired.iter().filter_map(|r| r.scope.group_id()).collect()
    }
}

#[derive(Debug, Default)]
pub struct KeyScopeRegistry {
    session: Option<Session>,
    open_groups: HashMap<Uuid, SecretKey>,
}

impl KeyScopeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// The current session, or a precondition error.
    pub fn require_session(&self) -> Result<&Session, CofferError> {
        self.session.as_ref().ok_or_else(CofferError::no_session)
    }

    /// Install, replace or clear the session.
    ///
    /// An invalid session leaves the registry untouched. Replacing a session
    /// scrubs the old primary key and closes every open group before the new
    /// session is installed.
    pub fn set_session(&mut self, new: Option<Session>) -> Result<SessionTransition, CofferError> {
        if let Some(session) = &new {
            session.validate()?;
        }

        let unchanged = match (&self.session, &new) {
            (None, None) => true,
            (Some(old), Some(new)) => old.token == new.token,
            _ => false,
        };
        if unchanged {
            debug!("session set to its current value");
            return Ok(SessionTransition {
                replaced: false,
                retired: Vec::new(),
            });
        }

        let mut retired = Vec::new();
        if let Some(old) = self.session.take() {
            retired.push(retire(KeyScope::Primary, old.primary_key));
        }
        retired.extend(self.close_all_groups());
        self.session = new;

        debug!(
            signed_in = self.session.is_some(),
            retired = retired.len(),
            "session replaced"
        );
        Ok(SessionTransition {
            replaced: true,
            retired,
        })
    }

    /// Register an open group key. Returns `false` if the group was already open.
    pub fn open_group(&mut self, id: Uuid, key: SecretKey) -> Result<bool, CofferError> {
        if self.session.is_none() {
            return Err(CofferError::no_session());
        }
        if self.open_groups.contains_key(&id) {
            warn!(visibility_group_id = %id, "visibility group is already open");
            drop(retire(KeyScope::Group(id), key));
            return Ok(false);
        }
        self.open_groups.insert(id, key);
        Ok(true)
    }

    /// Close the given groups, skipping ids that are not open.
    pub fn close_groups(&mut self, ids: &[Uuid]) -> Vec<RetiredKey> {
        let mut retired = Vec::new();
        for id in ids {
            match self.open_groups.remove(id) {
                Some(key) => retired.push(retire(KeyScope::Group(*id), key)),
                None => warn!(visibility_group_id = %id, "visibility group is not open, skipping close"),
            }
        }
        retired
    }

    fn close_all_groups(&mut self) -> Vec<RetiredKey> {
        self.open_groups
            .drain()
            .map(|(id, key)| retire(KeyScope::Group(id), key))
            .collect()
    }

    pub fn is_group_open(&self, id: Uuid) -> bool {
        self.open_groups.contains_key(&id)
    }

    pub fn open_group_ids(&self) -> Vec<Uuid> {
        self.open_groups.keys().copied().collect()
    }

    /// Every scope that currently has a key.
    pub fn available_scopes(&self) -> Vec<KeyScope> {
        if self.session.is_none() {
            return Vec::new();
        }
        std::iter::once(KeyScope::Primary)
            .chain(self.open_groups.keys().map(|id| KeyScope::Group(*id)))
            .collect()
    }

    /// The key governing `scope`, if it is present.
    pub fn key_for(&self, scope: KeyScope) -> Option<&SecretKey> {
        match scope {
            KeyScope::Primary => self.session.as_ref().map(|s| &s.primary_key),
            KeyScope::Group(id) => self.open_groups.get(&id),
        }
    }
}
