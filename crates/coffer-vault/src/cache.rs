// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Id-keyed availability caches that report every non-empty change as a diff.

use std::collections::HashSet;

use coffer_core::CofferError;
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::events::{EventQueue, VaultEvent};

/// Items that can live in a [`Cache`].
pub trait Cacheable {
    /// Public projection carried in change events.
    type Info: Clone;

    fn cache_id(&self) -> Uuid;

    fn info(&self) -> Self::Info;
}

/// One change to a cache: items that left and items that arrived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheDiff<I> {
    pub removed: Vec<I>,
    pub added: Vec<I>,
}

impl<I> CacheDiff<I> {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }
}

/// Ordered set of items keyed by id.
///
/// Every mutation that changes the contents queues exactly one event built by
/// the cache's listener; no-op adds and removes are skipped with a warning.
pub struct Cache<T: Cacheable> {
    label: &'static str,
    items: Vec<T>,
    listener: fn(CacheDiff<T::Info>) -> VaultEvent,
}

impl<T: Cacheable> Cache<T> {
    pub fn new(label: &'static str, listener: fn(CacheDiff<T::Info>) -> VaultEvent) -> Self {
        Self {
            label,
            items: Vec::new(),
            listener,
        }
    }

    fn emit(&self, diff: CacheDiff<T::Info>, events: &mut EventQueue) {
        if diff.is_empty() {
            return;
        }
        debug!(
            cache = self.label,
            added = diff.added.len(),
            removed = diff.removed.len(),
            "cache changed"
        );
        events.queue((self.listener)(diff));
    }

    /// Add items not yet present. Returns how many were added.
    pub fn add(&mut self, items: Vec<T>, events: &mut EventQueue) -> Result<usize, CofferError> {
        let mut seen = HashSet::new();
        for item in &items {
            let id = item.cache_id();
            if id.is_nil() {
                return Err(CofferError::Validation(format!(
                    "{} cache rejects nil ids",
                    self.label
                )));
            }
            if !seen.insert(id) {
                return Err(CofferError::Validation(format!(
                    "{} cache received id {id} twice in one add",
                    self.label
                )));
            }
        }

        let mut added = Vec::new();
        for item in items {
            let id = item.cache_id();
            if self.contains(id) {
                warn!(cache = self.label, id = %id, "already present, skipping add");
                continue;
            }
            added.push(item.info());
            self.items.push(item);
        }

        let count = added.len();
        self.emit(
            CacheDiff {
                removed: Vec::new(),
                added,
            },
            events,
        );
        Ok(count)
    }

    /// Remove items by id, skipping ids that are absent.
    pub fn remove(&mut self, ids: &[Uuid], events: &mut EventQueue) -> Vec<T> {
        for id in ids {
            if !self.contains(*id) {
                warn!(cache = self.label, id = %id, "not present, skipping remove");
            }
        }
        self.remove_where(|item| ids.contains(&item.cache_id()), events)
    }

    /// Remove every item matching `predicate`.
    pub fn remove_where(
        &mut self,
        predicate: impl Fn(&T) -> bool,
        events: &mut EventQueue,
    ) -> Vec<T> {
        let (removed, kept): (Vec<T>, Vec<T>) =
            std::mem::take(&mut self.items).into_iter().partition(|item| predicate(item));
        self.items = kept;

        self.emit(
            CacheDiff {
                removed: removed.iter().map(|item| item.info()).collect(),
                added: Vec::new(),
            },
            events,
        );
        removed
    }

    pub fn clear(&mut self, events: &mut EventQueue) -> Vec<T> {
        self.remove_where(|_| true, events)
    }

    pub fn get(&self, id: Uuid) -> Option<&T> {
        self.items.iter().find(|item| item.cache_id() == id)
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn infos(&self) -> Vec<T::Info> {
        self.items.iter().map(|item| item.info()).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
