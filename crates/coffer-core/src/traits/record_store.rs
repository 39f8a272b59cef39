// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ciphertext record persistence and open/close lifecycle shared by every store.

use async_trait::async_trait;

use crate::types::{CiphertextRecord, RecordFilter};

/// Open/close lifecycle of a storage backend.
///
/// Implementations catch their own I/O failures, log them, and report `false`.
#[async_trait]
pub trait StorageLifecycle: Send + Sync {
    /// Opens the backend. Returns `true` if it is open afterwards.
    async fn open(&self) -> bool;

    /// Closes the backend, flushing pending writes. Returns `true` if it is closed afterwards.
    async fn close(&self) -> bool;

    /// Whether the backend is currently open.
    fn is_open(&self) -> bool;

    /// Whether the backend is currently closed.
    fn is_closed(&self) -> bool {
        !self.is_open()
    }
}

/// Persistence of opaque ciphertext records.
///
/// Stores never see plaintext: they filter on the cleartext routing fields only.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Inserts a record. Returns `false` on duplicate id or I/O failure.
    async fn add_record(&self, record: CiphertextRecord) -> bool;

    /// Returns every record matching `filter`, or `None` if the store could not be read.
    async fn list_records(&self, filter: &RecordFilter) -> Option<Vec<CiphertextRecord>>;
}
