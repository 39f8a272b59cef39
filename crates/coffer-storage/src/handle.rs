// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Open/close lifecycle shared by the SQLite adapters.
//!
//! Adapters swallow errors at this boundary: failures are logged here and
//! reported as `false` / `None`.

use std::sync::atomic::{AtomicBool, Ordering};

use coffer_core::{CiphertextRecord, CofferError, RecordFilter};
use tokio::sync::RwLock;
use tracing::{debug, error};

use crate::database::Database;
use crate::queries;

/// Where a store keeps its database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Location {
    File(String),
    /// Lives as long as the handle; closing only marks it closed.
    Memory,
}

pub(crate) struct StoreHandle {
    label: &'static str,
    location: Location,
    db: RwLock<Option<Database>>,
    open: AtomicBool,
}

impl StoreHandle {
    pub(crate) fn new(label: &'static str, location: Location) -> Self {
        Self {
            label,
            location,
            db: RwLock::new(None),
            open: AtomicBool::new(false),
        }
    }

    pub(crate) async fn open(&self) -> bool {
        let mut db = self.db.write().await;
        if self.open.load(Ordering::SeqCst) {
            return true;
        }
        if db.is_none() {
            let opened = match &self.location {
                Location::File(path) => Database::open(path).await,
                Location::Memory => Database::open_in_memory().await,
            };
            match opened {
                Ok(handle) => *db = Some(handle),
                Err(e) => {
                    error!(store = self.label, error = %e, "failed to open store");
                    return false;
                }
            }
        }
        self.open.store(true, Ordering::SeqCst);
        debug!(store = self.label, "store opened");
        true
    }

    pub(crate) async fn close(&self) -> bool {
        let mut db = self.db.write().await;
        self.open.store(false, Ordering::SeqCst);
        if self.location == Location::Memory {
            debug!(store = self.label, "in-memory store marked closed");
            return true;
        }
        if let Some(handle) = db.take()
            && let Err(e) = handle.close().await
        {
            error!(store = self.label, error = %e, "failed to close store cleanly");
        }
        debug!(store = self.label, "store closed");
        true
    }

    pub(crate) fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// A connection to the open database, or `None` if the store is closed.
    async fn database(&self, operation: &str) -> Option<Database> {
        let db = self.db.read().await;
        match db.as_ref() {
            Some(handle) if self.is_open() => Some(handle.clone()),
            _ => {
                error!(store = self.label, operation, "store is closed");
                None
            }
        }
    }

    /// Log a failed operation and drop its error.
    fn settle<T>(&self, operation: &str, result: Result<T, CofferError>) -> Option<T> {
        result
            .map_err(|e| error!(store = self.label, operation, error = %e, "store operation failed"))
            .ok()
    }

    /// Run a query against the open database, logging and swallowing failures.
    pub(crate) async fn query<T, F, Fut>(&self, operation: &str, op: F) -> Option<T>
    where
        F: FnOnce(Database) -> Fut,
        Fut: std::future::Future<Output = Result<T, CofferError>>,
    {
        let db = self.database(operation).await?;
        self.settle(operation, op(db).await)
    }

    pub(crate) async fn add_record(&self, record: CiphertextRecord) -> bool {
        self.query("add_record", |db| async move {
            queries::records::insert_record(&db, record).await
        })
        .await
        .unwrap_or(false)
    }

    pub(crate) async fn list_records(&self, filter: &RecordFilter) -> Option<Vec<CiphertextRecord>> {
        let filter = filter.clone();
        self.query("list_records", |db| async move {
            queries::records::list_records(&db, &filter).await
        })
        .await
    }
}
