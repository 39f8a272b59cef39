// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for the Coffer secrets vault.
//!
//! Provides WAL-mode SQLite storage with embedded migrations and a
//! single-writer concurrency model via `tokio-rusqlite`. Implements the
//! account storage (`CredentialStore`) and data storage (`DataStorage`)
//! adapters on top of one shared `records` table layout.

pub mod credential_store;
pub mod data_storage;
pub mod database;
pub mod migrations;
pub mod queries;

mod handle;

pub use credential_store::SqliteCredentialStore;
pub use data_storage::{SqliteConnector, SqliteDataStorage};
pub use database::Database;
