// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Coffer integration tests.
//!
//! Provides in-memory storage adapters and a vault harness for fast,
//! deterministic tests without touching the filesystem.
//!
//! # Components
//!
//! - [`MemoryCredentialStore`] - account storage with failure injection
//! - [`MemoryDataStorage`] / [`MemoryConnector`] - data storages that survive re-initialisation
//! - [`TestHarness`] - a vault wired to the in-memory adapters

pub mod harness;
pub mod memory_store;

use coffer_vault::Argon2Kdf;

pub use harness::TestHarness;
pub use memory_store::{MemoryConnector, MemoryCredentialStore, MemoryDataStorage};

/// Argon2id with a 1 MiB memory cost and a single pass, for tests only.
pub fn fast_kdf() -> Argon2Kdf {
    Argon2Kdf::new(1024, 1, 1)
}
