// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `coffer status` command implementation.

use std::path::Path;

use coffer_config::CofferConfig;
use coffer_core::{CofferError, CredentialStore, StorageLifecycle};
use coffer_storage::SqliteCredentialStore;
use serde::Serialize;

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub database_path: String,
    pub database_exists: bool,
    pub users: Option<u64>,
    pub kdf_memory_cost: u32,
    pub kdf_iterations: u32,
    pub kdf_parallelism: u32,
    pub salt_len: usize,
}

/// Run the `coffer status` command.
///
/// Never creates the database: a missing file is reported, not initialised.
pub async fn run_status(config: &CofferConfig, json: bool) -> Result<(), CofferError> {
    let path = &config.storage.database_path;
    let exists = Path::new(path).exists();
    let users = if exists { count_users(path).await } else { None };

    let status = StatusResponse {
        database_path: path.clone(),
        database_exists: exists,
        users,
        kdf_memory_cost: config.vault.kdf_memory_cost,
        kdf_iterations: config.vault.kdf_iterations,
        kdf_parallelism: config.vault.kdf_parallelism,
        salt_len: config.vault.salt_len,
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&status).unwrap_or_else(|_| "{}".to_string())
        );
    } else {
        print_status(&status);
    }
    Ok(())
}

async fn count_users(path: &str) -> Option<u64> {
    let store = SqliteCredentialStore::new(path);
    if !store.open().await {
        return None;
    }
    let count = store.get_user_count().await;
    store.close().await;
    count
}

fn print_status(status: &StatusResponse) {
    println!();
    println!("  coffer status");
    println!("  {}", "-".repeat(35));
    if status.database_exists {
        println!("    Database: {}", status.database_path);
    } else {
        println!("    Database: {} (not created yet)", status.database_path);
    }
    match status.users {
        Some(users) => println!("    Users:    {users}"),
        None => println!("    Users:    -"),
    }
    println!(
        "    KDF:      argon2id m={}KiB t={} p={}",
        status.kdf_memory_cost, status.kdf_iterations, status.kdf_parallelism
    );
    println!("    Salt:     {} bytes", status.salt_len);
    println!();
}
