// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User credential rows.

use coffer_core::{CofferError, PasswordHashSalt, SecuredSignUp};
use rusqlite::{OptionalExtension, params};
use uuid::Uuid;

use crate::database::{Database, map_tr_err};
use crate::queries::{is_constraint_violation, now, uuid_column};

/// Insert a user. Returns `false` if the username or id is taken.
pub async fn insert_user(db: &Database, user: SecuredSignUp) -> Result<bool, CofferError> {
    let created_at = now();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let result = conn.execute(
                "INSERT INTO users (id, username, password_hash, password_salt, primary_key_salt, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    user.user_id.to_string(),
                    user.username,
                    user.password_hash,
                    user.password_salt,
                    user.primary_key_salt,
                    created_at,
                ],
            );
            match result {
                Ok(_) => Ok(true),
                Err(e) if is_constraint_violation(&e) => Ok(false),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_user_id(db: &Database, username: &str) -> Result<Option<Uuid>, CofferError> {
    let username = username.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Uuid>, rusqlite::Error> {
            conn.query_row(
                "SELECT id FROM users WHERE username = ?1",
                params![username],
                |row| uuid_column(row, 0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_password_hash_salt(
    db: &Database,
    user_id: Uuid,
) -> Result<Option<PasswordHashSalt>, CofferError> {
    db.connection()
        .call(move |conn| -> Result<Option<PasswordHashSalt>, rusqlite::Error> {
            conn.query_row(
                "SELECT password_hash, password_salt FROM users WHERE id = ?1",
                params![user_id.to_string()],
                |row| {
                    Ok(PasswordHashSalt {
                        hash: row.get(0)?,
                        salt: row.get(1)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_primary_key_salt(
    db: &Database,
    user_id: Uuid,
) -> Result<Option<Vec<u8>>, CofferError> {
    db.connection()
        .call(move |conn| -> Result<Option<Vec<u8>>, rusqlite::Error> {
            conn.query_row(
                "SELECT primary_key_salt FROM users WHERE id = ?1",
                params![user_id.to_string()],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn count_users(db: &Database) -> Result<u64, CofferError> {
    db.connection()
        .call(|conn| -> Result<i64, rusqlite::Error> {
            conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
        })
        .await
        .map_err(map_tr_err)
        .map(|count| count.max(0) as u64)
}
