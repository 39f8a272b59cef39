// SPDX-FileCopyrightText: 2026 Coffer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ciphertext record rows.
//!
//! `kind` and `user_id` are matched in SQL; the remaining filter clauses are
//! applied to the decoded rows with [`RecordFilter::matches`].

use std::str::FromStr;

use coffer_core::{Ciphertext, CiphertextRecord, CofferError, RecordFilter, RecordKind};
use rusqlite::params;
use rusqlite::types::Type;

use crate::database::{Database, map_tr_err};
use crate::queries::{is_constraint_violation, now, optional_uuid_column, uuid_column};

/// Insert a record. Returns `false` if a record of the same kind and id exists.
pub async fn insert_record(db: &Database, record: CiphertextRecord) -> Result<bool, CofferError> {
    let created_at = now();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let result = conn.execute(
                "INSERT INTO records (kind, id, user_id, visibility_group_id, parent_id, iv, auth_tag, data, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    record.kind.to_string(),
                    record.id.to_string(),
                    record.user_id.to_string(),
                    record.visibility_group_id.map(|id| id.to_string()),
                    record.parent_id.map(|id| id.to_string()),
                    record.ciphertext.iv,
                    record.ciphertext.auth_tag,
                    record.ciphertext.data,
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

/// List records matching `filter`, oldest first.
pub async fn list_records(
    db: &Database,
    filter: &RecordFilter,
) -> Result<Vec<CiphertextRecord>, CofferError> {
    let filter = filter.clone();
    db.connection()
        .call(move |conn| -> Result<Vec<CiphertextRecord>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT kind, id, user_id, visibility_group_id, parent_id, iv, auth_tag, data
                 FROM records WHERE kind = ?1 AND user_id = ?2
                 ORDER BY created_at, rowid",
            )?;
            let rows = stmt.query_map(
                params![filter.kind.to_string(), filter.user_id.to_string()],
                |row| {
                    let kind: String = row.get(0)?;
                    let kind = RecordKind::from_str(&kind).map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e))
                    })?;
                    Ok(CiphertextRecord {
                        kind,
                        id: uuid_column(row, 1)?,
                        user_id: uuid_column(row, 2)?,
                        visibility_group_id: optional_uuid_column(row, 3)?,
                        parent_id: optional_uuid_column(row, 4)?,
                        ciphertext: Ciphertext {
                            iv: row.get(5)?,
                            auth_tag: row.get(6)?,
                            data: row.get(7)?,
                        },
                    })
                },
            )?;
            let mut records = Vec::new();
            for row in rows {
                let record = row?;
                if filter.matches(&record) {
                    records.push(record);
                }
            }
            Ok(records)
        })
        .await
        .map_err(map_tr_err)
}
