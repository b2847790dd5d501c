// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vault metadata key-value operations.
//!
//! Holds the wrapped master key, its wrap nonce, the KDF salt, and the KDF
//! parameter blob. Values are opaque bytes to this layer.

use botfleet_core::BotfleetError;
use rusqlite::params;

use crate::database::Database;

/// Read a metadata value.
pub async fn get_meta(db: &Database, key: &str) -> Result<Option<Vec<u8>>, BotfleetError> {
    let key = key.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT value FROM vault_meta WHERE key = ?1",
                params![key],
                |row| row.get::<_, Vec<u8>>(0),
            );
            match result {
                Ok(value) => Ok(Some(value)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Write (or overwrite) a metadata value.
pub async fn set_meta(db: &Database, key: &str, value: Vec<u8>) -> Result<(), BotfleetError> {
    let key = key.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO vault_meta (key, value) VALUES (?1, ?2)",
                params![key, value],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Write several metadata values in one transaction.
///
/// Used at vault creation so the wrapped key never persists without its
/// salt and parameters.
pub async fn set_meta_batch(
    db: &Database,
    entries: Vec<(&'static str, Vec<u8>)>,
) -> Result<(), BotfleetError> {
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let tx = conn.transaction()?;
            for (key, value) in entries {
                tx.execute(
                    "INSERT OR REPLACE INTO vault_meta (key, value) VALUES (?1, ?2)",
                    params![key, value],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}
