// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential table operations.
//!
//! The unique partial index on `credentials.fingerprint` is the single
//! source of truth for the one-credential-one-tenant invariant. Nothing in
//! this module pre-checks for duplicates; constraint violations from the
//! storage engine are caught and surfaced as
//! [`BotfleetError::DuplicateFingerprint`], which also closes the race
//! between concurrent writes.

use botfleet_core::{BotfleetError, CredentialRecord, Fingerprint, TenantId};
use rusqlite::params;

use crate::database::Database;

/// Write-side view of a credential: the vault supplies ciphertext, nonce,
/// and digest; timestamps are generated in SQL.
#[derive(Debug, Clone)]
pub struct NewCredential {
    pub tenant_id: TenantId,
    pub ciphertext: Vec<u8>,
    pub nonce: Vec<u8>,
    /// `None` only when seeding pre-fingerprint rows (tests, imports from
    /// the legacy scheme).
    pub fingerprint: Option<Fingerprint>,
}

/// Result of applying a batch of backfill fingerprint updates.
#[derive(Debug, Default)]
pub struct FingerprintBatchOutcome {
    /// Rows whose fingerprint was written.
    pub updated: usize,
    /// Rows skipped because another tenant already owns the digest.
    pub conflicts: Vec<TenantId>,
    /// Rows skipped because they were rotated or deleted mid-batch and are
    /// no longer in the migration window.
    pub gone: usize,
}

enum UpsertOutcome {
    Stored,
    DuplicateFingerprint,
}

/// Insert or rotate a tenant's credential atomically.
///
/// Update-then-insert inside one transaction rather than an `ON CONFLICT`
/// upsert: a rotation that keeps the tenant's current token must rewrite
/// its own row, and SQLite's upsert makes no ordering promise between the
/// primary-key conflict and the fingerprint-index conflict in that case.
/// `created_at` is preserved on rotation; `rotated_at` always moves.
/// Ciphertext and fingerprint change together or not at all.
pub async fn upsert_credential(db: &Database, cred: NewCredential) -> Result<(), BotfleetError> {
    let NewCredential {
        tenant_id,
        ciphertext,
        nonce,
        fingerprint,
    } = cred;
    let tenant_id = tenant_id.0;
    let fingerprint = fingerprint.map(|f| f.0);

    let outcome = db
        .connection()
        .call(move |conn| -> Result<UpsertOutcome, rusqlite::Error> {
            let tx = conn.transaction()?;
            let result = (|| -> Result<(), rusqlite::Error> {
                let updated = tx.execute(
                    "UPDATE credentials SET
                         ciphertext = ?2,
                         nonce = ?3,
                         fingerprint = ?4,
                         rotated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE tenant_id = ?1",
                    params![tenant_id, ciphertext, nonce, fingerprint],
                )?;
                if updated == 0 {
                    tx.execute(
                        "INSERT INTO credentials (tenant_id, ciphertext, nonce, fingerprint, created_at, rotated_at)
                         VALUES (?1, ?2, ?3, ?4,
                                 strftime('%Y-%m-%dT%H:%M:%fZ', 'now'),
                                 strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))",
                        params![tenant_id, ciphertext, nonce, fingerprint],
                    )?;
                }
                Ok(())
            })();
            match result {
                Ok(()) => {
                    tx.commit()?;
                    Ok(UpsertOutcome::Stored)
                }
                Err(e) if is_fingerprint_conflict(&e) => Ok(UpsertOutcome::DuplicateFingerprint),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    match outcome {
        UpsertOutcome::Stored => Ok(()),
        UpsertOutcome::DuplicateFingerprint => Err(BotfleetError::DuplicateFingerprint),
    }
}

/// Get a credential record by tenant.
pub async fn get_credential(
    db: &Database,
    tenant_id: &TenantId,
) -> Result<Option<CredentialRecord>, BotfleetError> {
    let tenant_id = tenant_id.0.clone();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT tenant_id, ciphertext, nonce, fingerprint, created_at, rotated_at
                 FROM credentials WHERE tenant_id = ?1",
            )?;
            let result = stmt.query_row(params![tenant_id], row_to_record);
            match result {
                Ok(record) => Ok(Some(record)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Point lookup through the fingerprint index. O(1) regardless of table size.
pub async fn find_by_fingerprint(
    db: &Database,
    fingerprint: &Fingerprint,
) -> Result<Option<CredentialRecord>, BotfleetError> {
    let fingerprint = fingerprint.0.clone();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT tenant_id, ciphertext, nonce, fingerprint, created_at, rotated_at
                 FROM credentials WHERE fingerprint = ?1",
            )?;
            let result = stmt.query_row(params![fingerprint], row_to_record);
            match result {
                Ok(record) => Ok(Some(record)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete a tenant's credential. Returns whether a row existed.
pub async fn delete_credential(db: &Database, tenant_id: &TenantId) -> Result<bool, BotfleetError> {
    let tenant_id = tenant_id.0.clone();
    db.connection()
        .call(move |conn| {
            let affected = conn.execute(
                "DELETE FROM credentials WHERE tenant_id = ?1",
                params![tenant_id],
            )?;
            Ok(affected > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Page through records still missing a fingerprint, in tenant order.
///
/// Keyset pagination (`tenant_id > after`) stays stable while rows leave the
/// migration window between pages.
pub async fn list_unfingerprinted(
    db: &Database,
    after: Option<&TenantId>,
    limit: u32,
) -> Result<Vec<CredentialRecord>, BotfleetError> {
    let after = after.map(|t| t.0.clone());
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT tenant_id, ciphertext, nonce, fingerprint, created_at, rotated_at
                 FROM credentials
                 WHERE fingerprint IS NULL AND (?1 IS NULL OR tenant_id > ?1)
                 ORDER BY tenant_id
                 LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![after, limit], row_to_record)?;
            let mut records = Vec::new();
            for row in rows {
                records.push(row?);
            }
            Ok(records)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Count records still missing a fingerprint.
pub async fn count_unfingerprinted(db: &Database) -> Result<u64, BotfleetError> {
    db.connection()
        .call(|conn| -> Result<u64, rusqlite::Error> {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM credentials WHERE fingerprint IS NULL",
                [],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Count all credential records.
pub async fn count_credentials(db: &Database) -> Result<u64, BotfleetError> {
    db.connection()
        .call(|conn| -> Result<u64, rusqlite::Error> {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM credentials", [], |row| row.get(0))?;
            Ok(count as u64)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Apply one backfill batch of computed fingerprints in a single transaction.
///
/// Each update is guarded by `fingerprint IS NULL`, so a row rotated while
/// the batch was being computed is left alone (rotation already wrote the
/// fresh digest). Unique-index conflicts within the batch are tolerated
/// per row and reported, not propagated; a later operator decision resolves
/// them.
pub async fn set_fingerprints(
    db: &Database,
    updates: Vec<(TenantId, Fingerprint)>,
) -> Result<FingerprintBatchOutcome, BotfleetError> {
    db.connection()
        .call(move |conn| -> Result<FingerprintBatchOutcome, rusqlite::Error> {
            let tx = conn.transaction()?;
            let mut outcome = FingerprintBatchOutcome::default();
            for (tenant_id, fingerprint) in updates {
                let result = tx.execute(
                    "UPDATE credentials SET fingerprint = ?1
                     WHERE tenant_id = ?2 AND fingerprint IS NULL",
                    params![fingerprint.0, tenant_id.0],
                );
                match result {
                    Ok(0) => outcome.gone += 1,
                    Ok(_) => outcome.updated += 1,
                    Err(e) if is_fingerprint_conflict(&e) => outcome.conflicts.push(tenant_id),
                    Err(e) => return Err(e),
                }
            }
            tx.commit()?;
            Ok(outcome)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Map a row from the canonical six-column SELECT to a record.
fn row_to_record(row: &rusqlite::Row<'_>) -> Result<CredentialRecord, rusqlite::Error> {
    Ok(CredentialRecord {
        tenant_id: TenantId(row.get(0)?),
        ciphertext: row.get(1)?,
        nonce: row.get(2)?,
        fingerprint: row.get::<_, Option<String>>(3)?.map(Fingerprint),
        created_at: row.get(4)?,
        rotated_at: row.get(5)?,
    })
}

/// True when the error is a unique-index violation on `credentials.fingerprint`.
fn is_fingerprint_conflict(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, Some(msg)) => {
            e.code == rusqlite::ErrorCode::ConstraintViolation
                && msg.contains("credentials.fingerprint")
        }
        _ => false,
    }
}
