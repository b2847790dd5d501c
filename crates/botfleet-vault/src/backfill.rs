// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fingerprint backfill for rows created before the fingerprint column.
//!
//! Decrypts each pre-fingerprint row, computes its digest, and persists it,
//! in bounded batches so write locks stay short next to live webhook
//! traffic. Idempotent and resumable: a row is either untouched (still
//! NULL) or fully migrated; the `fingerprint IS NULL` guard in the update
//! makes re-running a no-op and keeps concurrent rotations authoritative.
//!
//! Terminal state: every active row carries a fingerprint, `status` reports
//! zero remaining, and the resolver's legacy scan latches off.

use botfleet_core::{BotfleetError, TenantId};
use botfleet_storage::queries::credentials;
use tracing::{error, info, warn};

use crate::fingerprint;
use crate::store::CredentialVault;

/// Outcome of one or more backfill batches.
#[derive(Debug, Default)]
pub struct BackfillReport {
    /// Rows whose fingerprint was computed and persisted.
    pub migrated: usize,
    /// Rows that could not be migrated because another tenant already owns
    /// the same token digest. Left unfingerprinted for operator action.
    pub conflicts: Vec<TenantId>,
    /// Rows still unfingerprinted after this run (conflicts included).
    pub remaining: u64,
}

/// Migrate one batch of up to `batch_size` rows, starting from the oldest
/// tenant id.
///
/// Safe to invoke repeatedly from ops tooling; each call picks up where the
/// data is, not where a cursor was.
pub async fn backfill_batch(
    vault: &CredentialVault,
    batch_size: u32,
) -> Result<BackfillReport, BotfleetError> {
    let mut report = BackfillReport::default();
    let page = credentials::list_unfingerprinted(vault.database(), None, batch_size).await?;
    apply_page(vault, &page, &mut report).await?;
    finish_report(vault, &mut report).await?;
    Ok(report)
}

/// Drive batches to completion.
///
/// Pages by tenant id so rows that refuse to migrate (duplicate digests)
/// are passed over instead of being retried forever.
pub async fn backfill_all(
    vault: &CredentialVault,
    batch_size: u32,
) -> Result<BackfillReport, BotfleetError> {
    let mut report = BackfillReport::default();
    let mut after: Option<TenantId> = None;

    loop {
        let page =
            credentials::list_unfingerprinted(vault.database(), after.as_ref(), batch_size)
                .await?;
        if page.is_empty() {
            break;
        }
        after = page.last().map(|r| r.tenant_id.clone());
        apply_page(vault, &page, &mut report).await?;
    }

    finish_report(vault, &mut report).await?;
    info!(
        migrated = report.migrated,
        conflicts = report.conflicts.len(),
        remaining = report.remaining,
        "fingerprint backfill finished"
    );
    Ok(report)
}

/// Decrypt, digest, and persist one page of rows in a single transaction.
async fn apply_page(
    vault: &CredentialVault,
    page: &[botfleet_core::CredentialRecord],
    report: &mut BackfillReport,
) -> Result<(), BotfleetError> {
    if page.is_empty() {
        return Ok(());
    }

    let mut updates = Vec::with_capacity(page.len());
    for record in page {
        // Ciphertext that fails to decrypt here means the master key is
        // wrong or the row is corrupt. Abort the run; migrating around it
        // would hide an operational fault.
        let token = match vault.decrypt_record(record) {
            Ok(token) => token,
            Err(e) => {
                error!(
                    tenant = %record.tenant_id,
                    error = %e,
                    "backfill aborted: stored credential failed to decrypt"
                );
                return Err(e);
            }
        };
        updates.push((record.tenant_id.clone(), fingerprint::digest(&token)));
    }

    let outcome = credentials::set_fingerprints(vault.database(), updates).await?;
    report.migrated += outcome.updated;
    for tenant_id in outcome.conflicts {
        warn!(
            tenant = %tenant_id,
            "backfill conflict: token digest already registered to another tenant"
        );
        report.conflicts.push(tenant_id);
    }
    Ok(())
}

async fn finish_report(
    vault: &CredentialVault,
    report: &mut BackfillReport,
) -> Result<(), BotfleetError> {
    report.remaining = credentials::count_unfingerprinted(vault.database()).await?;
    if report.remaining == 0 {
        vault.latch_migrated();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{self, Cipher};
    use crate::store::CredentialVault;
    use botfleet_storage::{Database, NewCredential};
    use tempfile::tempdir;

    async fn open_vault() -> (CredentialVault, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("backfill_test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        let cipher = Cipher::new(crypto::generate_key().unwrap());
        let vault = CredentialVault::new(db, cipher);
        (vault, dir)
    }

    async fn seed_legacy_row(vault: &CredentialVault, tenant: &str, token: &str) {
        let (ciphertext, nonce) = vault.cipher().encrypt(token.as_bytes()).unwrap();
        credentials::upsert_credential(
            vault.database(),
            NewCredential {
                tenant_id: TenantId::from(tenant),
                ciphertext,
                nonce: nonce.to_vec(),
                fingerprint: None,
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn hundred_rows_migrate_in_ten_batches_of_ten() {
        let (vault, _dir) = open_vault().await;
        for i in 0..100 {
            seed_legacy_row(&vault, &format!("tenant-{i:03}"), &format!("token-{i:03}")).await;
        }

        let mut total_migrated = 0;
        for _ in 0..10 {
            let report = backfill_batch(&vault, 10).await.unwrap();
            total_migrated += report.migrated;
        }
        assert_eq!(total_migrated, 100);

        let final_report = backfill_batch(&vault, 10).await.unwrap();
        assert_eq!(final_report.migrated, 0);
        assert_eq!(final_report.remaining, 0);

        // Every original token now resolves through the index path, and the
        // persisted digest matches a recomputation from the plaintext.
        for i in 0..100 {
            let tenant = vault.resolve(&format!("token-{i:03}")).await.unwrap();
            assert_eq!(tenant, TenantId::from(format!("tenant-{i:03}").as_str()));

            let record = vault.get(&tenant).await.unwrap().unwrap();
            assert_eq!(
                record.fingerprint.unwrap(),
                fingerprint::digest(&format!("token-{i:03}"))
            );
        }
    }

    #[tokio::test]
    async fn backfill_all_drives_to_completion() {
        let (vault, _dir) = open_vault().await;
        for i in 0..25 {
            seed_legacy_row(&vault, &format!("t-{i:02}"), &format!("tok-{i:02}")).await;
        }

        let report = backfill_all(&vault, 7).await.unwrap();
        assert_eq!(report.migrated, 25);
        assert!(report.conflicts.is_empty());
        assert_eq!(report.remaining, 0);
        assert!(!vault.legacy_rows_remain().await.unwrap());
    }

    #[tokio::test]
    async fn backfill_is_idempotent() {
        let (vault, _dir) = open_vault().await;
        seed_legacy_row(&vault, "t-1", "tok-1").await;

        let first = backfill_all(&vault, 10).await.unwrap();
        assert_eq!(first.migrated, 1);

        let second = backfill_all(&vault, 10).await.unwrap();
        assert_eq!(second.migrated, 0);
        assert_eq!(second.remaining, 0);
    }

    #[tokio::test]
    async fn duplicate_legacy_tokens_surface_as_conflicts() {
        let (vault, _dir) = open_vault().await;
        seed_legacy_row(&vault, "t-a", "same-token").await;
        seed_legacy_row(&vault, "t-b", "same-token").await;
        seed_legacy_row(&vault, "t-c", "unique-token").await;

        let report = backfill_all(&vault, 10).await.unwrap();
        assert_eq!(report.migrated, 2);
        assert_eq!(report.conflicts, vec![TenantId::from("t-b")]);
        assert_eq!(report.remaining, 1);

        // The run terminated despite the stuck row, and the conflicted
        // tenant is still resolvable through the legacy scan meanwhile.
        assert_eq!(
            vault.resolve("unique-token").await.unwrap(),
            TenantId::from("t-c")
        );
    }

    #[tokio::test]
    async fn fingerprinted_rows_are_untouched() {
        let (vault, _dir) = open_vault().await;
        vault.put(&TenantId::from("live"), "live-token").await.unwrap();
        let before = vault.get(&TenantId::from("live")).await.unwrap().unwrap();

        let report = backfill_all(&vault, 10).await.unwrap();
        assert_eq!(report.migrated, 0);

        let after = vault.get(&TenantId::from("live")).await.unwrap().unwrap();
        assert_eq!(before.fingerprint, after.fingerprint);
        assert_eq!(before.ciphertext, after.ciphertext);
    }
}
