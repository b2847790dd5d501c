// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The credential vault: encrypted per-tenant bot-token storage.
//!
//! `put` seals the token, digests it, and writes both in one atomic upsert.
//! Ciphertext and fingerprint can therefore never diverge in a committed
//! row, and the unique fingerprint index decides races between concurrent
//! writers.

use std::sync::atomic::{AtomicBool, Ordering};

use botfleet_core::{BotfleetError, CredentialRecord, TenantId};
use botfleet_storage::queries::credentials;
use botfleet_storage::{Database, NewCredential};
use secrecy::SecretString;
use tracing::debug;

use crate::crypto::{Cipher, NONCE_LEN};
use crate::fingerprint;

/// The unlocked vault. Cheap to share behind an `Arc` across request tasks:
/// every operation takes `&self`.
pub struct CredentialVault {
    db: Database,
    cipher: Cipher,
    /// Latched capability flag for the legacy decrypt-scan: `true` while
    /// pre-fingerprint rows may still exist. Starts optimistic; the first
    /// fingerprint miss counts the backlog, and once a count observes zero
    /// remaining the flag flips to `false` and never back.
    legacy_rows: AtomicBool,
}

impl std::fmt::Debug for CredentialVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialVault")
            .field("cipher", &self.cipher)
            .finish()
    }
}

impl CredentialVault {
    /// Build the vault over an opened database and an unlocked cipher.
    pub fn new(db: Database, cipher: Cipher) -> Self {
        Self {
            db,
            cipher,
            legacy_rows: AtomicBool::new(true),
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub(crate) fn cipher(&self) -> &Cipher {
        &self.cipher
    }

    /// Store or rotate a tenant's credential.
    ///
    /// Fails with [`BotfleetError::DuplicateFingerprint`] when another
    /// tenant already holds the exact same token; the caller surfaces the
    /// conflict and must not retry-overwrite.
    pub async fn put(&self, tenant_id: &TenantId, token: &str) -> Result<(), BotfleetError> {
        if token.is_empty() {
            return Err(BotfleetError::Vault(
                "empty credential not allowed".to_string(),
            ));
        }

        let (ciphertext, nonce) = self.cipher.encrypt(token.as_bytes())?;
        let fp = fingerprint::digest(token);

        credentials::upsert_credential(
            &self.db,
            NewCredential {
                tenant_id: tenant_id.clone(),
                ciphertext,
                nonce: nonce.to_vec(),
                fingerprint: Some(fp.clone()),
            },
        )
        .await?;

        debug!(tenant = %tenant_id, fingerprint = %fp.prefix(), "credential stored");
        Ok(())
    }

    /// Fetch a tenant's record without decrypting it.
    pub async fn get(&self, tenant_id: &TenantId) -> Result<Option<CredentialRecord>, BotfleetError> {
        credentials::get_credential(&self.db, tenant_id).await
    }

    /// Fetch and decrypt a tenant's credential.
    pub async fn reveal(&self, tenant_id: &TenantId) -> Result<Option<SecretString>, BotfleetError> {
        match self.get(tenant_id).await? {
            Some(record) => {
                let token = self.decrypt_record(&record)?;
                Ok(Some(SecretString::from(token)))
            }
            None => Ok(None),
        }
    }

    /// Delete a tenant's credential. Returns whether one existed.
    pub async fn delete(&self, tenant_id: &TenantId) -> Result<bool, BotfleetError> {
        let existed = credentials::delete_credential(&self.db, tenant_id).await?;
        if existed {
            debug!(tenant = %tenant_id, "credential deleted");
        }
        Ok(existed)
    }

    /// Decrypt a stored record back to the plaintext token.
    ///
    /// A decryption failure here is always an operational fault (wrong
    /// master key, corrupted row), never a property of client input.
    pub(crate) fn decrypt_record(&self, record: &CredentialRecord) -> Result<String, BotfleetError> {
        let nonce: [u8; NONCE_LEN] = record
            .nonce
            .as_slice()
            .try_into()
            .map_err(|_| BotfleetError::Vault("corrupted nonce in credential row".to_string()))?;
        let plaintext = self.cipher.decrypt(&nonce, &record.ciphertext)?;
        String::from_utf8(plaintext).map_err(|e| {
            BotfleetError::Vault(format!("decrypted credential is not valid UTF-8: {e}"))
        })
    }

    /// Whether the legacy scan path is still live. Re-counts only until the
    /// backlog first reaches zero, then stays off for the process lifetime.
    pub(crate) async fn legacy_rows_remain(&self) -> Result<bool, BotfleetError> {
        if !self.legacy_rows.load(Ordering::Relaxed) {
            return Ok(false);
        }
        let backlog = credentials::count_unfingerprinted(&self.db).await?;
        if backlog == 0 {
            self.legacy_rows.store(false, Ordering::Relaxed);
        }
        Ok(backlog > 0)
    }

    /// Called by the backfill driver when the backlog reaches zero.
    pub(crate) fn latch_migrated(&self) {
        self.legacy_rows.store(false, Ordering::Relaxed);
    }
}

/// Mask a token for display: `"1234...wxyz"`.
///
/// Shows up to 4 leading and 4 trailing characters; short values are fully
/// masked.
pub fn mask_token(value: &str) -> String {
    if value.len() < 10 {
        return "****".to_string();
    }
    let prefix = &value[..4];
    let suffix = &value[value.len() - 4..];
    format!("{prefix}...{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto;
    use std::sync::Arc;
    use tempfile::tempdir;
    use tokio::task::JoinSet;

    async fn open_vault() -> (Arc<CredentialVault>, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("store_test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        let cipher = Cipher::new(crypto::generate_key().unwrap());
        let vault = CredentialVault::new(db, cipher);
        (Arc::new(vault), dir)
    }

    #[tokio::test]
    async fn put_get_reveal_roundtrip() {
        let (vault, _dir) = open_vault().await;
        let tenant = TenantId::from("tenant-1");

        vault.put(&tenant, "123456789:AAbotToken").await.unwrap();

        let record = vault.get(&tenant).await.unwrap().unwrap();
        assert!(record.fingerprint.is_some());
        assert_ne!(record.ciphertext, b"123456789:AAbotToken");

        use secrecy::ExposeSecret;
        let revealed = vault.reveal(&tenant).await.unwrap().unwrap();
        assert_eq!(revealed.expose_secret(), "123456789:AAbotToken");
    }

    #[tokio::test]
    async fn stored_fingerprint_matches_recomputed_digest() {
        let (vault, _dir) = open_vault().await;
        let tenant = TenantId::from("tenant-1");
        vault.put(&tenant, "some-token").await.unwrap();

        let record = vault.get(&tenant).await.unwrap().unwrap();
        assert_eq!(
            record.fingerprint.unwrap(),
            fingerprint::digest("some-token")
        );
    }

    #[tokio::test]
    async fn empty_token_is_rejected() {
        let (vault, _dir) = open_vault().await;
        let err = vault.put(&TenantId::from("t"), "").await.unwrap_err();
        assert!(matches!(err, BotfleetError::Vault(_)));
    }

    #[tokio::test]
    async fn second_tenant_with_same_token_gets_conflict() {
        let (vault, _dir) = open_vault().await;
        vault
            .put(&TenantId::from("tenant-a"), "shared-token")
            .await
            .unwrap();

        let err = vault
            .put(&TenantId::from("tenant-b"), "shared-token")
            .await
            .unwrap_err();
        assert!(matches!(err, BotfleetError::DuplicateFingerprint));
    }

    #[tokio::test]
    async fn delete_then_get_returns_none() {
        let (vault, _dir) = open_vault().await;
        let tenant = TenantId::from("tenant-1");
        vault.put(&tenant, "token").await.unwrap();

        assert!(vault.delete(&tenant).await.unwrap());
        assert!(vault.get(&tenant).await.unwrap().is_none());
        assert!(!vault.delete(&tenant).await.unwrap());
    }

    #[tokio::test]
    async fn deleted_token_becomes_available_to_others() {
        let (vault, _dir) = open_vault().await;
        vault.put(&TenantId::from("t-a"), "the-token").await.unwrap();
        vault.delete(&TenantId::from("t-a")).await.unwrap();

        // The fingerprint row is gone, so another tenant may register it.
        vault.put(&TenantId::from("t-b"), "the-token").await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_puts_with_distinct_tokens_all_succeed() {
        let (vault, _dir) = open_vault().await;

        let mut tasks = JoinSet::new();
        for i in 0..50 {
            let vault = Arc::clone(&vault);
            tasks.spawn(async move {
                vault
                    .put(&TenantId(format!("tenant-{i}")), &format!("token-{i}"))
                    .await
            });
        }

        let mut ok = 0;
        while let Some(result) = tasks.join_next().await {
            result.unwrap().unwrap();
            ok += 1;
        }
        assert_eq!(ok, 50);
    }

    #[tokio::test]
    async fn concurrent_puts_with_one_token_elect_exactly_one_winner() {
        let (vault, _dir) = open_vault().await;

        let mut tasks = JoinSet::new();
        for i in 0..50 {
            let vault = Arc::clone(&vault);
            tasks.spawn(async move {
                vault
                    .put(&TenantId(format!("tenant-{i}")), "the-one-token")
                    .await
            });
        }

        let mut wins = 0;
        let mut conflicts = 0;
        while let Some(result) = tasks.join_next().await {
            match result.unwrap() {
                Ok(()) => wins += 1,
                Err(BotfleetError::DuplicateFingerprint) => conflicts += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(wins, 1);
        assert_eq!(conflicts, 49);
    }

    #[test]
    fn mask_token_long_value() {
        assert_eq!(mask_token("123456789:AAbotTokenValue"), "1234...alue");
    }

    #[test]
    fn mask_token_short_value() {
        assert_eq!(mask_token("short"), "****");
    }

    #[test]
    fn mask_token_exact_boundary() {
        assert_eq!(mask_token("1234567890"), "1234...7890");
    }
}
