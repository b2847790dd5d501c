// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bearer-token resolution: map an inbound webhook token to its tenant.
//!
//! Two-stage lookup. Stage one digests the presented token and does a
//! single indexed read -- O(1) regardless of tenant count, and it touches
//! no plaintext. Stage two decrypts the one matched row and compares in
//! constant time, so a compromised fingerprint index alone can never
//! impersonate a tenant.
//!
//! During the migration window, rows that predate the fingerprint column
//! are still resolvable through a decrypt-scan over the unfingerprinted
//! remainder. The scan is selected by a latched capability check and is
//! dead code once the backfill finishes; it is retained only for disaster
//! recovery after that.

use botfleet_core::{BotfleetError, CredentialRecord, TenantId};
use botfleet_storage::queries::credentials;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::crypto;
use crate::fingerprint;
use crate::store::CredentialVault;

/// Rows fetched per page of the legacy scan.
const LEGACY_SCAN_PAGE: u32 = 256;

/// Resolution outcome for the webhook boundary.
///
/// `Unauthorized` is deliberately shapeless: the caller cannot tell an
/// unknown fingerprint from a mismatch, which denies enumeration attacks an
/// oracle.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The presented token does not belong to any tenant.
    #[error("unauthorized")]
    Unauthorized,

    /// Storage or decryption failure. Operator problem; alert, do not
    /// blame the client.
    #[error("credential resolution failed: {0}")]
    Internal(BotfleetError),
}

impl CredentialVault {
    /// Resolve a presented bearer token to the owning tenant.
    ///
    /// Read-only; callers impose their own request timeout.
    pub async fn resolve(&self, presented: &str) -> Result<TenantId, ResolveError> {
        if presented.is_empty() {
            return Err(ResolveError::Unauthorized);
        }

        let fp = fingerprint::digest(presented);
        let candidate = credentials::find_by_fingerprint(self.database(), &fp)
            .await
            .map_err(ResolveError::Internal)?;

        match candidate {
            Some(record) => match self.verify_candidate(&record, presented) {
                Ok(tenant_id) => Ok(tenant_id),
                Err(e @ BotfleetError::FingerprintMismatch { .. }) => {
                    // Should be cryptographically impossible once the digest
                    // matched. Alarm-worthy, but the response stays uniform.
                    error!(
                        error = %e,
                        "possible digest collision or forged index entry"
                    );
                    Err(ResolveError::Unauthorized)
                }
                Err(e) => {
                    // A fingerprint hit with an undecryptable row means key
                    // rotation gone wrong or data corruption, never attacker
                    // input. Fail loudly.
                    error!(
                        tenant = %record.tenant_id,
                        error = %e,
                        "credential matched by fingerprint but failed to decrypt"
                    );
                    Err(ResolveError::Internal(e))
                }
            },
            None => self.resolve_via_legacy_scan(presented).await,
        }
    }

    /// Decrypt-and-compare the single index hit.
    fn verify_candidate(
        &self,
        record: &CredentialRecord,
        presented: &str,
    ) -> Result<TenantId, BotfleetError> {
        let stored = self.decrypt_record(record)?;
        if crypto::constant_time_eq(stored.as_bytes(), presented.as_bytes()) {
            Ok(record.tenant_id.clone())
        } else {
            Err(BotfleetError::FingerprintMismatch {
                tenant_id: record.tenant_id.0.clone(),
            })
        }
    }

    /// Migration-window fallback: decrypt-and-compare the unfingerprinted
    /// remainder, paged by tenant id.
    async fn resolve_via_legacy_scan(&self, presented: &str) -> Result<TenantId, ResolveError> {
        if !self
            .legacy_rows_remain()
            .await
            .map_err(ResolveError::Internal)?
        {
            return Err(ResolveError::Unauthorized);
        }

        debug!("fingerprint miss with migration backlog present -- scanning legacy rows");
        let mut after: Option<TenantId> = None;
        loop {
            let page = credentials::list_unfingerprinted(
                self.database(),
                after.as_ref(),
                LEGACY_SCAN_PAGE,
            )
            .await
            .map_err(ResolveError::Internal)?;

            if page.is_empty() {
                return Err(ResolveError::Unauthorized);
            }

            for record in &page {
                let stored = match self.decrypt_record(record) {
                    Ok(token) => token,
                    Err(e) => {
                        error!(
                            tenant = %record.tenant_id,
                            error = %e,
                            "legacy credential failed to decrypt during scan"
                        );
                        return Err(ResolveError::Internal(e));
                    }
                };
                if crypto::constant_time_eq(stored.as_bytes(), presented.as_bytes()) {
                    warn!(
                        tenant = %record.tenant_id,
                        "tenant resolved via legacy scan -- run the fingerprint backfill"
                    );
                    return Ok(record.tenant_id.clone());
                }
            }

            after = page.last().map(|r| r.tenant_id.clone());
        }
    }
}
