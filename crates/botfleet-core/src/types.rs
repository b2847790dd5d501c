// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types for the credential vault.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Opaque, stable identifier of an onboarded tenant.
///
/// Owned by the tenant-management collaborator; the vault treats it as an
/// immutable foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TenantId(pub String);

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TenantId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Non-secret SHA-256 digest of a plaintext credential, lowercase hex.
///
/// Used only as an index key; it never exposes the credential and is safe
/// to store and compare in queries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(pub String);

impl Fingerprint {
    /// Short prefix for log lines. Never log the full digest next to a
    /// tenant id in webhook-path logs.
    pub fn prefix(&self) -> &str {
        &self.0[..8.min(self.0.len())]
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of a credential record.
///
/// `Created -> Migrating (fingerprint NULL) -> Fingerprinted`. Rotation
/// recomputes ciphertext and fingerprint atomically and stays
/// `Fingerprinted`; nothing else moves a record back to `Migrating`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
pub enum CredentialState {
    /// Pre-fingerprint row awaiting backfill; resolvable only via the
    /// legacy decrypt-scan.
    Migrating,
    /// Fingerprint present; resolvable via the O(1) index path.
    Fingerprinted,
}

/// One stored credential, one per tenant.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    pub tenant_id: TenantId,
    /// AES-256-GCM output including the 16-byte tag. Opaque; never compared
    /// directly.
    pub ciphertext: Vec<u8>,
    /// 96-bit GCM nonce generated fresh at seal time.
    pub nonce: Vec<u8>,
    /// NULL only for rows created before the fingerprint scheme, until
    /// backfill reaches them.
    pub fingerprint: Option<Fingerprint>,
    pub created_at: String,
    pub rotated_at: String,
}

impl CredentialRecord {
    pub fn state(&self) -> CredentialState {
        if self.fingerprint.is_some() {
            CredentialState::Fingerprinted
        } else {
            CredentialState::Migrating
        }
    }
}

impl std::fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("tenant_id", &self.tenant_id)
            .field("ciphertext", &format!("[{} bytes]", self.ciphertext.len()))
            .field("nonce", &format!("[{} bytes]", self.nonce.len()))
            .field("fingerprint", &self.fingerprint)
            .field("created_at", &self.created_at)
            .field("rotated_at", &self.rotated_at)
            .finish()
    }
}
