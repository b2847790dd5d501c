// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Encrypted credential vault for the Botfleet backend.
//!
//! Stores each tenant's bot token AES-256-GCM-encrypted under a
//! process-wide master key, and resolves an inbound webhook's bearer token
//! to its tenant through a non-secret SHA-256 fingerprint index: one point
//! read, then one decrypt-and-compare of the single matched row. That
//! two-stage shape is the reason this subsystem exists -- no
//! decrypt-every-row scan on the request path, and no trust in the index
//! without a real decrypt behind it.
//!
//! The master key is wrapped by an Argon2id-derived key from the operator
//! passphrase; rows that predate the fingerprint column are migrated by the
//! batched [`backfill`] driver and remain resolvable through a legacy scan
//! until then.

pub mod backfill;
pub mod crypto;
pub mod fingerprint;
pub mod kdf;
pub mod master;
pub mod prompt;
pub mod resolve;
pub mod store;

pub use backfill::{backfill_all, backfill_batch, BackfillReport};
pub use crypto::Cipher;
pub use master::{unlock_or_create, vault_initialized};
pub use prompt::get_vault_passphrase;
pub use resolve::ResolveError;
pub use store::{mask_token, CredentialVault};
