// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential fingerprinting.
//!
//! The fingerprint is the lowercase-hex SHA-256 of the plaintext token. It
//! is deterministic and process-independent, which is what makes it usable
//! as an index key: the webhook path digests the presented token and does a
//! single point lookup instead of decrypting every stored credential.
//!
//! The digest is intentionally NOT a secret. A cryptographic hash is still
//! required -- the column is stored and queryable, so preimage and
//! collision resistance are what keep it from leaking anything about the
//! token. Possession of a fingerprint alone is never sufficient to
//! impersonate a tenant; resolution always decrypts and compares the one
//! matched candidate.

use botfleet_core::Fingerprint;
use sha2::{Digest, Sha256};

/// Length of a fingerprint in hex characters (SHA-256).
pub const DIGEST_HEX_LEN: usize = 64;

/// Compute the fingerprint of a plaintext credential.
pub fn digest(token: &str) -> Fingerprint {
    Fingerprint(hex::encode(Sha256::digest(token.as_bytes())))
}
