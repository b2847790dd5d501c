// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Botfleet backend.

use thiserror::Error;

/// The primary error type used across the Botfleet workspace.
#[derive(Debug, Error)]
pub enum BotfleetError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, migration failure).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Vault operation errors (key setup, corrupted metadata, bad input).
    #[error("vault error: {0}")]
    Vault(String),

    /// Another tenant already owns a credential with this exact value.
    ///
    /// Raised by the unique index on `credentials.fingerprint`; the caller
    /// must not retry-overwrite.
    #[error("credential fingerprint already registered to another tenant")]
    DuplicateFingerprint,

    /// Authenticated decryption failed: wrong master key or tampered ciphertext.
    ///
    /// Always an operational fault, never recoverable client input.
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// A fingerprint-index hit whose decrypted credential differs from the
    /// presented token. Cryptographically near-impossible; treated as an alarm.
    #[error("fingerprint matched but decrypted credential differs (tenant {tenant_id})")]
    FingerprintMismatch { tenant_id: String },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
