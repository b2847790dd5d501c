// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Botfleet backend.
//!
//! Provides the shared error enum and the domain types of the credential
//! vault: tenant identity, credential records, fingerprints, and the
//! per-record migration state machine.

pub mod error;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::BotfleetError;
pub use types::{CredentialRecord, CredentialState, Fingerprint, TenantId};
