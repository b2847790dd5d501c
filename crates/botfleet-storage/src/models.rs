// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! The canonical types are defined in `botfleet-core::types` for use across
//! crate boundaries. This module re-exports them for convenience within the
//! storage crate, alongside the write-side view.

pub use botfleet_core::types::{CredentialRecord, CredentialState, Fingerprint, TenantId};

pub use crate::queries::credentials::{FingerprintBatchOutcome, NewCredential};
