// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query functions over the migrated schema.

pub mod credentials;
pub mod meta;
