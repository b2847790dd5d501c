// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Botfleet credential vault.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a
//! single-writer concurrency model via `tokio-rusqlite`, and typed query
//! functions for the credentials table and vault metadata.
//!
//! All writes are serialized through one background connection thread; the
//! `Database` struct IS the single writer. Query modules accept `&Database`
//! and go through `conn.call()`. Do not open additional write connections.

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use database::Database;
pub use models::*;
