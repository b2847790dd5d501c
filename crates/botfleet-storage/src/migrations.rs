// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded database migrations using refinery.
//!
//! SQL migration files are compiled into the binary at build time via
//! `embed_migrations!`. Migrations run automatically on database open.
//!
//! V1 is the pre-fingerprint credential scheme; V2 adds the nullable
//! `fingerprint` column and its partial unique index. Making the column
//! mandatory is deferred until every deployment's backfill reports zero
//! remaining rows.

use botfleet_core::BotfleetError;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Run all pending migrations against the given connection.
///
/// Refinery tracks applied migrations in its own `refinery_schema_history`
/// table, so reopening an already-migrated database is a no-op.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<(), BotfleetError> {
    embedded::migrations::runner().run(conn).map_err(|e| {
        BotfleetError::Storage {
            source: Box::new(e),
        }
    })?;
    Ok(())
}
