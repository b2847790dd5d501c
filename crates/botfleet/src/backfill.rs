// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fingerprint backfill command.
//!
//! Invoked out-of-band by ops tooling; not part of the request path.

use botfleet_core::BotfleetError;
use botfleet_vault::CredentialVault;

pub async fn run(
    vault: &CredentialVault,
    batch_size: u32,
    one_batch: bool,
) -> Result<(), BotfleetError> {
    let report = if one_batch {
        botfleet_vault::backfill_batch(vault, batch_size).await?
    } else {
        botfleet_vault::backfill_all(vault, batch_size).await?
    };

    println!("migrated:  {}", report.migrated);
    println!("conflicts: {}", report.conflicts.len());
    println!("remaining: {}", report.remaining);

    if !report.conflicts.is_empty() {
        println!();
        println!("tenants whose token digest is already registered to another tenant:");
        for tenant_id in &report.conflicts {
            println!("  {tenant_id}");
        }
        println!("these rows stay on the legacy lookup path until re-issued");
    }

    Ok(())
}
