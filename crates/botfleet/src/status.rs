// SPDX-FileCopyrightText: 2026 Botfleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vault status command: credential counts and migration state.

use botfleet_core::BotfleetError;
use botfleet_storage::queries::credentials;
use botfleet_vault::CredentialVault;

pub async fn run(vault: &CredentialVault) -> Result<(), BotfleetError> {
    let total = credentials::count_credentials(vault.database()).await?;
    let legacy = credentials::count_unfingerprinted(vault.database()).await?;
    let fingerprinted = total - legacy;

    println!("credentials:   {total}");
    println!("fingerprinted: {fingerprinted}");
    println!("legacy:        {legacy}");

    if legacy == 0 {
        println!("migration:     complete");
    } else {
        println!("migration:     in progress -- run `botfleet backfill`");
    }

    Ok(())
}
