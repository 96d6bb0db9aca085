// Copyright (c) 2024 Botho Foundation

use anyhow::{Context, Result};
use nuoi_crypto_address::AddressDeriver;
use std::path::Path;

use super::pubkey_or_wallet;
use crate::config::Config;

/// Show the wallet address, and optionally where a campaign would live
pub fn run(config_path: &Path, campaign_id: Option<u64>, creator: Option<&str>) -> Result<()> {
    let config = Config::load(config_path).context("No config found. Run 'nuoi init' first.")?;
    let deriver = AddressDeriver::new(config.program_id()?);

    println!();
    println!("=== Identity ===");
    println!("Program:  {}", deriver.program_id());
    if config.has_wallet() {
        println!("Wallet:   {}", pubkey_or_wallet(&config, None, "wallet")?);
    } else {
        println!("Wallet:   (observer, no signing key)");
    }

    if let Some(id) = campaign_id {
        let creator = pubkey_or_wallet(&config, creator, "creator")?;
        let campaign = deriver.campaign(&creator, id)?;
        let vault = deriver.vault(&campaign.address)?;

        println!();
        println!("=== Campaign {} by {} ===", id, creator);
        println!("Campaign: {} (bump {})", campaign.address, campaign.bump);
        println!("Vault:    {} (bump {})", vault.address, vault.bump);
    }

    Ok(())
}
