// Copyright (c) 2024 Botho Foundation

use anyhow::{anyhow, Result};
use nuoi_common::{UnixTimestamp, SECONDS_PER_DAY};
use nuoi_crypto_keys::Signer;
use std::path::Path;

use super::{print_outcome, resolve_content, Session};

/// Days to the deadline when neither `--days` nor `--deadline` is given.
const DEFAULT_CAMPAIGN_DAYS: u32 = 30;

pub fn run(
    config_path: &Path,
    campaign_id: u64,
    goal: u64,
    days: Option<u32>,
    deadline: Option<UnixTimestamp>,
    metadata: Option<&str>,
    metadata_file: Option<&Path>,
) -> Result<()> {
    let session = Session::open(config_path)?;
    let keypair = session.keypair()?;
    let now = session.runtime.now();

    let deadline = match deadline {
        Some(deadline) => deadline,
        None => {
            let days = i64::from(days.unwrap_or(DEFAULT_CAMPAIGN_DAYS));
            now.checked_add(days * SECONDS_PER_DAY)
                .ok_or_else(|| anyhow!("Deadline out of range"))?
        }
    };
    let metadata_ref = resolve_content(config_path, "metadata_ref", metadata, metadata_file)?;

    let instruction = session.runtime.builder().create_campaign(
        &keypair.pubkey(),
        campaign_id,
        goal,
        deadline,
        metadata_ref,
    )?;
    let outcome = session.submit(&keypair, instruction)?;
    print_outcome(&outcome);

    let campaign = session
        .runtime
        .deriver()
        .campaign(&keypair.pubkey(), campaign_id)?;
    let vault = session.runtime.deriver().vault(&campaign.address)?;
    println!();
    println!("Campaign: {}", campaign.address);
    println!("Vault:    {}", vault.address);
    println!("Goal:     {}", goal);
    println!("Deadline: {}", deadline);

    Ok(())
}
