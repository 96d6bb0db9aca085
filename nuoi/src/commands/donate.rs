// Copyright (c) 2024 Botho Foundation

use anyhow::Result;
use nuoi_crypto_keys::Signer;
use std::path::Path;

use super::{parse_pubkey, print_outcome, Session};

pub fn run(config_path: &Path, campaign: &str, amount: u64) -> Result<()> {
    let session = Session::open(config_path)?;
    let keypair = session.keypair()?;
    let campaign = parse_pubkey(campaign, "campaign")?;

    let instruction = session.runtime.builder().donate(campaign, amount);
    let outcome = session.submit(&keypair, instruction)?;
    print_outcome(&outcome);

    let donation = session.runtime.donation(&campaign, &keypair.pubkey())?;
    let record = session.runtime.campaign(&campaign)?;
    println!();
    println!("Your stake: {}", donation.amount);
    println!("Raised:     {} / {}", record.total_raised, record.goal_amount);

    Ok(())
}
