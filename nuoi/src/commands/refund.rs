// Copyright (c) 2024 Botho Foundation

use anyhow::Result;
use nuoi_crypto_keys::Signer;
use std::path::Path;

use super::{parse_pubkey, print_outcome, pubkey_or_wallet, Session};

/// Claim the wallet's refund
pub fn run(config_path: &Path, campaign: &str) -> Result<()> {
    let session = Session::open(config_path)?;
    let keypair = session.keypair()?;
    let campaign = parse_pubkey(campaign, "campaign")?;

    let latest = session
        .runtime
        .campaign(&campaign)?
        .latest_request_index();
    let instruction = session.runtime.builder().claim_refund(campaign, latest)?;
    let outcome = session.submit(&keypair, instruction)?;
    print_outcome(&outcome);

    let donation = session.runtime.donation(&campaign, &keypair.pubkey())?;
    println!();
    println!(
        "Refunded {} of a {} stake",
        donation.refunded_amount, donation.amount
    );

    Ok(())
}

/// Show why a donor can or cannot be refunded right now
pub fn status(config_path: &Path, campaign: &str, donor: Option<&str>) -> Result<()> {
    let session = Session::open(config_path)?;
    let campaign = parse_pubkey(campaign, "campaign")?;
    let donor = pubkey_or_wallet(&session.config, donor, "donor")?;

    let status = session.runtime.refund_status(&campaign, &donor)?;

    println!();
    println!("=== Refund status ===");
    println!("Donor:    {}", donor);
    println!("Stake:    {}", status.donation.amount);
    if status.donation.refunded {
        println!("Already refunded {}", status.donation.refunded_amount);
        return Ok(());
    }

    if status.reasons.is_empty() {
        println!("Not eligible for a refund yet");
    } else {
        println!("Eligible, would pay {}", status.payout);
        for reason in &status.reasons {
            println!("  - {}", reason);
        }
    }

    Ok(())
}
