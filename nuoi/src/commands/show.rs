// Copyright (c) 2024 Botho Foundation

use anyhow::{Context, Result};
use nuoi_crypto_keys::{Pubkey, Signer};
use nuoi_runtime::{CampaignOverview, RequestView};
use serde::Serialize;
use std::path::Path;

use super::{parse_pubkey, Session};

#[derive(Serialize)]
struct ShowOutput<'a> {
    overview: &'a CampaignOverview,
    requests: &'a [RequestView],
}

pub fn run(config_path: &Path, campaign: &str, json: bool) -> Result<()> {
    let session = Session::open(config_path)?;
    let campaign = parse_pubkey(campaign, "campaign")?;

    let viewer: Option<Pubkey> = if session.config.has_wallet() {
        Some(session.keypair()?.pubkey())
    } else {
        None
    };
    let overview = session.runtime.overview(&campaign, viewer.as_ref())?;
    let requests = session.runtime.requests(&campaign)?;

    if json {
        let output = ShowOutput {
            overview: &overview,
            requests: &requests,
        };
        let text = serde_json::to_string_pretty(&output).context("Failed to encode JSON")?;
        println!("{}", text);
        return Ok(());
    }

    let record = &overview.campaign;
    println!();
    println!("=== Campaign {} ===", overview.address);
    println!("Creator:    {}", record.creator);
    println!("Status:     {}", overview.status);
    println!("Raised:     {} / {}", record.total_raised, record.goal_amount);
    println!("Donors:     {} ({} refunded)", record.donor_count, record.refunded_count);
    println!("Deadline:   {}", record.deadline);
    println!("Vault:      {} holding {}", overview.vault, overview.vault_balance);
    if !record.metadata_ref.is_empty() {
        println!("Metadata:   {}", record.metadata_ref);
    }

    if !requests.is_empty() {
        println!();
        println!("=== Withdrawal requests ===");
        for view in &requests {
            let request = &view.request;
            println!(
                "#{:<3} {:>12} {:<9} approve {} / reject {} ({} voters), voting {}..{}",
                request.request_index,
                request.amount,
                view.state.to_string(),
                request.approve_weight,
                request.reject_weight,
                request.voter_count,
                request.vote_start,
                request.vote_end
            );
        }
    }

    println!();
    if overview.actions.is_empty() {
        println!("No actions available");
    } else {
        let actions: Vec<String> = overview.actions.iter().map(|a| a.to_string()).collect();
        println!("Available actions: {}", actions.join(", "));
    }

    Ok(())
}
