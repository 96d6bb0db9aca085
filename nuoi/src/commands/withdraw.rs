// Copyright (c) 2024 Botho Foundation

//! Withdrawal requests and their donor vote.

use anyhow::{anyhow, Result};
use nuoi_protocol::VoteChoice;
use std::path::Path;

use super::{parse_pubkey, print_outcome, resolve_content, Session};

pub fn request(
    config_path: &Path,
    campaign: &str,
    amount: u64,
    evidence: Option<&str>,
    evidence_file: Option<&Path>,
    vote_duration_secs: i64,
) -> Result<()> {
    let session = Session::open(config_path)?;
    let keypair = session.keypair()?;
    let campaign = parse_pubkey(campaign, "campaign")?;

    let request_index = session.runtime.campaign(&campaign)?.next_withdraw_index;
    let evidence_ref = resolve_content(config_path, "evidence_ref", evidence, evidence_file)?;

    let instruction = session.runtime.builder().request_withdraw(
        campaign,
        request_index,
        amount,
        evidence_ref,
        vote_duration_secs,
    );
    let outcome = session.submit(&keypair, instruction)?;
    print_outcome(&outcome);

    let view = session.runtime.withdraw_request(&campaign, request_index)?;
    println!();
    println!("Request #{} at {}", request_index, view.address);
    println!(
        "Voting open from {} to {}",
        view.request.vote_start, view.request.vote_end
    );

    Ok(())
}

pub fn vote(config_path: &Path, campaign: &str, index: u32, choice: &str) -> Result<()> {
    let session = Session::open(config_path)?;
    let keypair = session.keypair()?;
    let campaign = parse_pubkey(campaign, "campaign")?;
    let choice: VoteChoice = choice.parse().map_err(|e: String| anyhow!(e))?;

    let instruction = session.runtime.builder().vote(campaign, index, choice)?;
    let outcome = session.submit(&keypair, instruction)?;
    print_outcome(&outcome);

    let view = session.runtime.withdraw_request(&campaign, index)?;
    println!();
    println!(
        "Tally: {} approve / {} reject from {} voters",
        view.request.approve_weight, view.request.reject_weight, view.request.voter_count
    );

    Ok(())
}

pub fn finalize(config_path: &Path, campaign: &str, index: u32) -> Result<()> {
    let session = Session::open(config_path)?;
    let keypair = session.keypair()?;
    let campaign = parse_pubkey(campaign, "campaign")?;

    let instruction = session.runtime.builder().finalize(campaign, index)?;
    let outcome = session.submit(&keypair, instruction)?;
    print_outcome(&outcome);

    let view = session.runtime.withdraw_request(&campaign, index)?;
    println!();
    println!("Request #{} is {}", index, view.state);

    Ok(())
}

pub fn execute(config_path: &Path, campaign: &str, index: u32) -> Result<()> {
    let session = Session::open(config_path)?;
    let keypair = session.keypair()?;
    let campaign = parse_pubkey(campaign, "campaign")?;

    let instruction = session.runtime.builder().execute(campaign, index)?;
    let outcome = session.submit(&keypair, instruction)?;
    print_outcome(&outcome);

    let vault = session.runtime.vault(&campaign)?;
    println!();
    println!("Vault balance: {}", vault.balance());

    Ok(())
}
