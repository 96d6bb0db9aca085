// Copyright (c) 2024 Botho Foundation

use anyhow::{anyhow, Result};
use nuoi_protocol::CampaignStatus;
use nuoi_runtime::CampaignFilter;
use std::path::Path;

use super::{parse_pubkey, Session};

pub fn run(config_path: &Path, creator: Option<&str>, status: Option<&str>) -> Result<()> {
    let session = Session::open(config_path)?;

    let filter = CampaignFilter {
        creator: creator.map(|c| parse_pubkey(c, "creator")).transpose()?,
        status: status
            .map(|s| s.parse::<CampaignStatus>().map_err(|e| anyhow!(e)))
            .transpose()?,
    };
    let campaigns = session.runtime.list_campaigns(&filter)?;

    if campaigns.is_empty() {
        println!("No campaigns found");
        return Ok(());
    }

    println!();
    println!("=== Campaigns ===");
    for (address, campaign) in &campaigns {
        println!(
            "{}  {:<10} {:>12} / {:<12} donors {:<4} deadline {}",
            address,
            campaign.status.to_string(),
            campaign.total_raised,
            campaign.goal_amount,
            campaign.donor_count,
            campaign.deadline
        );
    }
    println!();
    println!("{} campaign(s)", campaigns.len());

    Ok(())
}
