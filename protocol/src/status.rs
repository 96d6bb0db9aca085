// Copyright (c) 2024 Botho Foundation

use nuoi_common::UnixTimestamp;

use crate::{Campaign, CampaignStatus};

/// Effective status of `campaign` at `now`.
///
/// `Refunding` and `Closed` are only ever entered by a mutation and are
/// taken from the stored field. Everything else follows from the amounts
/// and the deadline, so a stored `Active` that has since expired reads as
/// `Expired` without anyone having to write it.
pub fn derive_status(campaign: &Campaign, now: UnixTimestamp) -> CampaignStatus {
    match campaign.status {
        CampaignStatus::Refunding | CampaignStatus::Closed => campaign.status,
        _ if campaign.goal_reached() => CampaignStatus::Successful,
        _ if now >= campaign.deadline => CampaignStatus::Expired,
        _ => CampaignStatus::Active,
    }
}
