// Copyright (c) 2024 Botho Foundation

use nuoi_common::Amount;
use nuoi_crypto_keys::Pubkey;
use tracing::{debug, info};

use super::lifecycle::touch;
use crate::{
    derive_status, Account, CampaignStatus, Custody, DonationRecord, InstructionContext,
    ProtocolError, TransferKind,
};

/// Move `amount` from the signer into the campaign vault and credit their
/// cumulative stake.
pub(super) fn record_donation(
    ctx: &mut InstructionContext<'_>,
    campaign_address: &Pubkey,
    amount: Amount,
) -> Result<(), ProtocolError> {
    let now = ctx.now();
    let donor = *ctx.signer();
    let mut campaign = ctx.campaign(campaign_address)?;

    match derive_status(&campaign, now) {
        CampaignStatus::Active => {}
        CampaignStatus::Expired => {
            return Err(ProtocolError::DeadlinePassed {
                campaign: *campaign_address,
                deadline: campaign.deadline,
                now,
            })
        }
        actual => {
            return Err(ProtocolError::WrongStatus {
                campaign: *campaign_address,
                required: "active",
                actual,
            })
        }
    }

    let vault_address = ctx.deriver().vault(campaign_address)?.address;
    let mut vault = ctx.vault(&vault_address)?;
    let donation = ctx.deriver().donation(campaign_address, &donor)?;

    let mut record = match ctx.find_donation(&donation.address)? {
        Some(record) => record,
        None => {
            campaign.donor_count = campaign
                .donor_count
                .checked_add(1)
                .ok_or(ProtocolError::Overflow { what: "donor count" })?;
            DonationRecord {
                campaign: *campaign_address,
                donor,
                amount: 0,
                refunded: false,
                refunded_amount: 0,
                last_donated_at: now,
                bump: donation.bump,
            }
        }
    };
    record.amount = record
        .amount
        .checked_add(amount)
        .ok_or(ProtocolError::Overflow { what: "donation amount" })?;
    record.last_donated_at = now;

    let was_reached = campaign.goal_reached();
    campaign.total_raised = campaign
        .total_raised
        .checked_add(amount)
        .ok_or(ProtocolError::Overflow { what: "total raised" })?;
    if !was_reached && campaign.goal_reached() {
        campaign.goal_reached_at = now;
        info!(
            campaign = %campaign_address,
            total_raised = campaign.total_raised,
            goal_amount = campaign.goal_amount,
            "Campaign goal reached"
        );
    }
    touch(&mut campaign, now);

    vault.deposit_donation(amount)?;
    ctx.record_transfer(TransferKind::Donation, donor, vault_address, amount);

    debug!(
        campaign = %campaign_address,
        donor = %donor,
        amount,
        stake = record.amount,
        "Donation recorded"
    );

    ctx.store(*campaign_address, Account::Campaign(campaign))?;
    ctx.store(vault_address, Account::Vault(vault))?;
    ctx.store(donation.address, Account::Donation(record))?;
    Ok(())
}
