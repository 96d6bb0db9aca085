// Copyright (c) 2024 Botho Foundation

use nuoi_common::{Amount, UnixTimestamp};
use nuoi_crypto_keys::Pubkey;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

use crate::{
    derive_status, Account, Campaign, CampaignStatus, Custody, DonationRecord, InstructionContext,
    ProtocolError, RequestState, TransferKind, WithdrawRequest, INACTIVITY_REFUND_SECS,
    UNEXECUTED_REFUND_SECS,
};

/// Grounds on which a donor may take their stake back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RefundReason {
    /// Deadline passed with the goal unmet.
    GoalMissed,
    /// The campaign already entered refunding.
    CampaignRefunding,
    /// Goal met but the creator never requested a withdrawal.
    CreatorInactive,
    /// Donors voted the latest request down.
    RequestRejected,
    /// The latest request was approved but the creator did not execute it.
    ApprovedNotExecuted,
}

impl fmt::Display for RefundReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RefundReason::GoalMissed => "campaign expired without reaching its goal",
            RefundReason::CampaignRefunding => "campaign is refunding",
            RefundReason::CreatorInactive => {
                "creator made no withdrawal request after the goal was reached"
            }
            RefundReason::RequestRejected => "latest withdrawal request was rejected",
            RefundReason::ApprovedNotExecuted => {
                "latest withdrawal request was approved but not executed in time"
            }
        };
        f.write_str(text)
    }
}

/// Every reason that currently holds. Empty means not refundable.
///
/// `latest` must be the campaign's most recent request; passing `None`
/// while one exists only hides the request-based reasons.
pub fn refund_reasons(
    campaign: &Campaign,
    latest: Option<&WithdrawRequest>,
    now: UnixTimestamp,
) -> Vec<RefundReason> {
    let mut reasons = Vec::new();

    if now >= campaign.deadline && !campaign.goal_reached() {
        reasons.push(RefundReason::GoalMissed);
    }
    if campaign.status == CampaignStatus::Refunding {
        reasons.push(RefundReason::CampaignRefunding);
    }
    if campaign.goal_reached()
        && campaign.next_withdraw_index == 0
        && now.saturating_sub(campaign.goal_reached_at) >= INACTIVITY_REFUND_SECS
    {
        reasons.push(RefundReason::CreatorInactive);
    }
    if let Some(request) = latest {
        match request.state() {
            RequestState::Rejected => reasons.push(RefundReason::RequestRejected),
            RequestState::Approved
                if now.saturating_sub(request.finalized_at) >= UNEXECUTED_REFUND_SECS =>
            {
                reasons.push(RefundReason::ApprovedNotExecuted)
            }
            _ => {}
        }
    }

    reasons
}

/// What `donation` is paid on refund given the vault's current balance.
///
/// Every unrefunded donor receives the same fraction of their stake, so the
/// vault covers all of them even after a withdrawal was executed. Before any
/// withdrawal the fraction is one.
pub fn refund_payout(
    campaign: &Campaign,
    vault_balance: Amount,
    donation: &DonationRecord,
) -> Result<Amount, ProtocolError> {
    let outstanding = campaign.outstanding_stake();
    if outstanding == 0 {
        return Ok(0);
    }
    let payout = u128::from(donation.amount) * u128::from(vault_balance) / u128::from(outstanding);
    let payout = Amount::try_from(payout).map_err(|_| ProtocolError::Overflow {
        what: "refund payout",
    })?;
    Ok(payout.min(vault_balance))
}

pub(super) fn claim_refund(
    ctx: &mut InstructionContext<'_>,
    campaign_address: &Pubkey,
    request_address: Option<&Pubkey>,
) -> Result<(), ProtocolError> {
    let now = ctx.now();
    let donor = *ctx.signer();
    let mut campaign = ctx.campaign(campaign_address)?;

    let donation_address = ctx.deriver().donation(campaign_address, &donor)?.address;
    let mut donation = ctx.donation(&donation_address)?;
    if donation.refunded {
        return Err(ProtocolError::AlreadyRefunded {
            campaign: *campaign_address,
            donor,
        });
    }

    let status = derive_status(&campaign, now);
    if status == CampaignStatus::Closed {
        return Err(ProtocolError::WrongStatus {
            campaign: *campaign_address,
            required: "refundable",
            actual: status,
        });
    }

    let latest = match (request_address, campaign.latest_request_index()) {
        (None, _) => None,
        (Some(supplied), None) => {
            return Err(ProtocolError::NotLatestRequest {
                campaign: *campaign_address,
                supplied: *supplied,
                latest: None,
            })
        }
        (Some(supplied), Some(index)) => {
            let latest = ctx.deriver().withdraw(campaign_address, index)?.address;
            if *supplied != latest {
                return Err(ProtocolError::NotLatestRequest {
                    campaign: *campaign_address,
                    supplied: *supplied,
                    latest: Some(latest),
                });
            }
            Some(ctx.withdraw(supplied)?)
        }
    };

    let reasons = refund_reasons(&campaign, latest.as_ref(), now);
    if reasons.is_empty() {
        return Err(ProtocolError::NotRefundable {
            campaign: *campaign_address,
            donor,
        });
    }

    let vault_address = ctx.deriver().vault(campaign_address)?.address;
    let mut vault = ctx.vault(&vault_address)?;
    let payout = refund_payout(&campaign, vault.balance(), &donation)?;
    vault.release_refund(payout)?;
    ctx.record_transfer(TransferKind::Refund, vault_address, donor, payout);

    donation.refunded = true;
    donation.refunded_amount = payout;

    campaign.refunded_count = campaign.refunded_count.saturating_add(1);
    campaign.refunded_stake = campaign
        .refunded_stake
        .checked_add(donation.amount)
        .ok_or(ProtocolError::Overflow {
            what: "refunded stake",
        })?;
    campaign.last_action_at = now;
    campaign.status = if campaign.all_refunded() {
        CampaignStatus::Closed
    } else {
        CampaignStatus::Refunding
    };

    info!(
        campaign = %campaign_address,
        donor = %donor,
        stake = donation.amount,
        payout,
        reason = %reasons[0],
        status = %campaign.status,
        "Refund paid"
    );

    ctx.store(*campaign_address, Account::Campaign(campaign))?;
    ctx.store(vault_address, Account::Vault(vault))?;
    ctx.store(donation_address, Account::Donation(donation))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::*;
    use super::*;
    use crate::{ErrorKind, VoteChoice};
    use nuoi_crypto_keys::Signer;

    const DAY: i64 = 86_400;

    fn refund(h: &mut Harness, donor: &Pubkey) -> Result<(), ProtocolError> {
        let latest = h.campaign().latest_request_index();
        let ix = h.builder.claim_refund(h.campaign, latest).unwrap();
        h.run(donor, &ix).map(|_| ())
    }

    fn settle_request(h: &mut Harness, voter: &Pubkey, index: u32, choice: VoteChoice) {
        let ix = h.builder.vote(h.campaign, index, choice).unwrap();
        h.run(voter, &ix).unwrap();
        h.now = h.request_at(index).vote_end + 1;
        let ix = h.builder.finalize(h.campaign, index).unwrap();
        h.run(voter, &ix).unwrap();
    }

    #[test]
    fn test_goal_missed_refunds_everyone() {
        let mut h = Harness::new();
        let a = Harness::donor(2);
        let b = Harness::donor(3);
        h.donate(&a, 30).unwrap();
        h.donate(&b, 20).unwrap();

        assert!(matches!(
            refund(&mut h, &a),
            Err(ProtocolError::NotRefundable { .. })
        ));

        h.now = DEADLINE;
        assert_eq!(
            refund_reasons(&h.campaign(), None, h.now),
            vec![RefundReason::GoalMissed]
        );

        refund(&mut h, &a).unwrap();
        assert_eq!(h.campaign().status, CampaignStatus::Refunding);
        assert_eq!(h.donation_of(&a).refunded_amount, 30);

        refund(&mut h, &b).unwrap();
        assert_eq!(h.donation_of(&b).refunded_amount, 20);
        assert_eq!(h.vault().balance(), 0);
        assert_eq!(h.campaign().status, CampaignStatus::Closed);
    }

    #[test]
    fn test_no_double_refund() {
        let mut h = Harness::new();
        let a = Harness::donor(2);
        h.donate(&a, 30).unwrap();
        h.donate(&Harness::donor(3), 30).unwrap();
        h.now = DEADLINE;

        refund(&mut h, &a).unwrap();
        let err = refund(&mut h, &a).unwrap_err();
        assert!(matches!(err, ProtocolError::AlreadyRefunded { .. }));
        assert_eq!(err.kind(), ErrorKind::Precondition);
        assert_eq!(h.vault().balance(), 30);
    }

    #[test]
    fn test_non_donor_has_nothing_to_refund() {
        let mut h = Harness::new();
        h.donate(&Harness::donor(2), 30).unwrap();
        h.now = DEADLINE;
        let err = refund(&mut h, &Harness::donor(9)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_creator_inactivity() {
        let mut h = Harness::new();
        let a = Harness::donor(2);
        h.donate(&a, 1_000).unwrap();

        h.now = START + 7 * DAY - 1;
        assert!(refund(&mut h, &a).is_err());

        h.now = START + 7 * DAY;
        refund(&mut h, &a).unwrap();
        assert_eq!(h.donation_of(&a).refunded_amount, 1_000);
    }

    #[test]
    fn test_rejected_request_refunds_immediately() {
        let mut h = Harness::new();
        let a = Harness::donor(2);
        h.donate(&a, 1_000).unwrap();
        h.request(0, 500).unwrap();
        settle_request(&mut h, &a, 0, VoteChoice::Reject);

        assert_eq!(
            refund_reasons(&h.campaign(), Some(&h.request_at(0)), h.now),
            vec![RefundReason::RequestRejected]
        );
        refund(&mut h, &a).unwrap();
        assert_eq!(h.campaign().status, CampaignStatus::Closed);
    }

    #[test]
    fn test_approved_unexecuted_after_grace() {
        let mut h = Harness::new();
        let a = Harness::donor(2);
        h.donate(&a, 1_000).unwrap();
        h.request(0, 500).unwrap();
        settle_request(&mut h, &a, 0, VoteChoice::Approve);

        let finalized_at = h.request_at(0).finalized_at;
        h.now = finalized_at + 3 * DAY - 1;
        assert!(matches!(
            refund(&mut h, &a),
            Err(ProtocolError::NotRefundable { .. })
        ));

        h.now = finalized_at + 3 * DAY;
        refund(&mut h, &a).unwrap();

        // The creator can no longer execute.
        let ix = h.builder.execute(h.campaign, 0).unwrap();
        let creator = h.creator.pubkey();
        assert!(matches!(
            h.run(&creator, &ix),
            Err(ProtocolError::WrongStatus { .. })
        ));
    }

    #[test]
    fn test_stale_request_reference_rejected() {
        let mut h = Harness::new();
        let a = Harness::donor(2);
        h.donate(&a, 1_000).unwrap();
        h.request(0, 100).unwrap();
        settle_request(&mut h, &a, 0, VoteChoice::Reject);
        h.request(1, 100).unwrap();

        let ix = h.builder.claim_refund(h.campaign, Some(0)).unwrap();
        assert!(matches!(
            h.run(&a, &ix),
            Err(ProtocolError::NotLatestRequest { .. })
        ));
    }

    #[test]
    fn test_pro_rata_after_execution() {
        let mut h = Harness::new();
        let a = Harness::donor(2);
        let b = Harness::donor(3);
        let c = Harness::donor(4);
        h.donate(&a, 500).unwrap();
        h.donate(&b, 300).unwrap();
        h.donate(&c, 200).unwrap();

        h.request(0, 400).unwrap();
        settle_request(&mut h, &a, 0, VoteChoice::Approve);
        let ix = h.builder.execute(h.campaign, 0).unwrap();
        let creator = h.creator.pubkey();
        h.run(&creator, &ix).unwrap();
        assert_eq!(h.vault().balance(), 600);

        // Second request gets voted down, opening refunds on 600 of 1000 stake.
        h.request(1, 100).unwrap();
        settle_request(&mut h, &b, 1, VoteChoice::Reject);

        refund(&mut h, &a).unwrap();
        refund(&mut h, &b).unwrap();
        refund(&mut h, &c).unwrap();

        assert_eq!(h.donation_of(&a).refunded_amount, 300);
        assert_eq!(h.donation_of(&b).refunded_amount, 180);
        assert_eq!(h.donation_of(&c).refunded_amount, 120);
        assert_eq!(h.vault().balance(), 0);
        assert_eq!(h.campaign().status, CampaignStatus::Closed);
    }

    #[test]
    fn test_payout_rounding_drains_exactly() {
        let h = Harness::new();
        let mut campaign = h.campaign();
        campaign.total_raised = 3;
        let donation = |amount| DonationRecord {
            campaign: h.campaign,
            donor: Pubkey::default(),
            amount,
            refunded: false,
            refunded_amount: 0,
            last_donated_at: 0,
            bump: 0,
        };

        // Three donors of 1 each, 2 left in the vault. Payouts sum to 2.
        assert_eq!(refund_payout(&campaign, 2, &donation(1)).unwrap(), 0);
        campaign.refunded_stake = 1;
        assert_eq!(refund_payout(&campaign, 2, &donation(1)).unwrap(), 1);
        campaign.refunded_stake = 2;
        assert_eq!(refund_payout(&campaign, 1, &donation(1)).unwrap(), 1);
    }
}
