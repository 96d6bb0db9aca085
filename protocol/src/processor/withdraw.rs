// Copyright (c) 2024 Botho Foundation

use nuoi_common::{Amount, UnixTimestamp};
use nuoi_crypto_address::Namespace;
use nuoi_crypto_keys::Pubkey;
use tracing::{debug, info};

use super::lifecycle::touch;
use crate::{
    derive_status, Account, Campaign, CampaignStatus, ContentRef, Custody, InstructionContext,
    ProtocolError, TransferKind, VoteChoice, VoteRecord, WithdrawRequest,
};

fn ensure_creator(
    ctx: &InstructionContext<'_>,
    campaign_address: &Pubkey,
    campaign: &Campaign,
) -> Result<(), ProtocolError> {
    if campaign.creator != *ctx.signer() {
        return Err(ProtocolError::NotCreator {
            campaign: *campaign_address,
            signer: *ctx.signer(),
        });
    }
    Ok(())
}

fn ensure_belongs(
    campaign_address: &Pubkey,
    request: &WithdrawRequest,
) -> Result<(), ProtocolError> {
    if request.campaign != *campaign_address {
        return Err(ProtocolError::AddressMismatch {
            namespace: Namespace::Campaign,
            supplied: *campaign_address,
            expected: request.campaign,
        });
    }
    Ok(())
}

/// Open the next withdrawal request and start its vote.
pub(super) fn request_withdraw(
    ctx: &mut InstructionContext<'_>,
    campaign_address: &Pubkey,
    request_index: u32,
    amount: Amount,
    evidence_ref: &ContentRef,
    vote_duration_secs: i64,
) -> Result<(), ProtocolError> {
    let now = ctx.now();
    let mut campaign = ctx.campaign(campaign_address)?;
    ensure_creator(ctx, campaign_address, &campaign)?;

    let status = derive_status(&campaign, now);
    if status != CampaignStatus::Successful {
        return Err(ProtocolError::WrongStatus {
            campaign: *campaign_address,
            required: "successful",
            actual: status,
        });
    }

    if request_index != campaign.next_withdraw_index {
        return Err(ProtocolError::StaleRequestIndex {
            campaign: *campaign_address,
            supplied: request_index,
            expected: campaign.next_withdraw_index,
        });
    }

    if let Some(previous_index) = request_index.checked_sub(1) {
        let previous_address = ctx.deriver().withdraw(campaign_address, previous_index)?.address;
        let previous = ctx.withdraw(&previous_address)?;
        if !previous.is_settled() {
            return Err(ProtocolError::PreviousRequestUnsettled {
                campaign: *campaign_address,
                index: previous_index,
                state: previous.state(),
            });
        }
    }

    let vault_address = ctx.deriver().vault(campaign_address)?.address;
    let available = ctx.vault(&vault_address)?.balance();
    if amount > available {
        return Err(ProtocolError::InsufficientVault {
            campaign: *campaign_address,
            requested: amount,
            available,
        });
    }

    let request = ctx.deriver().withdraw(campaign_address, request_index)?;
    if !ctx.is_vacant(&request.address)? {
        return Err(ProtocolError::StaleRequestIndex {
            campaign: *campaign_address,
            supplied: request_index,
            expected: campaign.next_withdraw_index,
        });
    }

    let duration = ctx.params().vote_duration(vote_duration_secs);
    let vote_end = now
        .checked_add(duration)
        .ok_or(ProtocolError::Overflow { what: "vote end" })?;

    campaign.next_withdraw_index = campaign
        .next_withdraw_index
        .checked_add(1)
        .ok_or(ProtocolError::Overflow {
            what: "withdraw index",
        })?;
    touch(&mut campaign, now);

    let record = WithdrawRequest {
        campaign: *campaign_address,
        request_index,
        amount,
        evidence_ref: evidence_ref.clone(),
        vote_start: now,
        vote_end,
        approve_weight: 0,
        reject_weight: 0,
        voter_count: 0,
        finalized: false,
        approved: false,
        executed: false,
        finalized_at: 0,
        executed_at: 0,
        bump: request.bump,
    };

    info!(
        campaign = %campaign_address,
        request = %request.address,
        request_index,
        amount,
        vote_end,
        "Withdrawal requested"
    );

    ctx.store(*campaign_address, Account::Campaign(campaign))?;
    ctx.store(request.address, Account::Withdraw(record))?;
    Ok(())
}

/// Cast the signer's stake-weighted vote on an open request.
pub(super) fn vote_withdraw(
    ctx: &mut InstructionContext<'_>,
    campaign_address: &Pubkey,
    request_address: &Pubkey,
    choice: VoteChoice,
) -> Result<(), ProtocolError> {
    let now = ctx.now();
    let voter = *ctx.signer();
    let mut request = ctx.withdraw(request_address)?;
    ensure_belongs(campaign_address, &request)?;

    if request.finalized {
        return Err(ProtocolError::AlreadyFinalized {
            request: *request_address,
        });
    }
    if !request.in_vote_window(now) {
        return Err(ProtocolError::OutsideVoteWindow {
            request: *request_address,
            now,
            vote_start: request.vote_start,
            vote_end: request.vote_end,
        });
    }

    let donation_address = ctx.deriver().donation(campaign_address, &voter)?.address;
    let donation = ctx.donation(&donation_address)?;
    if donation.refunded {
        return Err(ProtocolError::AlreadyRefunded {
            campaign: *campaign_address,
            donor: voter,
        });
    }

    let vote_address = ctx.deriver().vote(request_address, &voter)?.address;
    if ctx.find_vote(&vote_address)?.is_some() {
        return Err(ProtocolError::AlreadyVoted {
            request: *request_address,
            voter,
        });
    }

    let weight = donation.amount;
    let tally = match choice {
        VoteChoice::Approve => &mut request.approve_weight,
        VoteChoice::Reject => &mut request.reject_weight,
    };
    *tally = tally
        .checked_add(weight)
        .ok_or(ProtocolError::Overflow { what: "vote tally" })?;
    request.voter_count = request.voter_count.saturating_add(1);

    debug!(
        request = %request_address,
        voter = %voter,
        %choice,
        weight,
        "Vote cast"
    );

    ctx.store(*request_address, Account::Withdraw(request))?;
    ctx.store(
        vote_address,
        Account::Vote(VoteRecord {
            request: *request_address,
            voter,
            choice,
            weight_used: weight,
            voted_at: now,
        }),
    )?;
    Ok(())
}

/// Close the vote. Ties reject.
pub(super) fn finalize_withdraw(
    ctx: &mut InstructionContext<'_>,
    request_address: &Pubkey,
) -> Result<(), ProtocolError> {
    let now = ctx.now();
    let mut request = ctx.withdraw(request_address)?;

    if request.finalized {
        return Err(ProtocolError::AlreadyFinalized {
            request: *request_address,
        });
    }
    if now <= request.vote_end {
        return Err(ProtocolError::VotingStillOpen {
            request: *request_address,
            vote_end: request.vote_end,
            now,
        });
    }

    request.finalized = true;
    request.approved = request.approve_weight > request.reject_weight;
    request.finalized_at = now;

    info!(
        request = %request_address,
        approved = request.approved,
        approve_weight = request.approve_weight,
        reject_weight = request.reject_weight,
        "Withdrawal vote finalized"
    );

    ctx.store(*request_address, Account::Withdraw(request))?;
    Ok(())
}

/// Pay an approved request out of the vault to the creator.
pub(super) fn execute_withdraw(
    ctx: &mut InstructionContext<'_>,
    campaign_address: &Pubkey,
    request_address: &Pubkey,
) -> Result<(), ProtocolError> {
    let now: UnixTimestamp = ctx.now();
    let mut campaign = ctx.campaign(campaign_address)?;
    ensure_creator(ctx, campaign_address, &campaign)?;

    let mut request = ctx.withdraw(request_address)?;
    ensure_belongs(campaign_address, &request)?;

    if !request.finalized {
        return Err(ProtocolError::NotFinalized {
            request: *request_address,
        });
    }
    if request.executed {
        return Err(ProtocolError::AlreadyExecuted {
            request: *request_address,
        });
    }
    if !request.approved {
        return Err(ProtocolError::NotApproved {
            request: *request_address,
        });
    }

    let status = derive_status(&campaign, now);
    if matches!(status, CampaignStatus::Refunding | CampaignStatus::Closed) {
        return Err(ProtocolError::WrongStatus {
            campaign: *campaign_address,
            required: "successful",
            actual: status,
        });
    }

    let vault_address = ctx.deriver().vault(campaign_address)?.address;
    let mut vault = ctx.vault(&vault_address)?;
    if request.amount > vault.balance() {
        return Err(ProtocolError::InsufficientVault {
            campaign: *campaign_address,
            requested: request.amount,
            available: vault.balance(),
        });
    }
    vault.release_withdrawal(request.amount)?;
    ctx.record_transfer(
        TransferKind::Withdrawal,
        vault_address,
        campaign.creator,
        request.amount,
    );

    request.executed = true;
    request.executed_at = now;
    touch(&mut campaign, now);
    if vault.balance() == 0 {
        campaign.status = CampaignStatus::Closed;
    }

    info!(
        campaign = %campaign_address,
        request = %request_address,
        amount = request.amount,
        remaining = vault.balance(),
        status = %campaign.status,
        "Withdrawal executed"
    );

    ctx.store(*campaign_address, Account::Campaign(campaign))?;
    ctx.store(vault_address, Account::Vault(vault))?;
    ctx.store(*request_address, Account::Withdraw(request))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::*;
    use crate::{CampaignStatus, ErrorKind, ProtocolError, RequestState, VoteChoice};
    use nuoi_crypto_keys::{Pubkey, Signer};

    const DAY: i64 = 86_400;

    /// Funded campaign: donor 2 gave 600, donor 3 gave 400.
    fn funded() -> (Harness, Pubkey, Pubkey) {
        let mut h = Harness::new();
        let a = Harness::donor(2);
        let b = Harness::donor(3);
        h.donate(&a, 600).unwrap();
        h.donate(&b, 400).unwrap();
        (h, a, b)
    }

    fn vote(
        h: &mut Harness,
        voter: &Pubkey,
        index: u32,
        choice: VoteChoice,
    ) -> Result<(), ProtocolError> {
        let ix = h.builder.vote(h.campaign, index, choice).unwrap();
        h.run(voter, &ix).map(|_| ())
    }

    fn finalize(h: &mut Harness, index: u32) -> Result<(), ProtocolError> {
        let ix = h.builder.finalize(h.campaign, index).unwrap();
        let anyone = Harness::donor(99);
        h.run(&anyone, &ix).map(|_| ())
    }

    fn execute(h: &mut Harness, index: u32) -> Result<(), ProtocolError> {
        let ix = h.builder.execute(h.campaign, index).unwrap();
        let creator = h.creator.pubkey();
        h.run(&creator, &ix).map(|_| ())
    }

    #[test]
    fn test_request_opens_vote() {
        let (mut h, _, _) = funded();
        h.request(0, 300).unwrap();

        let request = h.request_at(0);
        assert_eq!(request.vote_start, START);
        assert_eq!(request.vote_end, START + 3 * DAY);
        assert_eq!(request.state(), RequestState::Open);
        assert_eq!(h.campaign().next_withdraw_index, 1);
    }

    #[test]
    fn test_request_preconditions() {
        let mut h = Harness::new();
        h.donate(&Harness::donor(2), 10).unwrap();
        assert!(matches!(
            h.request(0, 5),
            Err(ProtocolError::WrongStatus {
                required: "successful",
                ..
            })
        ));

        let (mut h, donor, _) = funded();
        let ix = h
            .builder
            .request_withdraw(h.campaign, 0, 5, Default::default(), 0);
        assert!(matches!(
            h.run(&donor, &ix),
            Err(ProtocolError::NotCreator { .. })
        ));
        assert!(matches!(
            h.request(1, 5),
            Err(ProtocolError::StaleRequestIndex {
                supplied: 1,
                expected: 0,
                ..
            })
        ));
        assert!(matches!(
            h.request(0, 1_001),
            Err(ProtocolError::InsufficientVault { .. })
        ));
    }

    #[test]
    fn test_one_open_request_at_a_time() {
        let (mut h, _, _) = funded();
        h.request(0, 100).unwrap();
        assert!(matches!(
            h.request(1, 100),
            Err(ProtocolError::PreviousRequestUnsettled {
                state: RequestState::Open,
                ..
            })
        ));
        // Stale index after the counter moved.
        assert!(matches!(
            h.request(0, 100),
            Err(ProtocolError::StaleRequestIndex { .. })
        ));
    }

    #[test]
    fn test_non_donor_cannot_vote() {
        let (mut h, _, _) = funded();
        h.request(0, 100).unwrap();
        let err = vote(&mut h, &Harness::donor(50), 0, VoteChoice::Approve).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_second_vote_rejected() {
        let (mut h, a, b) = funded();
        h.request(0, 100).unwrap();
        vote(&mut h, &a, 0, VoteChoice::Approve).unwrap();
        vote(&mut h, &b, 0, VoteChoice::Reject).unwrap();

        let err = vote(&mut h, &a, 0, VoteChoice::Reject).unwrap_err();
        assert!(matches!(err, ProtocolError::AlreadyVoted { .. }));
        assert_eq!(err.kind(), ErrorKind::Precondition);

        let request = h.request_at(0);
        assert_eq!(request.approve_weight, 600);
        assert_eq!(request.reject_weight, 400);
        assert_eq!(request.voter_count, 2);
        assert!(request.total_weight() <= h.campaign().total_raised);
    }

    #[test]
    fn test_vote_outside_window() {
        let (mut h, a, _) = funded();
        h.request(0, 100).unwrap();
        h.now = START + 3 * DAY + 1;
        assert!(matches!(
            vote(&mut h, &a, 0, VoteChoice::Approve),
            Err(ProtocolError::OutsideVoteWindow { .. })
        ));
    }

    #[test]
    fn test_finalize_rules() {
        let (mut h, a, _) = funded();
        h.request(0, 100).unwrap();
        vote(&mut h, &a, 0, VoteChoice::Approve).unwrap();

        h.now = START + 3 * DAY;
        assert!(matches!(
            finalize(&mut h, 0),
            Err(ProtocolError::VotingStillOpen { .. })
        ));

        h.now += 1;
        finalize(&mut h, 0).unwrap();
        let err = finalize(&mut h, 0).unwrap_err();
        assert!(err.to_string().contains("already finalized"));

        let request = h.request_at(0);
        assert!(request.approved);
        assert_eq!(request.finalized_at, START + 3 * DAY + 1);
    }

    #[test]
    fn test_tie_rejects() {
        let mut h = Harness::new();
        let a = Harness::donor(2);
        let b = Harness::donor(3);
        h.donate(&a, 500).unwrap();
        h.donate(&b, 500).unwrap();
        h.request(0, 100).unwrap();
        vote(&mut h, &a, 0, VoteChoice::Approve).unwrap();
        vote(&mut h, &b, 0, VoteChoice::Reject).unwrap();

        h.now += 4 * DAY;
        finalize(&mut h, 0).unwrap();
        assert_eq!(h.request_at(0).state(), RequestState::Rejected);
    }

    #[test]
    fn test_no_votes_rejects() {
        let (mut h, _, _) = funded();
        h.request(0, 100).unwrap();
        h.now += 4 * DAY;
        finalize(&mut h, 0).unwrap();
        assert!(!h.request_at(0).approved);
        assert!(matches!(
            execute(&mut h, 0),
            Err(ProtocolError::NotApproved { .. })
        ));
    }

    #[test]
    fn test_execute_once() {
        let (mut h, a, _) = funded();
        h.request(0, 300).unwrap();
        assert!(matches!(
            execute(&mut h, 0),
            Err(ProtocolError::NotFinalized { .. })
        ));

        vote(&mut h, &a, 0, VoteChoice::Approve).unwrap();
        h.now += 4 * DAY;
        finalize(&mut h, 0).unwrap();

        let before = h.vault().balance();
        execute(&mut h, 0).unwrap();
        assert_eq!(h.vault().balance(), before - 300);
        assert_eq!(h.vault().total_withdrawn(), 300);

        let err = execute(&mut h, 0).unwrap_err();
        assert!(err.to_string().contains("already executed"));
        assert_eq!(h.vault().balance(), before - 300);

        // Executed requests let the next one open.
        h.request(1, 700).unwrap();
    }

    #[test]
    fn test_draining_vault_closes_campaign() {
        let (mut h, a, _) = funded();
        h.request(0, 1_000).unwrap();
        vote(&mut h, &a, 0, VoteChoice::Approve).unwrap();
        h.now += 4 * DAY;
        finalize(&mut h, 0).unwrap();
        execute(&mut h, 0).unwrap();

        assert_eq!(h.vault().balance(), 0);
        assert_eq!(h.campaign().status, CampaignStatus::Closed);
    }

    #[test]
    fn test_only_creator_executes() {
        let (mut h, a, _) = funded();
        h.request(0, 100).unwrap();
        vote(&mut h, &a, 0, VoteChoice::Approve).unwrap();
        h.now += 4 * DAY;
        finalize(&mut h, 0).unwrap();

        let ix = h.builder.execute(h.campaign, 0).unwrap();
        assert!(matches!(
            h.run(&a, &ix),
            Err(ProtocolError::NotCreator { .. })
        ));
    }
}
