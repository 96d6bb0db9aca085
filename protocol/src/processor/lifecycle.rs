// Copyright (c) 2024 Botho Foundation

use nuoi_common::{Amount, UnixTimestamp};
use nuoi_crypto_address::Namespace;
use nuoi_crypto_keys::Pubkey;
use tracing::info;

use crate::{
    derive_status, Account, Campaign, CampaignStatus, ContentRef, InstructionContext,
    ProtocolError, Vault,
};

pub(super) fn create_campaign(
    ctx: &mut InstructionContext<'_>,
    campaign_address: &Pubkey,
    campaign_id: u64,
    goal_amount: Amount,
    deadline: UnixTimestamp,
    metadata_ref: &ContentRef,
) -> Result<(), ProtocolError> {
    let now = ctx.now();
    if deadline <= now {
        return Err(ProtocolError::DeadlineNotInFuture { deadline, now });
    }

    let creator = *ctx.signer();
    let derived = ctx.deriver().campaign(&creator, campaign_id)?;
    if derived.address != *campaign_address {
        return Err(ProtocolError::AddressMismatch {
            namespace: Namespace::Campaign,
            supplied: *campaign_address,
            expected: derived.address,
        });
    }
    let vault = ctx.deriver().vault(campaign_address)?;

    if !ctx.is_vacant(campaign_address)? || !ctx.is_vacant(&vault.address)? {
        return Err(ProtocolError::CampaignExists {
            campaign: *campaign_address,
        });
    }

    let campaign = Campaign {
        creator,
        campaign_id,
        goal_amount,
        total_raised: 0,
        deadline,
        metadata_ref: metadata_ref.clone(),
        status: CampaignStatus::Active,
        created_at: now,
        last_action_at: now,
        next_withdraw_index: 0,
        goal_reached_at: 0,
        donor_count: 0,
        refunded_count: 0,
        refunded_stake: 0,
        bump: derived.bump,
        vault_bump: vault.bump,
    };

    ctx.store(*campaign_address, Account::Campaign(campaign))?;
    ctx.store(vault.address, Account::Vault(Vault::new(*campaign_address, vault.bump)))?;

    info!(
        campaign = %campaign_address,
        creator = %creator,
        campaign_id,
        goal_amount,
        deadline,
        "Campaign created"
    );
    Ok(())
}

/// Write back the effective status and mark activity.
pub(super) fn touch(campaign: &mut Campaign, now: UnixTimestamp) {
    campaign.status = derive_status(campaign, now);
    campaign.last_action_at = now;
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::*;
    use crate::{CampaignStatus, ContentRef, Instruction, ProtocolError};
    use nuoi_crypto_keys::{Pubkey, Signer};

    #[test]
    fn test_create_campaign() {
        let h = Harness::new();
        let campaign = h.campaign();
        assert_eq!(campaign.creator, h.creator.pubkey());
        assert_eq!(campaign.status, CampaignStatus::Active);
        assert_eq!(campaign.next_withdraw_index, 0);
        assert_eq!(campaign.created_at, START);
        assert_eq!(h.vault().balance(), 0);
        assert_eq!(h.vault().campaign(), &h.campaign);
    }

    #[test]
    fn test_create_twice_fails() {
        let mut h = Harness::new();
        let creator = h.creator.pubkey();
        let ix = h
            .builder
            .create_campaign(&creator, 1, 50, DEADLINE, ContentRef::default())
            .unwrap();
        assert_eq!(
            h.run(&creator, &ix).unwrap_err(),
            ProtocolError::CampaignExists { campaign: h.campaign }
        );
    }

    #[test]
    fn test_create_validation() {
        let mut h = Harness::new();
        let creator = h.creator.pubkey();

        let zero_goal = h
            .builder
            .create_campaign(&creator, 2, 0, DEADLINE, ContentRef::default())
            .unwrap();
        assert_eq!(
            h.run(&creator, &zero_goal).unwrap_err(),
            ProtocolError::ZeroAmount {
                field: "goal_amount"
            }
        );

        let past = h
            .builder
            .create_campaign(&creator, 2, 10, START, ContentRef::default())
            .unwrap();
        assert!(matches!(
            h.run(&creator, &past),
            Err(ProtocolError::DeadlineNotInFuture { .. })
        ));
    }

    #[test]
    fn test_create_for_someone_else_fails() {
        let mut h = Harness::new();
        let creator = h.creator.pubkey();
        let ix = h
            .builder
            .create_campaign(&creator, 9, 10, DEADLINE, ContentRef::default())
            .unwrap();

        // Address derived from the creator, signed by another identity.
        let other: Pubkey = Harness::donor(77);
        assert!(matches!(
            h.run(&other, &ix),
            Err(ProtocolError::AddressMismatch { .. })
        ));
        assert!(matches!(ix, Instruction::CreateCampaign { .. }));
    }
}
