// Copyright (c) 2024 Botho Foundation

//! State transitions.
//!
//! Each handler reads accounts from an [`InstructionContext`], checks its
//! preconditions against the effective campaign status, and stages writes.
//! Nothing here touches storage or the clock; the caller decides whether the
//! staged effects commit.

mod donation;
mod lifecycle;
mod refund;
mod withdraw;

pub use refund::{refund_payout, refund_reasons, RefundReason};

use crate::{InstructionContext, Instruction, ProtocolError};

/// Apply `instruction` as signed by `ctx.signer()`.
pub fn process(
    instruction: &Instruction,
    ctx: &mut InstructionContext<'_>,
) -> Result<(), ProtocolError> {
    instruction.validate(ctx.params())?;

    match instruction {
        Instruction::CreateCampaign {
            campaign,
            campaign_id,
            goal_amount,
            deadline,
            metadata_ref,
        } => lifecycle::create_campaign(
            ctx,
            campaign,
            *campaign_id,
            *goal_amount,
            *deadline,
            metadata_ref,
        ),
        Instruction::Donate { campaign, amount } => {
            donation::record_donation(ctx, campaign, *amount)
        }
        Instruction::RequestWithdraw {
            campaign,
            request_index,
            amount,
            evidence_ref,
            vote_duration_secs,
        } => withdraw::request_withdraw(
            ctx,
            campaign,
            *request_index,
            *amount,
            evidence_ref,
            *vote_duration_secs,
        ),
        Instruction::Vote {
            campaign,
            request,
            choice,
        } => withdraw::vote_withdraw(ctx, campaign, request, *choice),
        Instruction::FinalizeWithdraw { request } => withdraw::finalize_withdraw(ctx, request),
        Instruction::ExecuteWithdraw { campaign, request } => {
            withdraw::execute_withdraw(ctx, campaign, request)
        }
        Instruction::ClaimRefund { campaign, request } => {
            refund::claim_refund(ctx, campaign, request.as_ref())
        }
    }
}

#[cfg(test)]
pub(crate) mod test_utils {
    //! Runs instructions against an in-memory account map.

    use nuoi_crypto_address::AddressDeriver;
    use nuoi_crypto_keys::{Keypair, Pubkey, Signer};
    use std::collections::BTreeMap;

    use super::process;
    use crate::{
        Account, Campaign, ContentRef, Effects, Instruction, InstructionBuilder,
        InstructionContext, ProtocolError, ProtocolParams, Vault,
    };

    pub const START: i64 = 1_700_000_000;
    pub const DEADLINE: i64 = START + 10 * 86_400;

    pub struct Harness {
        pub deriver: AddressDeriver,
        pub builder: InstructionBuilder,
        pub params: ProtocolParams,
        pub accounts: BTreeMap<Pubkey, Account>,
        pub now: i64,
        pub creator: Keypair,
        pub campaign: Pubkey,
    }

    impl Harness {
        /// A campaign with goal 1000 and a deadline ten days out.
        pub fn new() -> Self {
            let deriver = AddressDeriver::new(Pubkey::new_from_array([0xAA; 32]));
            let creator = Keypair::from_seed(&[1; 32]);
            let mut harness = Self {
                deriver,
                builder: InstructionBuilder::new(deriver),
                params: ProtocolParams::default(),
                accounts: BTreeMap::new(),
                now: START,
                campaign: Pubkey::default(),
                creator,
            };
            let create = harness
                .builder
                .create_campaign(
                    &harness.creator.pubkey(),
                    1,
                    1_000,
                    DEADLINE,
                    ContentRef::default(),
                )
                .unwrap();
            if let Instruction::CreateCampaign { campaign, .. } = &create {
                harness.campaign = *campaign;
            }
            let creator = harness.creator.pubkey();
            harness.run(&creator, &create).unwrap();
            harness
        }

        pub fn donor(seed: u8) -> Pubkey {
            Keypair::from_seed(&[seed; 32]).pubkey()
        }

        pub fn run(
            &mut self,
            signer: &Pubkey,
            instruction: &Instruction,
        ) -> Result<Effects, ProtocolError> {
            let addresses = instruction.accounts(&self.deriver, signer)?;
            let loaded: Vec<_> = addresses
                .iter()
                .map(|address| (*address, self.accounts.get(address).cloned()))
                .collect();
            let mut ctx =
                InstructionContext::new(*signer, self.now, &self.params, &self.deriver, loaded);
            process(instruction, &mut ctx)?;
            let effects = ctx.into_effects();
            for (address, account) in &effects.writes {
                self.accounts.insert(*address, account.clone());
            }
            Ok(effects)
        }

        pub fn donate(&mut self, donor: &Pubkey, amount: u64) -> Result<Effects, ProtocolError> {
            let ix = self.builder.donate(self.campaign, amount);
            self.run(donor, &ix)
        }

        pub fn request(&mut self, index: u32, amount: u64) -> Result<Effects, ProtocolError> {
            let ix = self
                .builder
                .request_withdraw(self.campaign, index, amount, ContentRef::default(), 0);
            let creator = self.creator.pubkey();
            self.run(&creator, &ix)
        }

        pub fn campaign(&self) -> Campaign {
            match self.accounts.get(&self.campaign) {
                Some(Account::Campaign(c)) => c.clone(),
                other => panic!("no campaign: {other:?}"),
            }
        }

        pub fn vault(&self) -> Vault {
            let address = self.deriver.vault(&self.campaign).unwrap().address;
            match self.accounts.get(&address) {
                Some(Account::Vault(v)) => v.clone(),
                other => panic!("no vault: {other:?}"),
            }
        }

        pub fn request_at(&self, index: u32) -> crate::WithdrawRequest {
            let address = self.deriver.withdraw(&self.campaign, index).unwrap().address;
            match self.accounts.get(&address) {
                Some(Account::Withdraw(r)) => r.clone(),
                other => panic!("no request: {other:?}"),
            }
        }

        pub fn donation_of(&self, donor: &Pubkey) -> crate::DonationRecord {
            let address = self.deriver.donation(&self.campaign, donor).unwrap().address;
            match self.accounts.get(&address) {
                Some(Account::Donation(d)) => d.clone(),
                other => panic!("no donation: {other:?}"),
            }
        }
    }
}
