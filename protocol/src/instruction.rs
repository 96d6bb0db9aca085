// Copyright (c) 2024 Botho Foundation

//! Operations a participant can submit, and their signed envelope.

use nuoi_common::{Amount, UnixTimestamp};
use nuoi_crypto_address::{AddressDeriver, DeriveError};
use nuoi_crypto_keys::{Pubkey, Signature, Signer};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{params::ProtocolParams, ContentRef, ProtocolError, VoteChoice};

/// Domain separator for instruction signatures.
const SIGNING_DOMAIN: &[u8] = b"nuoi-instruction-v1";

/// Domain separator for receipt addresses.
const RECEIPT_DOMAIN: &[u8] = b"nuoi-receipt";

/// One protocol operation. The signer is the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    CreateCampaign {
        campaign: Pubkey,
        campaign_id: u64,
        goal_amount: Amount,
        deadline: UnixTimestamp,
        metadata_ref: ContentRef,
    },
    Donate {
        campaign: Pubkey,
        amount: Amount,
    },
    RequestWithdraw {
        campaign: Pubkey,
        request_index: u32,
        amount: Amount,
        evidence_ref: ContentRef,
        /// `0` selects the protocol default.
        vote_duration_secs: i64,
    },
    Vote {
        campaign: Pubkey,
        request: Pubkey,
        choice: VoteChoice,
    },
    FinalizeWithdraw {
        request: Pubkey,
    },
    ExecuteWithdraw {
        campaign: Pubkey,
        request: Pubkey,
    },
    ClaimRefund {
        campaign: Pubkey,
        /// Latest withdrawal request, when the campaign has one.
        request: Option<Pubkey>,
    },
}

impl Instruction {
    pub fn name(&self) -> &'static str {
        match self {
            Instruction::CreateCampaign { .. } => "create_campaign",
            Instruction::Donate { .. } => "donate",
            Instruction::RequestWithdraw { .. } => "request_withdraw",
            Instruction::Vote { .. } => "vote",
            Instruction::FinalizeWithdraw { .. } => "finalize_withdraw",
            Instruction::ExecuteWithdraw { .. } => "execute_withdraw",
            Instruction::ClaimRefund { .. } => "claim_refund",
        }
    }

    /// Input checks that need no state.
    pub fn validate(&self, params: &ProtocolParams) -> Result<(), ProtocolError> {
        match self {
            Instruction::CreateCampaign {
                goal_amount,
                metadata_ref,
                ..
            } => {
                if *goal_amount == 0 {
                    return Err(ProtocolError::ZeroAmount {
                        field: "goal_amount",
                    });
                }
                metadata_ref.check("metadata_ref")
            }
            Instruction::Donate { amount, .. } => {
                if *amount == 0 {
                    return Err(ProtocolError::ZeroAmount { field: "amount" });
                }
                Ok(())
            }
            Instruction::RequestWithdraw {
                amount,
                evidence_ref,
                vote_duration_secs,
                ..
            } => {
                if *amount == 0 {
                    return Err(ProtocolError::ZeroAmount { field: "amount" });
                }
                evidence_ref.check("evidence_ref")?;
                if *vote_duration_secs < 0 || *vote_duration_secs > params.max_vote_duration_secs
                {
                    return Err(ProtocolError::InvalidVoteDuration {
                        requested: *vote_duration_secs,
                        max: params.max_vote_duration_secs,
                    });
                }
                Ok(())
            }
            Instruction::Vote { .. }
            | Instruction::FinalizeWithdraw { .. }
            | Instruction::ExecuteWithdraw { .. }
            | Instruction::ClaimRefund { .. } => Ok(()),
        }
    }

    /// Every address the instruction reads or writes when signed by `signer`.
    pub fn accounts(
        &self,
        deriver: &AddressDeriver,
        signer: &Pubkey,
    ) -> Result<Vec<Pubkey>, DeriveError> {
        let accounts = match self {
            Instruction::CreateCampaign { campaign, .. } => {
                vec![*campaign, deriver.vault(campaign)?.address]
            }
            Instruction::Donate { campaign, .. } => vec![
                *campaign,
                deriver.vault(campaign)?.address,
                deriver.donation(campaign, signer)?.address,
            ],
            Instruction::RequestWithdraw {
                campaign,
                request_index,
                ..
            } => {
                let mut accounts = vec![
                    *campaign,
                    deriver.vault(campaign)?.address,
                    deriver.withdraw(campaign, *request_index)?.address,
                ];
                if let Some(previous) = request_index.checked_sub(1) {
                    accounts.push(deriver.withdraw(campaign, previous)?.address);
                }
                accounts
            }
            Instruction::Vote {
                campaign, request, ..
            } => vec![
                *request,
                deriver.donation(campaign, signer)?.address,
                deriver.vote(request, signer)?.address,
            ],
            Instruction::FinalizeWithdraw { request } => vec![*request],
            Instruction::ExecuteWithdraw { campaign, request } => {
                vec![*campaign, deriver.vault(campaign)?.address, *request]
            }
            Instruction::ClaimRefund { campaign, request } => {
                let mut accounts = vec![
                    *campaign,
                    deriver.vault(campaign)?.address,
                    deriver.donation(campaign, signer)?.address,
                ];
                accounts.extend(request.iter().copied());
                accounts
            }
        };
        Ok(accounts)
    }
}

/// An instruction authorized by `signer`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedInstruction {
    pub signer: Pubkey,
    pub instruction: Instruction,
    /// Distinguishes otherwise identical submissions.
    pub nonce: u64,
    pub signature: Signature,
}

impl SignedInstruction {
    /// Bytes the signature covers.
    pub fn signing_message(
        program_id: &Pubkey,
        instruction: &Instruction,
        nonce: u64,
    ) -> Result<Vec<u8>, ProtocolError> {
        let body = bincode::serialize(&(instruction, nonce))
            .map_err(|e| ProtocolError::Encoding(e.to_string()))?;
        let mut message = Vec::with_capacity(SIGNING_DOMAIN.len() + 32 + body.len());
        message.extend_from_slice(SIGNING_DOMAIN);
        message.extend_from_slice(program_id.as_ref());
        message.extend_from_slice(&body);
        Ok(message)
    }

    pub fn sign<S: Signer + ?Sized>(
        signer: &S,
        program_id: &Pubkey,
        instruction: Instruction,
        nonce: u64,
    ) -> Result<Self, ProtocolError> {
        let message = Self::signing_message(program_id, &instruction, nonce)?;
        Ok(Self {
            signer: signer.pubkey(),
            signature: signer.sign_message(&message),
            instruction,
            nonce,
        })
    }

    pub fn verify(&self, program_id: &Pubkey) -> Result<(), ProtocolError> {
        let message = Self::signing_message(program_id, &self.instruction, self.nonce)?;
        self.signer
            .verify(&message, &self.signature)
            .map_err(|_| ProtocolError::BadSignature {
                signer: self.signer,
            })
    }

    /// Where the receipt of this submission is recorded once applied.
    pub fn receipt_address(&self) -> Pubkey {
        let mut hasher = Sha256::new();
        hasher.update(RECEIPT_DOMAIN);
        hasher.update(self.signature.as_bytes());
        Pubkey::new_from_array(hasher.finalize().into())
    }
}

/// Builds instructions with derived addresses filled in.
#[derive(Debug, Clone, Copy)]
pub struct InstructionBuilder {
    deriver: AddressDeriver,
}

impl InstructionBuilder {
    pub fn new(deriver: AddressDeriver) -> Self {
        Self { deriver }
    }

    pub fn deriver(&self) -> &AddressDeriver {
        &self.deriver
    }

    pub fn create_campaign(
        &self,
        creator: &Pubkey,
        campaign_id: u64,
        goal_amount: Amount,
        deadline: UnixTimestamp,
        metadata_ref: ContentRef,
    ) -> Result<Instruction, ProtocolError> {
        Ok(Instruction::CreateCampaign {
            campaign: self.deriver.campaign(creator, campaign_id)?.address,
            campaign_id,
            goal_amount,
            deadline,
            metadata_ref,
        })
    }

    pub fn donate(&self, campaign: Pubkey, amount: Amount) -> Instruction {
        Instruction::Donate { campaign, amount }
    }

    pub fn request_withdraw(
        &self,
        campaign: Pubkey,
        request_index: u32,
        amount: Amount,
        evidence_ref: ContentRef,
        vote_duration_secs: i64,
    ) -> Instruction {
        Instruction::RequestWithdraw {
            campaign,
            request_index,
            amount,
            evidence_ref,
            vote_duration_secs,
        }
    }

    pub fn vote(
        &self,
        campaign: Pubkey,
        request_index: u32,
        choice: VoteChoice,
    ) -> Result<Instruction, ProtocolError> {
        Ok(Instruction::Vote {
            campaign,
            request: self.deriver.withdraw(&campaign, request_index)?.address,
            choice,
        })
    }

    pub fn finalize(
        &self,
        campaign: Pubkey,
        request_index: u32,
    ) -> Result<Instruction, ProtocolError> {
        Ok(Instruction::FinalizeWithdraw {
            request: self.deriver.withdraw(&campaign, request_index)?.address,
        })
    }

    pub fn execute(
        &self,
        campaign: Pubkey,
        request_index: u32,
    ) -> Result<Instruction, ProtocolError> {
        Ok(Instruction::ExecuteWithdraw {
            campaign,
            request: self.deriver.withdraw(&campaign, request_index)?.address,
        })
    }

    /// `latest_index` is the campaign's latest request, if it has one.
    pub fn claim_refund(
        &self,
        campaign: Pubkey,
        latest_index: Option<u32>,
    ) -> Result<Instruction, ProtocolError> {
        let request = match latest_index {
            Some(index) => Some(self.deriver.withdraw(&campaign, index)?.address),
            None => None,
        };
        Ok(Instruction::ClaimRefund { campaign, request })
    }
}
