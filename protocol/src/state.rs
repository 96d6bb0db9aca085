// Copyright (c) 2024 Botho Foundation

//! Persisted entities.

use nuoi_common::{Amount, UnixTimestamp};
use nuoi_crypto_keys::Pubkey;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{params::MAX_REF_LEN, ProtocolError, Vault};

/// Opaque content reference (IPFS CID, URL, content hash).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentRef(String);

impl ContentRef {
    /// Wrap `value`, rejecting anything longer than [`MAX_REF_LEN`] bytes.
    pub fn new(field: &'static str, value: impl Into<String>) -> Result<Self, ProtocolError> {
        let content = Self(value.into());
        content.check(field)?;
        Ok(content)
    }

    /// Length check, for refs that arrived already deserialized.
    pub fn check(&self, field: &'static str) -> Result<(), ProtocolError> {
        if self.0.len() > MAX_REF_LEN {
            return Err(ProtocolError::RefTooLong {
                field,
                len: self.0.len(),
                max: MAX_REF_LEN,
            });
        }
        Ok(())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CampaignStatus {
    Active,
    Successful,
    Expired,
    Refunding,
    Closed,
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CampaignStatus::Active => "active",
            CampaignStatus::Successful => "successful",
            CampaignStatus::Expired => "expired",
            CampaignStatus::Refunding => "refunding",
            CampaignStatus::Closed => "closed",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for CampaignStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "active" => Ok(CampaignStatus::Active),
            "successful" => Ok(CampaignStatus::Successful),
            "expired" => Ok(CampaignStatus::Expired),
            "refunding" => Ok(CampaignStatus::Refunding),
            "closed" => Ok(CampaignStatus::Closed),
            other => Err(format!("unknown campaign status: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    pub creator: Pubkey,
    /// Caller-chosen nonce, unique per creator.
    pub campaign_id: u64,
    pub goal_amount: Amount,
    pub total_raised: Amount,
    pub deadline: UnixTimestamp,
    pub metadata_ref: ContentRef,
    /// Last status written by a mutation. Use [`crate::derive_status`] to act.
    pub status: CampaignStatus,
    pub created_at: UnixTimestamp,
    pub last_action_at: UnixTimestamp,
    pub next_withdraw_index: u32,
    /// Zero until the goal is first met.
    pub goal_reached_at: UnixTimestamp,
    pub donor_count: u32,
    pub refunded_count: u32,
    /// Sum of recorded amounts of refunded donations.
    pub refunded_stake: Amount,
    pub bump: u8,
    pub vault_bump: u8,
}

impl Campaign {
    pub fn goal_reached(&self) -> bool {
        self.total_raised >= self.goal_amount
    }

    /// Index of the most recent withdrawal request, if any was made.
    pub fn latest_request_index(&self) -> Option<u32> {
        self.next_withdraw_index.checked_sub(1)
    }

    /// Stake of donors that have not been refunded yet.
    pub fn outstanding_stake(&self) -> Amount {
        self.total_raised.saturating_sub(self.refunded_stake)
    }

    pub fn all_refunded(&self) -> bool {
        self.donor_count > 0 && self.refunded_count >= self.donor_count
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationRecord {
    pub campaign: Pubkey,
    pub donor: Pubkey,
    /// Cumulative contribution. Vote weight and refund basis.
    pub amount: Amount,
    pub refunded: bool,
    /// What was actually paid back.
    pub refunded_amount: Amount,
    pub last_donated_at: UnixTimestamp,
    pub bump: u8,
}

/// Where a withdrawal request stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestState {
    Open,
    Approved,
    Rejected,
    Executed,
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestState::Open => "open",
            RequestState::Approved => "approved",
            RequestState::Rejected => "rejected",
            RequestState::Executed => "executed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawRequest {
    pub campaign: Pubkey,
    pub request_index: u32,
    pub amount: Amount,
    pub evidence_ref: ContentRef,
    pub vote_start: UnixTimestamp,
    pub vote_end: UnixTimestamp,
    pub approve_weight: Amount,
    pub reject_weight: Amount,
    pub voter_count: u32,
    pub finalized: bool,
    pub approved: bool,
    pub executed: bool,
    pub finalized_at: UnixTimestamp,
    pub executed_at: UnixTimestamp,
    pub bump: u8,
}

impl WithdrawRequest {
    pub fn state(&self) -> RequestState {
        match (self.finalized, self.approved, self.executed) {
            (false, _, _) => RequestState::Open,
            (true, true, true) => RequestState::Executed,
            (true, true, false) => RequestState::Approved,
            (true, false, _) => RequestState::Rejected,
        }
    }

    /// A new request may follow this one.
    pub fn is_settled(&self) -> bool {
        matches!(self.state(), RequestState::Rejected | RequestState::Executed)
    }

    pub fn in_vote_window(&self, now: UnixTimestamp) -> bool {
        now >= self.vote_start && now <= self.vote_end
    }

    pub fn total_weight(&self) -> Amount {
        self.approve_weight.saturating_add(self.reject_weight)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoteChoice {
    Approve,
    Reject,
}

impl fmt::Display for VoteChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoteChoice::Approve => f.write_str("approve"),
            VoteChoice::Reject => f.write_str("reject"),
        }
    }
}

impl std::str::FromStr for VoteChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "approve" | "yes" => Ok(VoteChoice::Approve),
            "reject" | "no" => Ok(VoteChoice::Reject),
            other => Err(format!("unknown vote choice: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub request: Pubkey,
    pub voter: Pubkey,
    pub choice: VoteChoice,
    /// Donation amount at the time of the vote.
    pub weight_used: Amount,
    pub voted_at: UnixTimestamp,
}

/// Marker left by an applied signed instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub signer: Pubkey,
    pub applied_at: UnixTimestamp,
}

/// Everything that can live at an address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Account {
    Campaign(Campaign),
    Vault(Vault),
    Donation(DonationRecord),
    Withdraw(WithdrawRequest),
    Vote(VoteRecord),
    Receipt(Receipt),
}

impl Account {
    pub fn kind(&self) -> &'static str {
        match self {
            Account::Campaign(_) => "campaign",
            Account::Vault(_) => "vault",
            Account::Donation(_) => "donation",
            Account::Withdraw(_) => "withdraw",
            Account::Vote(_) => "vote",
            Account::Receipt(_) => "receipt",
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        bincode::serialize(self).map_err(|e| ProtocolError::Encoding(e.to_string()))
    }

    pub fn decode(address: &Pubkey, bytes: &[u8]) -> Result<Self, ProtocolError> {
        bincode::deserialize(bytes).map_err(|e| ProtocolError::Corrupt {
            address: *address,
            reason: e.to_string(),
        })
    }
}
