// Copyright (c) 2024 Botho Foundation

use nuoi_common::{Amount, UnixTimestamp};
use nuoi_crypto_address::{DeriveError, Namespace};
use nuoi_crypto_keys::Pubkey;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::state::{CampaignStatus, RequestState};

/// Broad classes of failure callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Malformed input, rejected before any state is read.
    Validation,
    /// The entity exists but is not in the required state.
    Precondition,
    /// Nothing lives at the derived address.
    NotFound,
    /// The store could not be reached. Safe to retry.
    Transport,
    /// Broken configuration or corrupt state. Not retryable.
    Fatal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Precondition => "precondition",
            ErrorKind::NotFound => "not found",
            ErrorKind::Transport => "transport",
            ErrorKind::Fatal => "fatal",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    // Validation
    #[error("{field} must be greater than zero")]
    ZeroAmount { field: &'static str },

    #[error("{field} is {len} bytes (max {max})")]
    RefTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("Deadline {deadline} is not after the current time {now}")]
    DeadlineNotInFuture {
        deadline: UnixTimestamp,
        now: UnixTimestamp,
    },

    #[error("Vote duration {requested}s is outside 0..={max}s")]
    InvalidVoteDuration { requested: i64, max: i64 },

    #[error("Supplied {namespace} address {supplied} does not match derived address {expected}")]
    AddressMismatch {
        namespace: Namespace,
        supplied: Pubkey,
        expected: Pubkey,
    },

    #[error("Signature by {signer} does not verify")]
    BadSignature { signer: Pubkey },

    // Precondition
    #[error("{signer} is not the creator of campaign {campaign}")]
    NotCreator { campaign: Pubkey, signer: Pubkey },

    #[error("Campaign {campaign} already exists")]
    CampaignExists { campaign: Pubkey },

    #[error("Campaign {campaign} is {actual}, requires {required}")]
    WrongStatus {
        campaign: Pubkey,
        required: &'static str,
        actual: CampaignStatus,
    },

    #[error("Campaign {campaign} deadline {deadline} has passed (now {now})")]
    DeadlinePassed {
        campaign: Pubkey,
        deadline: UnixTimestamp,
        now: UnixTimestamp,
    },

    #[error("Vault of campaign {campaign} holds {available}, requested {requested}")]
    InsufficientVault {
        campaign: Pubkey,
        requested: Amount,
        available: Amount,
    },

    #[error("Request index {supplied} for campaign {campaign} is stale, next is {expected}")]
    StaleRequestIndex {
        campaign: Pubkey,
        supplied: u32,
        expected: u32,
    },

    #[error("Previous request {index} of campaign {campaign} is {state}, not settled")]
    PreviousRequestUnsettled {
        campaign: Pubkey,
        index: u32,
        state: RequestState,
    },

    #[error("Request {request} is not open for voting at {now} (window {vote_start}..={vote_end})")]
    OutsideVoteWindow {
        request: Pubkey,
        now: UnixTimestamp,
        vote_start: UnixTimestamp,
        vote_end: UnixTimestamp,
    },

    #[error("Donor {voter} already voted on request {request}")]
    AlreadyVoted { request: Pubkey, voter: Pubkey },

    #[error("Voting on request {request} is still open until {vote_end} (now {now})")]
    VotingStillOpen {
        request: Pubkey,
        vote_end: UnixTimestamp,
        now: UnixTimestamp,
    },

    #[error("Request {request} already finalized")]
    AlreadyFinalized { request: Pubkey },

    #[error("Request {request} is not finalized")]
    NotFinalized { request: Pubkey },

    #[error("Request {request} was not approved")]
    NotApproved { request: Pubkey },

    #[error("Request {request} already executed")]
    AlreadyExecuted { request: Pubkey },

    #[error("Request {supplied} is not the latest request {latest:?} of campaign {campaign}")]
    NotLatestRequest {
        campaign: Pubkey,
        supplied: Pubkey,
        latest: Option<Pubkey>,
    },

    #[error("Donation of {donor} to campaign {campaign} already refunded")]
    AlreadyRefunded { campaign: Pubkey, donor: Pubkey },

    #[error("Donation of {donor} to campaign {campaign} is not refundable")]
    NotRefundable { campaign: Pubkey, donor: Pubkey },

    #[error("Signed instruction {digest} was already applied")]
    Replayed { digest: Pubkey },

    #[error("{address} changed since it was read (expected version {expected}, found {found})")]
    Conflict {
        address: Pubkey,
        expected: u64,
        found: u64,
    },

    // NotFound
    #[error("No {namespace} account at {address}")]
    AccountNotFound {
        namespace: Namespace,
        address: Pubkey,
    },

    // Transport
    #[error("Store unavailable: {0}")]
    Store(String),

    // Fatal
    #[error("Address derivation failed: {0}")]
    Derive(#[from] DeriveError),

    #[error("Corrupt account at {address}: {reason}")]
    Corrupt { address: Pubkey, reason: String },

    #[error("Encoding failed: {0}")]
    Encoding(String),

    #[error("Arithmetic overflow in {what}")]
    Overflow { what: &'static str },

    #[error("Vault underflow: releasing {requested} from {available}")]
    VaultUnderflow { requested: Amount, available: Amount },

    #[error("Account {address} was not loaded for this instruction")]
    AccountNotLoaded { address: Pubkey },
}

impl ProtocolError {
    pub fn kind(&self) -> ErrorKind {
        use ProtocolError::*;
        match self {
            ZeroAmount { .. }
            | RefTooLong { .. }
            | DeadlineNotInFuture { .. }
            | InvalidVoteDuration { .. }
            | AddressMismatch { .. }
            | BadSignature { .. } => ErrorKind::Validation,

            NotCreator { .. }
            | CampaignExists { .. }
            | WrongStatus { .. }
            | DeadlinePassed { .. }
            | InsufficientVault { .. }
            | StaleRequestIndex { .. }
            | PreviousRequestUnsettled { .. }
            | OutsideVoteWindow { .. }
            | AlreadyVoted { .. }
            | VotingStillOpen { .. }
            | AlreadyFinalized { .. }
            | NotFinalized { .. }
            | NotApproved { .. }
            | AlreadyExecuted { .. }
            | NotLatestRequest { .. }
            | AlreadyRefunded { .. }
            | NotRefundable { .. }
            | Replayed { .. }
            | Conflict { .. } => ErrorKind::Precondition,

            AccountNotFound { .. } => ErrorKind::NotFound,

            Store(_) => ErrorKind::Transport,

            Derive(_)
            | Corrupt { .. }
            | Encoding(_)
            | Overflow { .. }
            | VaultUnderflow { .. }
            | AccountNotLoaded { .. } => ErrorKind::Fatal,
        }
    }

    /// Whether re-reading state and resubmitting may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProtocolError::Store(_) | ProtocolError::Conflict { .. })
    }
}
