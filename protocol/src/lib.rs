// Copyright (c) 2024 Botho Foundation

//! The escrow protocol: entities, instructions and their state transitions.
//!
//! A campaign collects donations into a vault at an address derived from
//! the campaign. The creator can only draw from the vault through a
//! withdrawal request that donors approve by stake-weighted vote. When the
//! campaign misses its goal, the creator goes quiet, or a request is voted
//! down, donors take their stake back instead.
//!
//! Everything in this crate is pure. [`process`] turns an instruction and
//! the accounts it names into a set of writes; storage, signatures and the
//! clock belong to the runtime.

mod advisor;
mod context;
mod error;
mod instruction;
mod params;
mod processor;
mod state;
mod status;
mod vault;

pub use advisor::{available_actions, Action, Viewer};
pub use context::{Effects, InstructionContext, Transfer, TransferKind};
pub use error::{ErrorKind, ProtocolError};
pub use instruction::{Instruction, InstructionBuilder, SignedInstruction};
pub use params::{
    ProtocolParams, INACTIVITY_REFUND_SECS, MAX_REF_LEN, UNEXECUTED_REFUND_SECS,
};
pub use processor::{process, refund_payout, refund_reasons, RefundReason};
pub use state::{
    Account, Campaign, CampaignStatus, ContentRef, DonationRecord, Receipt, RequestState,
    VoteChoice, VoteRecord, WithdrawRequest,
};
pub use status::derive_status;
pub use vault::{Custody, Vault};
