// Copyright (c) 2024 Botho Foundation

//! Runs the escrow protocol against a state store.
//!
//! A submission goes through four steps: verify the signature, read every
//! account the instruction names together with its version, run the pure
//! processor, and commit the writes with a compare-and-set on every version
//! read. Two submissions racing on the same accounts cannot both commit; the
//! loser gets [`ProtocolError::Conflict`](nuoi_protocol::ProtocolError) and
//! decides for itself whether to re-read and retry.

mod evidence;
mod query;
mod runtime;

pub use evidence::{
    content_ref, DirEvidenceStore, EvidenceError, EvidenceStore, MemoryEvidenceStore,
};
pub use query::{CampaignFilter, CampaignOverview, RefundStatus, RequestView};
pub use runtime::{Outcome, Runtime, StagedTransaction};
