// Copyright (c) 2024 Botho Foundation

//! Which operations make sense for a viewer right now.
//!
//! Purely advisory: the processor re-checks everything on submission.

use nuoi_common::UnixTimestamp;
use nuoi_crypto_keys::Pubkey;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{
    derive_status, refund_reasons, Campaign, CampaignStatus, DonationRecord,
    RequestState, WithdrawRequest,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Donate,
    Vote { request_index: u32 },
    Finalize { request_index: u32 },
    RequestWithdraw { request_index: u32 },
    Refund,
    Execute { request_index: u32 },
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Donate => write!(f, "donate"),
            Action::Vote { request_index } => write!(f, "vote on request {request_index}"),
            Action::Finalize { request_index } => write!(f, "finalize request {request_index}"),
            Action::RequestWithdraw { request_index } => {
                write!(f, "request withdrawal {request_index}")
            }
            Action::Refund => write!(f, "claim refund"),
            Action::Execute { request_index } => write!(f, "execute request {request_index}"),
        }
    }
}

/// Who is looking, and what they hold in the campaign.
#[derive(Debug, Clone, Default)]
pub struct Viewer {
    pub identity: Option<Pubkey>,
    pub donation: Option<DonationRecord>,
    /// Already voted on the latest request.
    pub voted_on_latest: bool,
}

pub fn available_actions(
    campaign: &Campaign,
    latest: Option<&WithdrawRequest>,
    viewer: &Viewer,
    now: UnixTimestamp,
) -> Vec<Action> {
    let status = derive_status(campaign, now);
    if campaign.all_refunded() {
        return Vec::new();
    }

    let is_creator = viewer.identity == Some(campaign.creator);
    let live_stake = viewer.donation.as_ref().filter(|d| !d.refunded);
    let mut actions = Vec::new();

    if status == CampaignStatus::Active {
        actions.push(Action::Donate);
    }

    if let Some(request) = latest {
        let request_index = request.request_index;
        if !request.finalized
            && request.in_vote_window(now)
            && live_stake.is_some()
            && !viewer.voted_on_latest
        {
            actions.push(Action::Vote { request_index });
        }
        if !request.finalized && now > request.vote_end {
            actions.push(Action::Finalize { request_index });
        }
    }

    let can_open_next = latest.map_or(true, WithdrawRequest::is_settled);
    if is_creator && status == CampaignStatus::Successful && can_open_next {
        actions.push(Action::RequestWithdraw {
            request_index: campaign.next_withdraw_index,
        });
    }

    if live_stake.is_some()
        && status != CampaignStatus::Closed
        && !refund_reasons(campaign, latest, now).is_empty()
    {
        actions.push(Action::Refund);
    }

    if let Some(request) = latest {
        if is_creator
            && request.state() == RequestState::Approved
            && !matches!(status, CampaignStatus::Refunding | CampaignStatus::Closed)
        {
            actions.push(Action::Execute {
                request_index: request.request_index,
            });
        }
    }

    actions
}
