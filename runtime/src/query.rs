// Copyright (c) 2024 Botho Foundation

//! Read side. Every call is an independent snapshot; callers composing
//! several reads may see a request appear between two of them.

use nuoi_common::{Amount, Clock};
use nuoi_crypto_address::Namespace;
use nuoi_crypto_keys::Pubkey;
use nuoi_ledger_db::StateStore;
use nuoi_protocol::{
    available_actions, derive_status, refund_payout, refund_reasons, Account, Action, Campaign,
    CampaignStatus, DonationRecord, ProtocolError, RefundReason, RequestState, Vault, Viewer,
    VoteRecord, WithdrawRequest,
};
use serde::Serialize;

use crate::runtime::{store_error, Runtime};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CampaignFilter {
    pub creator: Option<Pubkey>,
    /// Matched against the effective status.
    pub status: Option<CampaignStatus>,
}

impl CampaignFilter {
    fn matches(&self, campaign: &Campaign, status: CampaignStatus) -> bool {
        self.creator.map_or(true, |creator| creator == campaign.creator)
            && self.status.map_or(true, |wanted| wanted == status)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestView {
    pub address: Pubkey,
    pub state: RequestState,
    pub request: WithdrawRequest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CampaignOverview {
    pub address: Pubkey,
    pub vault: Pubkey,
    /// Effective status at read time.
    pub status: CampaignStatus,
    pub campaign: Campaign,
    pub vault_balance: Amount,
    pub latest_request: Option<RequestView>,
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefundStatus {
    pub donation: DonationRecord,
    pub reasons: Vec<RefundReason>,
    /// What a claim would pay right now.
    pub payout: Amount,
}

impl RefundStatus {
    pub fn eligible(&self) -> bool {
        !self.donation.refunded && !self.reasons.is_empty()
    }
}

impl<S: StateStore, C: Clock> Runtime<S, C> {
    fn fetch<T>(
        &self,
        address: &Pubkey,
        namespace: Namespace,
        pick: impl FnOnce(Account) -> Option<T>,
    ) -> Result<Option<T>, ProtocolError> {
        match self.load(address)? {
            (_, None) => Ok(None),
            (_, Some(account)) => {
                let kind = account.kind();
                pick(account).map(Some).ok_or_else(|| ProtocolError::Corrupt {
                    address: *address,
                    reason: format!("expected {namespace} account, found {kind}"),
                })
            }
        }
    }

    fn require<T>(
        &self,
        address: &Pubkey,
        namespace: Namespace,
        pick: impl FnOnce(Account) -> Option<T>,
    ) -> Result<T, ProtocolError> {
        self.fetch(address, namespace, pick)?
            .ok_or(ProtocolError::AccountNotFound {
                namespace,
                address: *address,
            })
    }

    pub fn campaign(&self, address: &Pubkey) -> Result<Campaign, ProtocolError> {
        self.require(address, Namespace::Campaign, |account| match account {
            Account::Campaign(campaign) => Some(campaign),
            _ => None,
        })
    }

    pub fn campaign_status(&self, address: &Pubkey) -> Result<CampaignStatus, ProtocolError> {
        Ok(derive_status(&self.campaign(address)?, self.now()))
    }

    pub fn vault(&self, campaign: &Pubkey) -> Result<Vault, ProtocolError> {
        let address = self.deriver().vault(campaign)?.address;
        self.require(&address, Namespace::Vault, |account| match account {
            Account::Vault(vault) => Some(vault),
            _ => None,
        })
    }

    pub fn donation(
        &self,
        campaign: &Pubkey,
        donor: &Pubkey,
    ) -> Result<DonationRecord, ProtocolError> {
        let address = self.deriver().donation(campaign, donor)?.address;
        self.require(&address, Namespace::Donation, |account| match account {
            Account::Donation(donation) => Some(donation),
            _ => None,
        })
    }

    fn find_request(
        &self,
        campaign: &Pubkey,
        index: u32,
    ) -> Result<Option<RequestView>, ProtocolError> {
        let address = self.deriver().withdraw(campaign, index)?.address;
        let request = self.fetch(&address, Namespace::Withdraw, |account| match account {
            Account::Withdraw(request) => Some(request),
            _ => None,
        })?;
        Ok(request.map(|request| RequestView {
            address,
            state: request.state(),
            request,
        }))
    }

    pub fn withdraw_request(
        &self,
        campaign: &Pubkey,
        index: u32,
    ) -> Result<RequestView, ProtocolError> {
        self.find_request(campaign, index)?
            .ok_or(ProtocolError::AccountNotFound {
                namespace: Namespace::Withdraw,
                address: self.deriver().withdraw(campaign, index)?.address,
            })
    }

    /// The most recent request, `None` if none was ever made.
    pub fn latest_request(&self, campaign: &Pubkey) -> Result<Option<RequestView>, ProtocolError> {
        match self.campaign(campaign)?.latest_request_index() {
            Some(index) => self.find_request(campaign, index),
            None => Ok(None),
        }
    }

    /// All requests, oldest first. Indices not yet visible are skipped.
    pub fn requests(&self, campaign: &Pubkey) -> Result<Vec<RequestView>, ProtocolError> {
        let next = self.campaign(campaign)?.next_withdraw_index;
        let mut requests = Vec::with_capacity(next as usize);
        for index in 0..next {
            if let Some(view) = self.find_request(campaign, index)? {
                requests.push(view);
            }
        }
        Ok(requests)
    }

    fn scan_accounts(&self) -> Result<Vec<(Pubkey, Account)>, ProtocolError> {
        self.store()
            .scan()
            .map_err(store_error)?
            .into_iter()
            .map(|(address, entry)| Ok((address, Account::decode(&address, &entry.data)?)))
            .collect()
    }

    /// Votes cast on request `index` of `campaign`.
    pub fn votes(&self, campaign: &Pubkey, index: u32) -> Result<Vec<VoteRecord>, ProtocolError> {
        let request = self.deriver().withdraw(campaign, index)?.address;
        Ok(self
            .scan_accounts()?
            .into_iter()
            .filter_map(|(_, account)| match account {
                Account::Vote(vote) if vote.request == request => Some(vote),
                _ => None,
            })
            .collect())
    }

    pub fn donations(&self, campaign: &Pubkey) -> Result<Vec<DonationRecord>, ProtocolError> {
        Ok(self
            .scan_accounts()?
            .into_iter()
            .filter_map(|(_, account)| match account {
                Account::Donation(donation) if donation.campaign == *campaign => Some(donation),
                _ => None,
            })
            .collect())
    }

    /// Campaigns matching `filter`, with `status` replaced by the effective one.
    pub fn list_campaigns(
        &self,
        filter: &CampaignFilter,
    ) -> Result<Vec<(Pubkey, Campaign)>, ProtocolError> {
        let now = self.now();
        let mut campaigns: Vec<_> = self
            .scan_accounts()?
            .into_iter()
            .filter_map(|(address, account)| match account {
                Account::Campaign(mut campaign) => {
                    campaign.status = derive_status(&campaign, now);
                    filter
                        .matches(&campaign, campaign.status)
                        .then_some((address, campaign))
                }
                _ => None,
            })
            .collect();
        campaigns.sort_by_key(|(_, campaign)| std::cmp::Reverse(campaign.created_at));
        Ok(campaigns)
    }

    /// Whether `donor` could refund now, and for how much.
    pub fn refund_status(
        &self,
        campaign_address: &Pubkey,
        donor: &Pubkey,
    ) -> Result<RefundStatus, ProtocolError> {
        let now = self.now();
        let campaign = self.campaign(campaign_address)?;
        let donation = self.donation(campaign_address, donor)?;
        let latest = match campaign.latest_request_index() {
            Some(index) => self.find_request(campaign_address, index)?,
            None => None,
        };
        let vault = self.vault(campaign_address)?;

        let reasons = if derive_status(&campaign, now) == CampaignStatus::Closed {
            Vec::new()
        } else {
            refund_reasons(&campaign, latest.as_ref().map(|v| &v.request), now)
        };
        let payout = if donation.refunded {
            0
        } else {
            refund_payout(&campaign, vault.balance(), &donation)?
        };

        Ok(RefundStatus {
            donation,
            reasons,
            payout,
        })
    }

    /// Everything a campaign page shows, including what `viewer` can do.
    pub fn overview(
        &self,
        address: &Pubkey,
        viewer: Option<&Pubkey>,
    ) -> Result<CampaignOverview, ProtocolError> {
        let now = self.now();
        let campaign = self.campaign(address)?;
        let vault = self.vault(address)?;
        let latest = match campaign.latest_request_index() {
            Some(index) => self.find_request(address, index)?,
            None => None,
        };

        let mut view = Viewer {
            identity: viewer.copied(),
            ..Viewer::default()
        };
        if let Some(identity) = viewer {
            let donation_address = self.deriver().donation(address, identity)?.address;
            view.donation =
                self.fetch(&donation_address, Namespace::Donation, |account| match account {
                    Account::Donation(donation) => Some(donation),
                    _ => None,
                })?;
            if let Some(latest) = &latest {
                let vote_address = self.deriver().vote(&latest.address, identity)?.address;
                view.voted_on_latest = self.load(&vote_address)?.1.is_some();
            }
        }

        let actions = available_actions(
            &campaign,
            latest.as_ref().map(|v| &v.request),
            &view,
            now,
        );

        Ok(CampaignOverview {
            address: *address,
            vault: self.deriver().vault(address)?.address,
            status: derive_status(&campaign, now),
            vault_balance: vault.balance(),
            campaign,
            latest_request: latest,
            actions,
        })
    }
}
