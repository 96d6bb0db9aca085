// Copyright (c) 2024 Botho Foundation

//! Accounts visible to one instruction, and the changes it makes to them.

use nuoi_common::{Amount, UnixTimestamp};
use nuoi_crypto_address::{AddressDeriver, Namespace};
use nuoi_crypto_keys::Pubkey;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::{
    params::ProtocolParams, Account, Campaign, DonationRecord, ProtocolError, Vault,
    VoteRecord, WithdrawRequest,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferKind {
    Donation,
    Withdrawal,
    Refund,
}

/// Funds moved between a participant and a vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub kind: TransferKind,
    pub from: Pubkey,
    pub to: Pubkey,
    pub amount: Amount,
}

/// Result of processing: accounts to write and funds moved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Effects {
    pub writes: Vec<(Pubkey, Account)>,
    pub transfers: Vec<Transfer>,
}

pub struct InstructionContext<'a> {
    signer: Pubkey,
    now: UnixTimestamp,
    params: &'a ProtocolParams,
    deriver: &'a AddressDeriver,
    accounts: BTreeMap<Pubkey, Option<Account>>,
    dirty: BTreeSet<Pubkey>,
    transfers: Vec<Transfer>,
}

macro_rules! required_account {
    ($name:ident, $variant:ident, $ty:ty, $namespace:expr) => {
        pub fn $name(&self, address: &Pubkey) -> Result<$ty, ProtocolError> {
            match self.slot(address)? {
                Some(Account::$variant(inner)) => Ok(inner.clone()),
                Some(other) => Err(wrong_kind(address, stringify!($variant), other)),
                None => Err(ProtocolError::AccountNotFound {
                    namespace: $namespace,
                    address: *address,
                }),
            }
        }
    };
}

macro_rules! optional_account {
    ($name:ident, $variant:ident, $ty:ty) => {
        pub fn $name(&self, address: &Pubkey) -> Result<Option<$ty>, ProtocolError> {
            match self.slot(address)? {
                Some(Account::$variant(inner)) => Ok(Some(inner.clone())),
                Some(other) => Err(wrong_kind(address, stringify!($variant), other)),
                None => Ok(None),
            }
        }
    };
}

fn wrong_kind(address: &Pubkey, expected: &str, found: &Account) -> ProtocolError {
    ProtocolError::Corrupt {
        address: *address,
        reason: format!("expected {expected} account, found {}", found.kind()),
    }
}

impl<'a> InstructionContext<'a> {
    pub fn new(
        signer: Pubkey,
        now: UnixTimestamp,
        params: &'a ProtocolParams,
        deriver: &'a AddressDeriver,
        accounts: impl IntoIterator<Item = (Pubkey, Option<Account>)>,
    ) -> Self {
        Self {
            signer,
            now,
            params,
            deriver,
            accounts: accounts.into_iter().collect(),
            dirty: BTreeSet::new(),
            transfers: Vec::new(),
        }
    }

    pub fn signer(&self) -> &Pubkey {
        &self.signer
    }

    pub fn now(&self) -> UnixTimestamp {
        self.now
    }

    pub fn params(&self) -> &ProtocolParams {
        self.params
    }

    pub fn deriver(&self) -> &AddressDeriver {
        self.deriver
    }

    fn slot(&self, address: &Pubkey) -> Result<Option<&Account>, ProtocolError> {
        self.accounts
            .get(address)
            .map(Option::as_ref)
            .ok_or(ProtocolError::AccountNotLoaded { address: *address })
    }

    /// Whether nothing lives at `address` yet.
    pub fn is_vacant(&self, address: &Pubkey) -> Result<bool, ProtocolError> {
        Ok(self.slot(address)?.is_none())
    }

    required_account!(campaign, Campaign, Campaign, Namespace::Campaign);
    required_account!(vault, Vault, Vault, Namespace::Vault);
    required_account!(donation, Donation, DonationRecord, Namespace::Donation);
    required_account!(withdraw, Withdraw, WithdrawRequest, Namespace::Withdraw);
    optional_account!(find_donation, Donation, DonationRecord);
    optional_account!(find_vote, Vote, VoteRecord);

    /// Stage `account` to be written at `address`.
    pub fn store(&mut self, address: Pubkey, account: Account) -> Result<(), ProtocolError> {
        let slot = self
            .accounts
            .get_mut(&address)
            .ok_or(ProtocolError::AccountNotLoaded { address })?;
        *slot = Some(account);
        self.dirty.insert(address);
        Ok(())
    }

    pub fn record_transfer(
        &mut self,
        kind: TransferKind,
        from: Pubkey,
        to: Pubkey,
        amount: Amount,
    ) {
        self.transfers.push(Transfer {
            kind,
            from,
            to,
            amount,
        });
    }

    pub fn into_effects(mut self) -> Effects {
        let writes = self
            .dirty
            .iter()
            .filter_map(|address| {
                self.accounts
                    .remove(address)
                    .flatten()
                    .map(|account| (*address, account))
            })
            .collect();
        Effects {
            writes,
            transfers: self.transfers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{VoteChoice, VoteRecord};

    #[test]
    fn test_lookup_outcomes() {
        let params = ProtocolParams::default();
        let deriver = AddressDeriver::new(Pubkey::new_from_array([1; 32]));
        let vote_at = Pubkey::new_from_array([2; 32]);
        let empty = Pubkey::new_from_array([3; 32]);
        let vote = VoteRecord {
            request: empty,
            voter: empty,
            choice: VoteChoice::Approve,
            weight_used: 1,
            voted_at: 0,
        };

        let ctx = InstructionContext::new(
            empty,
            0,
            &params,
            &deriver,
            [(vote_at, Some(Account::Vote(vote.clone()))), (empty, None)],
        );

        assert_eq!(ctx.find_vote(&vote_at).unwrap(), Some(vote));
        assert!(matches!(
            ctx.campaign(&vote_at),
            Err(ProtocolError::Corrupt { .. })
        ));
        assert!(matches!(
            ctx.campaign(&empty),
            Err(ProtocolError::AccountNotFound {
                namespace: Namespace::Campaign,
                ..
            })
        ));
        assert!(matches!(
            ctx.campaign(&Pubkey::new_from_array([9; 32])),
            Err(ProtocolError::AccountNotLoaded { .. })
        ));
    }

    #[test]
    fn test_only_stored_accounts_are_written() {
        let params = ProtocolParams::default();
        let deriver = AddressDeriver::new(Pubkey::new_from_array([1; 32]));
        let a = Pubkey::new_from_array([4; 32]);
        let b = Pubkey::new_from_array([5; 32]);
        let mut ctx = InstructionContext::new(a, 0, &params, &deriver, [(a, None), (b, None)]);

        ctx.store(b, Account::Vault(Vault::new(a, 255))).unwrap();
        assert!(ctx
            .store(Pubkey::new_from_array([6; 32]), Account::Vault(Vault::new(a, 255)))
            .is_err());

        let effects = ctx.into_effects();
        assert_eq!(effects.writes.len(), 1);
        assert_eq!(effects.writes[0].0, b);
    }
}
