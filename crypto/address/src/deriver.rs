// Copyright (c) 2024 Botho Foundation

//! Typed seed layouts for each escrow entity.

use nuoi_crypto_keys::Pubkey;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{create_program_address, find_program_address, DeriveError, DerivedAddress};

/// Namespace tag prefixed to every seed list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    Campaign,
    Vault,
    Donation,
    Withdraw,
    Vote,
}

impl Namespace {
    pub const ALL: [Namespace; 5] = [
        Namespace::Campaign,
        Namespace::Vault,
        Namespace::Donation,
        Namespace::Withdraw,
        Namespace::Vote,
    ];

    pub fn tag(&self) -> &'static [u8] {
        match self {
            Namespace::Campaign => b"campaign",
            Namespace::Vault => b"vault",
            Namespace::Donation => b"donation",
            Namespace::Withdraw => b"withdraw",
            Namespace::Vote => b"vote",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Tags are ASCII.
        f.write_str(std::str::from_utf8(self.tag()).unwrap_or("?"))
    }
}

/// Derives entity addresses under one program id.
///
/// Pure and cheap to copy; holds no state besides the program id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressDeriver {
    program_id: Pubkey,
}

impl AddressDeriver {
    pub fn new(program_id: Pubkey) -> Self {
        Self { program_id }
    }

    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    /// Derive under `namespace` with already-serialized seeds.
    pub fn derive(
        &self,
        namespace: Namespace,
        seeds: &[&[u8]],
    ) -> Result<DerivedAddress, DeriveError> {
        let mut all: Vec<&[u8]> = Vec::with_capacity(seeds.len() + 1);
        all.push(namespace.tag());
        all.extend_from_slice(seeds);
        find_program_address(&all, &self.program_id)
    }

    /// Recompute an address from seeds and a stored bump.
    pub fn rederive(
        &self,
        namespace: Namespace,
        seeds: &[&[u8]],
        bump: u8,
    ) -> Result<Pubkey, DeriveError> {
        let bump_seed = [bump];
        let mut all: Vec<&[u8]> = Vec::with_capacity(seeds.len() + 2);
        all.push(namespace.tag());
        all.extend_from_slice(seeds);
        all.push(&bump_seed);
        create_program_address(&all, &self.program_id)
    }

    /// `["campaign", creator, campaign_id as u64 LE]`
    pub fn campaign(
        &self,
        creator: &Pubkey,
        campaign_id: u64,
    ) -> Result<DerivedAddress, DeriveError> {
        self.derive(
            Namespace::Campaign,
            &[creator.as_ref(), &campaign_id.to_le_bytes()],
        )
    }

    /// `["vault", campaign]`
    pub fn vault(&self, campaign: &Pubkey) -> Result<DerivedAddress, DeriveError> {
        self.derive(Namespace::Vault, &[campaign.as_ref()])
    }

    /// `["donation", campaign, donor]`
    pub fn donation(
        &self,
        campaign: &Pubkey,
        donor: &Pubkey,
    ) -> Result<DerivedAddress, DeriveError> {
        self.derive(Namespace::Donation, &[campaign.as_ref(), donor.as_ref()])
    }

    /// `["withdraw", campaign, request_index as u32 LE]`
    pub fn withdraw(
        &self,
        campaign: &Pubkey,
        request_index: u32,
    ) -> Result<DerivedAddress, DeriveError> {
        self.derive(
            Namespace::Withdraw,
            &[campaign.as_ref(), &request_index.to_le_bytes()],
        )
    }

    /// `["vote", withdraw_request, voter]`
    pub fn vote(
        &self,
        withdraw_request: &Pubkey,
        voter: &Pubkey,
    ) -> Result<DerivedAddress, DeriveError> {
        self.derive(Namespace::Vote, &[withdraw_request.as_ref(), voter.as_ref()])
    }
}
