// Copyright (c) 2024 Botho Foundation

//! Campaign fund custody.

use nuoi_common::Amount;
use nuoi_crypto_keys::Pubkey;
use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// The only ways funds move through a vault.
pub trait Custody {
    /// Donor funds in.
    fn deposit_donation(&mut self, amount: Amount) -> Result<(), ProtocolError>;

    /// Approved withdrawal out to the creator.
    fn release_withdrawal(&mut self, amount: Amount) -> Result<(), ProtocolError>;

    /// Refund out to a donor.
    fn release_refund(&mut self, amount: Amount) -> Result<(), ProtocolError>;
}

/// Funds held for one campaign, at an address derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vault {
    campaign: Pubkey,
    bump: u8,
    balance: Amount,
    total_deposited: Amount,
    total_withdrawn: Amount,
    total_refunded: Amount,
}

impl Vault {
    pub fn new(campaign: Pubkey, bump: u8) -> Self {
        Self {
            campaign,
            bump,
            balance: 0,
            total_deposited: 0,
            total_withdrawn: 0,
            total_refunded: 0,
        }
    }

    pub fn campaign(&self) -> &Pubkey {
        &self.campaign
    }

    pub fn balance(&self) -> Amount {
        self.balance
    }

    pub fn bump(&self) -> u8 {
        self.bump
    }

    pub fn total_deposited(&self) -> Amount {
        self.total_deposited
    }

    pub fn total_withdrawn(&self) -> Amount {
        self.total_withdrawn
    }

    pub fn total_refunded(&self) -> Amount {
        self.total_refunded
    }

    fn release(&mut self, amount: Amount) -> Result<(), ProtocolError> {
        self.balance = self
            .balance
            .checked_sub(amount)
            .ok_or(ProtocolError::VaultUnderflow {
                requested: amount,
                available: self.balance,
            })?;
        Ok(())
    }
}

impl Custody for Vault {
    fn deposit_donation(&mut self, amount: Amount) -> Result<(), ProtocolError> {
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(ProtocolError::Overflow { what: "vault balance" })?;
        self.total_deposited = self
            .total_deposited
            .checked_add(amount)
            .ok_or(ProtocolError::Overflow { what: "vault deposits" })?;
        Ok(())
    }

    fn release_withdrawal(&mut self, amount: Amount) -> Result<(), ProtocolError> {
        self.release(amount)?;
        self.total_withdrawn = self.total_withdrawn.saturating_add(amount);
        Ok(())
    }

    fn release_refund(&mut self, amount: Amount) -> Result<(), ProtocolError> {
        self.release(amount)?;
        self.total_refunded = self.total_refunded.saturating_add(amount);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movements_balance_out() {
        let mut vault = Vault::new(Pubkey::new_from_array([1; 32]), 254);
        vault.deposit_donation(300).unwrap();
        vault.release_withdrawal(120).unwrap();
        vault.release_refund(80).unwrap();

        assert_eq!(vault.balance(), 100);
        assert_eq!(
            vault.total_deposited() - vault.total_withdrawn() - vault.total_refunded(),
            vault.balance()
        );
    }

    #[test]
    fn test_release_more_than_held() {
        let mut vault = Vault::new(Pubkey::new_from_array([1; 32]), 254);
        vault.deposit_donation(5).unwrap();
        assert_eq!(
            vault.release_refund(6),
            Err(ProtocolError::VaultUnderflow {
                requested: 6,
                available: 5
            })
        );
        assert_eq!(vault.balance(), 5);
    }

    #[test]
    fn test_deposit_overflow() {
        let mut vault = Vault::new(Pubkey::new_from_array([1; 32]), 254);
        vault.deposit_donation(u64::MAX).unwrap();
        assert!(matches!(
            vault.deposit_donation(1),
            Err(ProtocolError::Overflow { .. })
        ));
    }
}
