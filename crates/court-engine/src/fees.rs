//! # Fee Ledger
//!
//! Fee tokens move in two directions only: parties pay deposits into the
//! court's escrow, and the court pays drafters, settlers, jurors and
//! refunds out of it. [`FeeTreasury`] is the in-memory ledger.

use std::collections::BTreeMap;

use court_core::{AccountId, Amount, CoreError};
use thiserror::Error;

/// Errors raised by a fee ledger.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeeError {
    /// The payer's balance cannot cover the transfer.
    #[error("{holder} holds {balance}, {requested} requested")]
    InsufficientFunds {
        holder: AccountId,
        requested: Amount,
        balance: Amount,
    },

    /// The escrow cannot cover a payout.
    #[error("escrow holds {escrow}, {requested} requested")]
    InsufficientEscrow { requested: Amount, escrow: Amount },

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Fee-token transfer primitive.
pub trait FeeLedger {
    /// Move `amount` from `payer` into escrow.
    fn transfer_from(&mut self, payer: &AccountId, amount: Amount) -> Result<(), FeeError>;

    /// Move `amount` from escrow to `recipient`.
    fn pay_to(&mut self, recipient: &AccountId, amount: Amount) -> Result<(), FeeError>;

    fn balance_of(&self, holder: &AccountId) -> Amount;

    fn escrow_balance(&self) -> Amount;
}

/// In-memory fee ledger.
#[derive(Debug, Clone, Default)]
pub struct FeeTreasury {
    balances: BTreeMap<AccountId, Amount>,
    escrow: Amount,
}

impl FeeTreasury {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit fresh tokens to `holder`.
    pub fn mint(&mut self, holder: &AccountId, amount: Amount) -> Result<(), FeeError> {
        let balance = self.balance_of(holder).checked_add(amount)?;
        self.balances.insert(holder.clone(), balance);
        Ok(())
    }
}

impl FeeLedger for FeeTreasury {
    fn transfer_from(&mut self, payer: &AccountId, amount: Amount) -> Result<(), FeeError> {
        if amount.is_zero() {
            return Ok(());
        }
        let balance = self.balance_of(payer);
        let remaining = balance
            .checked_sub(amount)
            .ok_or_else(|| FeeError::InsufficientFunds {
                holder: payer.clone(),
                requested: amount,
                balance,
            })?;
        let escrow = self.escrow.checked_add(amount)?;
        self.balances.insert(payer.clone(), remaining);
        self.escrow = escrow;
        Ok(())
    }

    fn pay_to(&mut self, recipient: &AccountId, amount: Amount) -> Result<(), FeeError> {
        if amount.is_zero() {
            return Ok(());
        }
        let escrow = self
            .escrow
            .checked_sub(amount)
            .ok_or(FeeError::InsufficientEscrow {
                requested: amount,
                escrow: self.escrow,
            })?;
        let balance = self.balance_of(recipient).checked_add(amount)?;
        self.balances.insert(recipient.clone(), balance);
        self.escrow = escrow;
        Ok(())
    }

    fn balance_of(&self, holder: &AccountId) -> Amount {
        self.balances.get(holder).copied().unwrap_or_default()
    }

    fn escrow_balance(&self) -> Amount {
        self.escrow
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> AccountId {
        AccountId::new(name).unwrap()
    }

    #[test]
    fn deposits_flow_into_escrow_and_out_again() {
        let mut treasury = FeeTreasury::new();
        treasury.mint(&id("disputer"), Amount::new(500)).unwrap();
        treasury.transfer_from(&id("disputer"), Amount::new(240)).unwrap();
        assert_eq!(treasury.balance_of(&id("disputer")), Amount::new(260));
        assert_eq!(treasury.escrow_balance(), Amount::new(240));

        treasury.pay_to(&id("drafter"), Amount::new(90)).unwrap();
        assert_eq!(treasury.balance_of(&id("drafter")), Amount::new(90));
        assert_eq!(treasury.escrow_balance(), Amount::new(150));
    }

    #[test]
    fn insufficient_funds_leave_balances_untouched() {
        let mut treasury = FeeTreasury::new();
        treasury.mint(&id("poor"), Amount::new(10)).unwrap();
        let err = treasury
            .transfer_from(&id("poor"), Amount::new(11))
            .unwrap_err();
        assert!(matches!(err, FeeError::InsufficientFunds { .. }));
        assert_eq!(treasury.balance_of(&id("poor")), Amount::new(10));
        assert_eq!(treasury.escrow_balance(), Amount::ZERO);
    }

    #[test]
    fn payouts_cannot_exceed_escrow() {
        let mut treasury = FeeTreasury::new();
        let err = treasury.pay_to(&id("juror"), Amount::new(1)).unwrap_err();
        assert_eq!(
            err,
            FeeError::InsufficientEscrow {
                requested: Amount::new(1),
                escrow: Amount::ZERO,
            }
        );
    }
}
