//! # Jurors Registry
//!
//! In-memory [`StakeLedger`]. Activation and deactivation take effect
//! immediately in the sortition tree; the court reads the distribution as
//! of its last ensured term, so a change lands between draft batches, never
//! inside one.
//!
//! Zero-amount movements are no-ops in the settlement-facing operations so
//! that a zero penalty configuration settles cleanly.

use std::collections::BTreeMap;

use court_core::{AccountId, Amount, TermId};
use serde::{Deserialize, Serialize};

use crate::error::StakeError;
use crate::sortition::SortitionTree;

/// Stake the court draws from, locks and redistributes.
pub trait StakeLedger {
    /// Active stake of `juror`, locked part included.
    fn active_balance(&self, juror: &AccountId) -> Amount;

    /// Active stake not yet locked by open rounds.
    fn unlocked_active_balance(&self, juror: &AccountId) -> Amount;

    fn total_active_balance(&self) -> Amount;

    /// Juror owning cumulative active-stake `position`.
    fn juror_at(&self, position: u128) -> Option<AccountId>;

    fn lock(&mut self, juror: &AccountId, amount: Amount) -> Result<(), StakeError>;

    fn unlock(&mut self, juror: &AccountId, amount: Amount) -> Result<(), StakeError>;

    /// Forfeit locked stake into the pool. Returns the amount moved.
    fn slash(&mut self, juror: &AccountId, amount: Amount) -> Result<Amount, StakeError>;

    /// Take unlocked active stake into the pool.
    fn collect(&mut self, juror: &AccountId, amount: Amount) -> Result<(), StakeError>;

    /// Pay pooled stake to `juror` as available balance.
    fn assign(&mut self, juror: &AccountId, amount: Amount) -> Result<(), StakeError>;

    /// Send pooled stake to the burn account.
    fn burn(&mut self, amount: Amount) -> Result<(), StakeError>;

    /// Block withdrawals of `juror` until `until` (keeps the later of two locks).
    fn lock_withdrawals(&mut self, juror: &AccountId, until: TermId) -> Result<(), StakeError>;

    fn balance_of(&self, juror: &AccountId) -> JurorBalances;

    fn burn_account(&self) -> &AccountId;

    /// Stake slashed or collected and not yet redistributed.
    fn pooled(&self) -> Amount;
}

/// Balance snapshot of one juror.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JurorBalances {
    pub active: Amount,
    pub locked: Amount,
    pub available: Amount,
    pub withdrawals_locked_until: TermId,
}

#[derive(Debug, Clone)]
struct JurorAccount {
    slot: usize,
    balances: JurorBalances,
}

/// In-memory juror stake ledger.
#[derive(Debug, Clone)]
pub struct JurorsRegistry {
    accounts: BTreeMap<AccountId, JurorAccount>,
    /// Slot index to owner.
    owners: Vec<AccountId>,
    tree: SortitionTree,
    total_active: Amount,
    pooled: Amount,
    burn_account: AccountId,
}

impl JurorsRegistry {
    pub fn new(burn_account: AccountId) -> Self {
        Self {
            accounts: BTreeMap::new(),
            owners: Vec::new(),
            tree: SortitionTree::new(),
            total_active: Amount::ZERO,
            pooled: Amount::ZERO,
            burn_account,
        }
    }

    /// Credit `amount` of fresh stake to `juror`'s available balance.
    pub fn deposit(&mut self, juror: &AccountId, amount: Amount) -> Result<(), StakeError> {
        if amount.is_zero() {
            return Err(StakeError::ZeroAmount {
                operation: "deposit",
            });
        }
        let account = self.account_or_insert(juror);
        account.balances.available = account.balances.available.checked_add(amount)?;
        Ok(())
    }

    /// Move available stake into the active pool.
    pub fn activate(&mut self, juror: &AccountId, amount: Amount) -> Result<(), StakeError> {
        if amount.is_zero() {
            return Err(StakeError::ZeroAmount {
                operation: "activate",
            });
        }
        let total_active = self.total_active.checked_add(amount)?;
        let account = self.account_mut(juror)?;
        let available = account.balances.available.checked_sub(amount).ok_or(
            StakeError::InsufficientAvailableBalance {
                juror: juror.clone(),
                requested: amount,
                available: account.balances.available,
            },
        )?;
        let active = account.balances.active.checked_add(amount)?;
        account.balances.available = available;
        account.balances.active = active;
        let slot = account.slot;
        self.total_active = total_active;
        self.tree.set(slot, active.raw());
        tracing::debug!(juror = %juror, amount = %amount, "activated stake");
        Ok(())
    }

    /// Move unlocked active stake back to available.
    pub fn deactivate(&mut self, juror: &AccountId, amount: Amount) -> Result<(), StakeError> {
        if amount.is_zero() {
            return Err(StakeError::ZeroAmount {
                operation: "deactivate",
            });
        }
        self.take_unlocked_active(juror, amount)?;
        let account = self.account_mut(juror)?;
        account.balances.available = account.balances.available.checked_add(amount)?;
        Ok(())
    }

    /// Withdraw available stake out of the court at `current_term`.
    pub fn withdraw(
        &mut self,
        juror: &AccountId,
        amount: Amount,
        current_term: TermId,
    ) -> Result<(), StakeError> {
        if amount.is_zero() {
            return Err(StakeError::ZeroAmount {
                operation: "withdraw",
            });
        }
        let account = self.account_mut(juror)?;
        let until = account.balances.withdrawals_locked_until;
        if current_term <= until && until != TermId::ZERO {
            return Err(StakeError::WithdrawalsLocked {
                juror: juror.clone(),
                until,
            });
        }
        account.balances.available = account.balances.available.checked_sub(amount).ok_or(
            StakeError::InsufficientAvailableBalance {
                juror: juror.clone(),
                requested: amount,
                available: account.balances.available,
            },
        )?;
        Ok(())
    }

    /// Convenience for setups: deposit and activate in one step.
    pub fn stake(&mut self, juror: &AccountId, amount: Amount) -> Result<(), StakeError> {
        self.deposit(juror, amount)?;
        self.activate(juror, amount)
    }

    pub fn juror_count(&self) -> usize {
        self.accounts.len()
    }

    fn account_or_insert(&mut self, juror: &AccountId) -> &mut JurorAccount {
        let tree = &mut self.tree;
        let owners = &mut self.owners;
        self.accounts.entry(juror.clone()).or_insert_with(|| {
            owners.push(juror.clone());
            JurorAccount {
                slot: tree.push(0),
                balances: JurorBalances::default(),
            }
        })
    }

    fn account_mut(&mut self, juror: &AccountId) -> Result<&mut JurorAccount, StakeError> {
        self.accounts
            .get_mut(juror)
            .ok_or_else(|| StakeError::UnknownJuror(juror.clone()))
    }

    /// Remove unlocked active stake from the sortition pool.
    fn take_unlocked_active(&mut self, juror: &AccountId, amount: Amount) -> Result<(), StakeError> {
        let account = self.account_mut(juror)?;
        let unlocked = account.balances.active.saturating_sub(account.balances.locked);
        if amount > unlocked {
            return Err(StakeError::InsufficientUnlockedBalance {
                juror: juror.clone(),
                requested: amount,
                available: unlocked,
            });
        }
        account.balances.active = account.balances.active.saturating_sub(amount);
        let (slot, active) = (account.slot, account.balances.active);
        self.tree.set(slot, active.raw());
        self.total_active = self.total_active.saturating_sub(amount);
        Ok(())
    }

    fn take_from_pool(&mut self, amount: Amount) -> Result<(), StakeError> {
        self.pooled = self
            .pooled
            .checked_sub(amount)
            .ok_or(StakeError::InsufficientPool {
                requested: amount,
                pooled: self.pooled,
            })?;
        Ok(())
    }
}

impl StakeLedger for JurorsRegistry {
    fn active_balance(&self, juror: &AccountId) -> Amount {
        self.accounts
            .get(juror)
            .map(|a| a.balances.active)
            .unwrap_or_default()
    }

    fn unlocked_active_balance(&self, juror: &AccountId) -> Amount {
        self.accounts
            .get(juror)
            .map(|a| a.balances.active.saturating_sub(a.balances.locked))
            .unwrap_or_default()
    }

    fn total_active_balance(&self) -> Amount {
        self.total_active
    }

    fn juror_at(&self, position: u128) -> Option<AccountId> {
        self.tree
            .find(position)
            .and_then(|slot| self.owners.get(slot).cloned())
    }

    fn lock(&mut self, juror: &AccountId, amount: Amount) -> Result<(), StakeError> {
        if amount.is_zero() {
            return Ok(());
        }
        let account = self.account_mut(juror)?;
        let unlocked = account.balances.active.saturating_sub(account.balances.locked);
        if amount > unlocked {
            return Err(StakeError::InsufficientUnlockedBalance {
                juror: juror.clone(),
                requested: amount,
                available: unlocked,
            });
        }
        account.balances.locked = account.balances.locked.checked_add(amount)?;
        Ok(())
    }

    fn unlock(&mut self, juror: &AccountId, amount: Amount) -> Result<(), StakeError> {
        if amount.is_zero() {
            return Ok(());
        }
        let account = self.account_mut(juror)?;
        account.balances.locked = account.balances.locked.checked_sub(amount).ok_or(
            StakeError::InsufficientLockedBalance {
                juror: juror.clone(),
                requested: amount,
                locked: account.balances.locked,
            },
        )?;
        Ok(())
    }

    fn slash(&mut self, juror: &AccountId, amount: Amount) -> Result<Amount, StakeError> {
        if amount.is_zero() {
            return Ok(Amount::ZERO);
        }
        let pooled = self.pooled.checked_add(amount)?;
        let account = self.account_mut(juror)?;
        let locked = account.balances.locked.checked_sub(amount).ok_or(
            StakeError::InsufficientLockedBalance {
                juror: juror.clone(),
                requested: amount,
                locked: account.balances.locked,
            },
        )?;
        // Locked stake is always part of active stake.
        account.balances.locked = locked;
        account.balances.active = account.balances.active.saturating_sub(amount);
        let (slot, active) = (account.slot, account.balances.active);
        self.tree.set(slot, active.raw());
        self.total_active = self.total_active.saturating_sub(amount);
        self.pooled = pooled;
        tracing::debug!(juror = %juror, amount = %amount, "slashed locked stake");
        Ok(amount)
    }

    fn collect(&mut self, juror: &AccountId, amount: Amount) -> Result<(), StakeError> {
        if amount.is_zero() {
            return Ok(());
        }
        let pooled = self.pooled.checked_add(amount)?;
        self.take_unlocked_active(juror, amount)?;
        self.pooled = pooled;
        Ok(())
    }

    fn assign(&mut self, juror: &AccountId, amount: Amount) -> Result<(), StakeError> {
        if amount.is_zero() {
            return Ok(());
        }
        if amount > self.pooled {
            return Err(StakeError::InsufficientPool {
                requested: amount,
                pooled: self.pooled,
            });
        }
        let account = self.account_or_insert(juror);
        account.balances.available = account.balances.available.checked_add(amount)?;
        self.take_from_pool(amount)
    }

    fn burn(&mut self, amount: Amount) -> Result<(), StakeError> {
        let burn_account = self.burn_account.clone();
        self.assign(&burn_account, amount)?;
        tracing::warn!(amount = %amount, burn_account = %burn_account, "burned stake pool");
        Ok(())
    }

    fn lock_withdrawals(&mut self, juror: &AccountId, until: TermId) -> Result<(), StakeError> {
        let account = self.account_mut(juror)?;
        if until > account.balances.withdrawals_locked_until {
            account.balances.withdrawals_locked_until = until;
        }
        Ok(())
    }

    fn balance_of(&self, juror: &AccountId) -> JurorBalances {
        self.accounts
            .get(juror)
            .map(|a| a.balances.clone())
            .unwrap_or_default()
    }

    fn burn_account(&self) -> &AccountId {
        &self.burn_account
    }

    fn pooled(&self) -> Amount {
        self.pooled
    }
}
