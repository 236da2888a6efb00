//! # Stake Ledger Errors

use court_core::{AccountId, Amount, CoreError, TermId};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StakeError {
    /// The juror has never deposited.
    #[error("unknown juror {0}")]
    UnknownJuror(AccountId),

    /// A stake movement with a zero amount.
    #[error("stake operation {operation} requires a positive amount")]
    ZeroAmount { operation: &'static str },

    /// Not enough unlocked active stake.
    #[error("juror {juror} has {available} unlocked active stake, {requested} requested")]
    InsufficientUnlockedBalance {
        juror: AccountId,
        requested: Amount,
        available: Amount,
    },

    /// Not enough locked stake to release or slash.
    #[error("juror {juror} has {locked} locked stake, {requested} requested")]
    InsufficientLockedBalance {
        juror: AccountId,
        requested: Amount,
        locked: Amount,
    },

    /// Not enough available (idle) stake.
    #[error("juror {juror} has {available} available stake, {requested} requested")]
    InsufficientAvailableBalance {
        juror: AccountId,
        requested: Amount,
        available: Amount,
    },

    /// Settlement tried to distribute more than the slashed pool holds.
    #[error("stake pool holds {pooled}, {requested} requested")]
    InsufficientPool { requested: Amount, pooled: Amount },

    /// A final-round lock still protects the juror's stake.
    #[error("withdrawals of juror {juror} are locked until {until}")]
    WithdrawalsLocked { juror: AccountId, until: TermId },

    #[error(transparent)]
    Core(#[from] CoreError),
}
