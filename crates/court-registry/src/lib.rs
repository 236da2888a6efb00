//! # court-registry — Juror Stake Ledger
//!
//! The court consumes stake through the [`StakeLedger`] trait: it reads
//! active balances, samples jurors by stake, and locks, releases, slashes
//! and redistributes stake as rounds are drafted and settled.
//!
//! [`JurorsRegistry`] is the in-memory ledger. Active balances live in a
//! [`SortitionTree`], a Fenwick tree over juror slots that answers "which
//! juror owns cumulative position `p`" and absorbs balance updates in
//! `O(log n)`, so the distribution can change between draft batches.
//!
//! Balance classes per juror:
//!
//! - **active**: eligible for drafting; includes locked stake.
//! - **locked**: the part of active stake at risk in open rounds.
//! - **available**: idle; can be activated or withdrawn.
//!
//! Slashed and collected stake moves into a pool that settlement later
//! assigns to coherent jurors or burns.

pub mod error;
pub mod registry;
pub mod sortition;

pub use error::StakeError;
pub use registry::{JurorBalances, JurorsRegistry, StakeLedger};
pub use sortition::SortitionTree;
