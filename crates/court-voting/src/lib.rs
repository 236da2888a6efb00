//! # court-voting — Commit-Reveal Voting
//!
//! One vote per adjudication round. Jurors commit to
//! `sha256(outcome ‖ salt)` during the commit phase and reveal the outcome
//! and salt afterwards. Revealed outcomes are tallied with the weight the
//! vote's owner assigns the juror; the highest tally wins and ties go to the
//! lower outcome. A commitment exposed during the commit phase can be
//! leaked by anyone holding the salt, which voids that juror's vote.
//!
//! The voting module never decides who may vote or with what weight: its
//! owner (the court) answers through [`VotingOwner`] before each commit and
//! reveal.

pub mod crvoting;
pub mod error;

pub use crvoting::{CRVoting, Commitment, Tally, VoteFailure, VotingEvent, VotingOwner};
pub use error::VotingError;
