//! # CRVoting
//!
//! Storage and tallying of commit-reveal votes. Each entry point asks the
//! [`VotingOwner`] for permission first; owner rejections are returned
//! untouched as [`VoteFailure::Owner`] so the caller keeps its own error type.

use std::collections::BTreeMap;

use court_core::config::MAX_RULING_OPTIONS;
use court_core::{sha256, AccountId, Outcome, VoteId};
use serde::{Deserialize, Serialize};

use crate::error::VotingError;

/// `sha256(outcome ‖ salt)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Commitment(pub [u8; 32]);

impl Commitment {
    pub fn new(outcome: Outcome, salt: &[u8]) -> Self {
        Self(sha256(&[&[outcome.as_u8()], salt]))
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl std::fmt::Display for Commitment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Gatekeeper consulted before votes are cast.
pub trait VotingOwner {
    type Error;

    /// Fail unless `voter` may commit (or be leaked) in `vote` now.
    fn ensure_can_commit(&mut self, vote: VoteId, voter: &AccountId) -> Result<(), Self::Error>;

    /// Fail unless `voter` may reveal in `vote` now; returns the voter's weight.
    fn ensure_can_reveal(&mut self, vote: VoteId, voter: &AccountId) -> Result<u64, Self::Error>;
}

/// Either a voting rule or the owner rejected the call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteFailure<E> {
    Voting(VotingError),
    Owner(E),
}

impl<E> From<VotingError> for VoteFailure<E> {
    fn from(err: VotingError) -> Self {
        Self::Voting(err)
    }
}

/// Observable voting activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum VotingEvent {
    VoteCommitted {
        vote: VoteId,
        voter: AccountId,
        commitment: Commitment,
    },
    VoteRevealed {
        vote: VoteId,
        voter: AccountId,
        outcome: Outcome,
        weight: u64,
    },
    VoteLeaked {
        vote: VoteId,
        voter: AccountId,
        outcome: Outcome,
        leaker: AccountId,
    },
}

/// Tally of one vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub winning_outcome: Outcome,
    /// Weight of all revealed votes.
    pub total_weight: u64,
    pub weights: BTreeMap<Outcome, u64>,
}

#[derive(Debug, Clone)]
struct CastVote {
    commitment: Commitment,
    outcome: Outcome,
}

#[derive(Debug, Clone)]
struct Vote {
    possible_outcomes: u8,
    winning_outcome: Outcome,
    tallies: BTreeMap<Outcome, u64>,
    voters: BTreeMap<AccountId, CastVote>,
}

impl Vote {
    fn tally_of(&self, outcome: Outcome) -> u64 {
        self.tallies.get(&outcome).copied().unwrap_or(0)
    }

    fn winning(&self) -> Outcome {
        if self.winning_outcome.is_missing() {
            Outcome::REFUSED
        } else {
            self.winning_outcome
        }
    }

    fn add_to_tally(&mut self, outcome: Outcome, weight: u64) {
        let tally = self.tally_of(outcome).saturating_add(weight);
        self.tallies.insert(outcome, tally);
        let leading = self.tally_of(self.winning_outcome);
        if tally > leading || (tally == leading && outcome < self.winning_outcome) {
            self.winning_outcome = outcome;
        }
    }
}

/// Commit-reveal vote store.
#[derive(Debug, Clone, Default)]
pub struct CRVoting {
    votes: BTreeMap<VoteId, Vote>,
    events: Vec<VotingEvent>,
}

impl CRVoting {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `vote` with `possible_outcomes` ruling options.
    pub fn create(&mut self, vote: VoteId, possible_outcomes: u8) -> Result<(), VotingError> {
        if !(2..=MAX_RULING_OPTIONS).contains(&possible_outcomes) {
            return Err(VotingError::InvalidOutcomesAmount {
                vote,
                possible_outcomes,
            });
        }
        if self.votes.contains_key(&vote) {
            return Err(VotingError::VoteAlreadyExists(vote));
        }
        self.votes.insert(
            vote,
            Vote {
                possible_outcomes,
                winning_outcome: Outcome::MISSING,
                tallies: BTreeMap::new(),
                voters: BTreeMap::new(),
            },
        );
        Ok(())
    }

    pub fn exists(&self, vote: VoteId) -> bool {
        self.votes.contains_key(&vote)
    }

    pub fn commit<O: VotingOwner>(
        &mut self,
        owner: &mut O,
        vote_id: VoteId,
        voter: &AccountId,
        commitment: Commitment,
    ) -> Result<(), VoteFailure<O::Error>> {
        let vote = self.vote(vote_id)?;
        if vote.voters.contains_key(voter) {
            return Err(VotingError::VoteAlreadyCommitted {
                vote: vote_id,
                voter: voter.clone(),
            }
            .into());
        }
        owner
            .ensure_can_commit(vote_id, voter)
            .map_err(VoteFailure::Owner)?;

        self.vote_mut(vote_id)?.voters.insert(
            voter.clone(),
            CastVote {
                commitment,
                outcome: Outcome::MISSING,
            },
        );
        tracing::debug!(vote = %vote_id, voter = %voter, "vote committed");
        self.events.push(VotingEvent::VoteCommitted {
            vote: vote_id,
            voter: voter.clone(),
            commitment,
        });
        Ok(())
    }

    /// Expose a committed vote before the reveal phase, voiding it.
    pub fn leak<O: VotingOwner>(
        &mut self,
        owner: &mut O,
        vote_id: VoteId,
        voter: &AccountId,
        outcome: Outcome,
        salt: &[u8],
        leaker: &AccountId,
    ) -> Result<(), VoteFailure<O::Error>> {
        self.check_commitment(vote_id, voter, outcome, salt)?;
        owner
            .ensure_can_commit(vote_id, voter)
            .map_err(VoteFailure::Owner)?;

        if let Some(cast) = self.vote_mut(vote_id)?.voters.get_mut(voter) {
            cast.outcome = Outcome::LEAKED;
        }
        tracing::warn!(vote = %vote_id, voter = %voter, leaker = %leaker, "vote leaked");
        self.events.push(VotingEvent::VoteLeaked {
            vote: vote_id,
            voter: voter.clone(),
            outcome,
            leaker: leaker.clone(),
        });
        Ok(())
    }

    pub fn reveal<O: VotingOwner>(
        &mut self,
        owner: &mut O,
        vote_id: VoteId,
        voter: &AccountId,
        outcome: Outcome,
        salt: &[u8],
    ) -> Result<(), VoteFailure<O::Error>> {
        self.check_commitment(vote_id, voter, outcome, salt)?;
        let possible = self.vote(vote_id)?.possible_outcomes;
        if !outcome.is_valid_ruling(possible) {
            return Err(VotingError::InvalidOutcome {
                vote: vote_id,
                outcome,
            }
            .into());
        }
        let weight = owner
            .ensure_can_reveal(vote_id, voter)
            .map_err(VoteFailure::Owner)?;

        let vote = self.vote_mut(vote_id)?;
        if let Some(cast) = vote.voters.get_mut(voter) {
            cast.outcome = outcome;
        }
        vote.add_to_tally(outcome, weight);
        tracing::debug!(vote = %vote_id, voter = %voter, outcome = %outcome, weight, "vote revealed");
        self.events.push(VotingEvent::VoteRevealed {
            vote: vote_id,
            voter: voter.clone(),
            outcome,
            weight,
        });
        Ok(())
    }

    /// Outcome recorded for `voter`: missing until revealed.
    pub fn voter_outcome(&self, vote: VoteId, voter: &AccountId) -> Result<Outcome, VotingError> {
        Ok(self
            .vote(vote)?
            .voters
            .get(voter)
            .map(|cast| cast.outcome)
            .unwrap_or(Outcome::MISSING))
    }

    pub fn outcome_tally(&self, vote: VoteId, outcome: Outcome) -> Result<u64, VotingError> {
        Ok(self.vote(vote)?.tally_of(outcome))
    }

    /// Highest-tallied outcome; refused when nothing was revealed.
    pub fn winning_outcome(&self, vote: VoteId) -> Result<Outcome, VotingError> {
        Ok(self.vote(vote)?.winning())
    }

    /// Whether `voter` revealed `outcome`. Leaked votes never count.
    pub fn has_voted_in_favor_of(
        &self,
        vote: VoteId,
        outcome: Outcome,
        voter: &AccountId,
    ) -> Result<bool, VotingError> {
        let recorded = self.voter_outcome(vote, voter)?;
        Ok(outcome.is_valid_ruling(self.vote(vote)?.possible_outcomes) && recorded == outcome)
    }

    pub fn tally(&self, vote: VoteId) -> Result<Tally, VotingError> {
        let vote = self.vote(vote)?;
        Ok(Tally {
            winning_outcome: vote.winning(),
            total_weight: vote.tallies.values().fold(0u64, |acc, w| acc.saturating_add(*w)),
            weights: vote.tallies.clone(),
        })
    }

    /// Take the events recorded since the last drain.
    pub fn drain_events(&mut self) -> Vec<VotingEvent> {
        std::mem::take(&mut self.events)
    }

    fn check_commitment(
        &self,
        vote_id: VoteId,
        voter: &AccountId,
        outcome: Outcome,
        salt: &[u8],
    ) -> Result<(), VotingError> {
        let cast = self
            .vote(vote_id)?
            .voters
            .get(voter)
            .ok_or_else(|| VotingError::VoteNotCommitted {
                vote: vote_id,
                voter: voter.clone(),
            })?;
        if !cast.outcome.is_missing() {
            return Err(VotingError::VoteAlreadyRevealed {
                vote: vote_id,
                voter: voter.clone(),
                outcome: cast.outcome,
            });
        }
        if cast.commitment != Commitment::new(outcome, salt) {
            return Err(VotingError::InvalidCommitmentSalt {
                vote: vote_id,
                voter: voter.clone(),
            });
        }
        Ok(())
    }

    fn vote(&self, vote: VoteId) -> Result<&Vote, VotingError> {
        self.votes
            .get(&vote)
            .ok_or(VotingError::VoteDoesNotExist(vote))
    }

    fn vote_mut(&mut self, vote: VoteId) -> Result<&mut Vote, VotingError> {
        self.votes
            .get_mut(&vote)
            .ok_or(VotingError::VoteDoesNotExist(vote))
    }
}
