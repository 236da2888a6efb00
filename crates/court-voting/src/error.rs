//! # Voting Errors

use court_core::{AccountId, Outcome, VoteId};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VotingError {
    #[error("{0} does not exist")]
    VoteDoesNotExist(VoteId),

    #[error("{0} already exists")]
    VoteAlreadyExists(VoteId),

    /// A vote needs at least two ruling options.
    #[error("{vote} cannot be created with {possible_outcomes} possible outcomes")]
    InvalidOutcomesAmount { vote: VoteId, possible_outcomes: u8 },

    #[error("voter {voter} already committed to {vote}")]
    VoteAlreadyCommitted { vote: VoteId, voter: AccountId },

    #[error("voter {voter} has no commitment in {vote}")]
    VoteNotCommitted { vote: VoteId, voter: AccountId },

    /// The vote was already revealed or leaked.
    #[error("vote of {voter} in {vote} was already {outcome}")]
    VoteAlreadyRevealed {
        vote: VoteId,
        voter: AccountId,
        outcome: Outcome,
    },

    /// Outcome and salt do not hash to the stored commitment.
    #[error("outcome and salt do not match the commitment of {voter} in {vote}")]
    InvalidCommitmentSalt { vote: VoteId, voter: AccountId },

    /// Only refused or a ruling option can be revealed.
    #[error("outcome {outcome} is not valid for {vote}")]
    InvalidOutcome { vote: VoteId, outcome: Outcome },
}

#[cfg(test)]
mod tests {
    use super::*;
    use court_core::{DisputeId, RoundId};

    fn vote() -> VoteId {
        VoteId::for_round(DisputeId(2), RoundId(1))
    }

    #[test]
    fn invalid_commitment_salt_display() {
        let err = VotingError::InvalidCommitmentSalt {
            vote: vote(),
            voter: AccountId::new("juror-9").unwrap(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("juror-9"));
        assert!(msg.contains("vote:2/1"));
    }

    #[test]
    fn already_revealed_names_outcome() {
        let err = VotingError::VoteAlreadyRevealed {
            vote: vote(),
            voter: AccountId::new("juror-9").unwrap(),
            outcome: Outcome::LEAKED,
        };
        assert!(format!("{err}").contains("leaked"));
    }

    #[test]
    fn all_variants_are_debug() {
        let errors = vec![
            VotingError::VoteDoesNotExist(vote()),
            VotingError::VoteAlreadyExists(vote()),
            VotingError::InvalidOutcomesAmount {
                vote: vote(),
                possible_outcomes: 1,
            },
            VotingError::InvalidOutcome {
                vote: vote(),
                outcome: Outcome(9),
            },
        ];
        for err in &errors {
            assert!(!format!("{err:?}").is_empty());
        }
    }
}
