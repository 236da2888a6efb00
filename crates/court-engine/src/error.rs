//! # Court Errors
//!
//! Every rejected operation leaves court state unchanged. Variants name the
//! dispute, round and phase involved so a caller can tell which rule fired.

use court_clock::ClockError;
use court_core::{AccountId, Amount, CoreError, DisputeId, Outcome, RoundId};
use court_registry::StakeError;
use court_voting::VotingError;
use thiserror::Error;

use crate::dispute::{DisputeState, RoundPhase};
use crate::fees::FeeError;

/// Coarse classification of a [`CourtError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or out-of-range input.
    Validation,
    /// The clock or randomness is not ready; retry after advancing.
    Temporal,
    /// The operation is not allowed in the current dispute or round state.
    StateMachine,
    /// A token movement failed.
    Economic,
    /// Arithmetic overflow or corrupted bookkeeping.
    Integrity,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CourtError {
    #[error("{0} does not exist")]
    DisputeDoesNotExist(DisputeId),

    #[error("{round} of {dispute} does not exist")]
    RoundDoesNotExist { dispute: DisputeId, round: RoundId },

    /// Possible rulings outside the configured bounds.
    #[error("{requested} possible rulings requested, allowed range is {min}..={max}")]
    InvalidRulingOptions { requested: u8, min: u8, max: u8 },

    /// The subject is behind on its court subscription.
    #[error("subject {subject} is not up to date with its subscription")]
    SubscriptionNotPaid { subject: AccountId },

    #[error("deposit of {amount} from {payer} failed: {source}")]
    DepositFailed {
        payer: AccountId,
        amount: Amount,
        #[source]
        source: FeeError,
    },

    #[error("transfer of {amount} to {recipient} failed: {source}")]
    TokenTransferFailed {
        recipient: AccountId,
        amount: Amount,
        #[source]
        source: FeeError,
    },

    #[error("{round} of {dispute} is already drafted")]
    RoundAlreadyDrafted { dispute: DisputeId, round: RoundId },

    /// The round was opened by an appeal nobody has confirmed yet.
    #[error("{round} of {dispute} is awaiting appeal confirmation")]
    RoundAwaitingConfirmation { dispute: DisputeId, round: RoundId },

    #[error("invalid draft batch size {requested} (maximum {max})")]
    InvalidBatchSize { requested: u64, max: u64 },

    #[error("no active stake to draft from")]
    NoActiveJurors,

    #[error("cannot {operation} {round} of {dispute} in phase {phase}")]
    InvalidAdjudicationState {
        dispute: DisputeId,
        round: RoundId,
        phase: RoundPhase,
        operation: &'static str,
    },

    #[error("cannot {operation} {dispute} in state {state}")]
    InvalidDisputeState {
        dispute: DisputeId,
        state: DisputeState,
        operation: &'static str,
    },

    #[error("{round} of {dispute} is final and cannot be appealed")]
    RoundIsFinal { dispute: DisputeId, round: RoundId },

    #[error("{round} of {dispute} was already appealed")]
    AppealAlreadyMade { dispute: DisputeId, round: RoundId },

    #[error("ruling {ruling} is not a valid appeal of {round} of {dispute}: {reason}")]
    InvalidAppealRuling {
        dispute: DisputeId,
        round: RoundId,
        ruling: Outcome,
        reason: &'static str,
    },

    /// The juror holds no weight in the round.
    #[error("{juror} has no weight in {round} of {dispute}")]
    JurorHasNoWeight {
        dispute: DisputeId,
        round: RoundId,
        juror: AccountId,
    },

    #[error("{round} of {dispute} cannot settle before the previous round")]
    PreviousRoundNotSettled { dispute: DisputeId, round: RoundId },

    #[error("penalties of {round} of {dispute} are already settled")]
    RoundAlreadySettled { dispute: DisputeId, round: RoundId },

    #[error("penalties of {round} of {dispute} are not settled yet")]
    RoundPenaltiesNotSettled { dispute: DisputeId, round: RoundId },

    #[error("{juror} was already rewarded in {round} of {dispute}")]
    JurorAlreadyRewarded {
        dispute: DisputeId,
        round: RoundId,
        juror: AccountId,
    },

    #[error("{juror} did not take part in {round} of {dispute}")]
    WontRewardNonVoterJuror {
        dispute: DisputeId,
        round: RoundId,
        juror: AccountId,
    },

    #[error("{juror} did not vote for the final ruling of {dispute}")]
    WontRewardIncoherentJuror {
        dispute: DisputeId,
        round: RoundId,
        juror: AccountId,
    },

    /// The round has no confirmed appeal whose deposits could be settled.
    #[error("{round} of {dispute} has no confirmed appeal")]
    RoundNotAppealed { dispute: DisputeId, round: RoundId },

    #[error("appeal deposits of {round} of {dispute} are already settled")]
    AppealDepositAlreadySettled { dispute: DisputeId, round: RoundId },

    #[error(transparent)]
    Clock(#[from] ClockError),

    #[error(transparent)]
    Stake(#[from] StakeError),

    #[error(transparent)]
    Voting(#[from] VotingError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl CourtError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRulingOptions { .. }
            | Self::SubscriptionNotPaid { .. }
            | Self::InvalidBatchSize { .. }
            | Self::InvalidAppealRuling { .. }
            | Self::DisputeDoesNotExist(_)
            | Self::RoundDoesNotExist { .. } => ErrorKind::Validation,
            Self::Clock(ClockError::Core(_)) => ErrorKind::Integrity,
            Self::Clock(ClockError::InvalidTransitionCount) => ErrorKind::Validation,
            Self::Clock(_) => ErrorKind::Temporal,
            Self::DepositFailed { .. }
            | Self::TokenTransferFailed { .. }
            | Self::NoActiveJurors
            | Self::Stake(_) => ErrorKind::Economic,
            Self::Core(_) => ErrorKind::Integrity,
            Self::Voting(VotingError::InvalidCommitmentSalt { .. })
            | Self::Voting(VotingError::InvalidOutcome { .. })
            | Self::Voting(VotingError::InvalidOutcomesAmount { .. }) => ErrorKind::Validation,
            _ => ErrorKind::StateMachine,
        }
    }

    /// The underlying round can never make progress: its draft seed is gone.
    pub fn is_terminal_stall(&self) -> bool {
        matches!(self, Self::Clock(ClockError::RandomnessUnavailable { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use court_core::TermId;

    fn id(name: &str) -> AccountId {
        AccountId::new(name).unwrap()
    }

    #[test]
    fn adjudication_state_display_names_round_and_phase() {
        let err = CourtError::InvalidAdjudicationState {
            dispute: DisputeId(4),
            round: RoundId(1),
            phase: RoundPhase::Revealing,
            operation: "commit",
        };
        let msg = format!("{err}");
        assert!(msg.contains("dispute:4"));
        assert!(msg.contains("round:1"));
        assert!(msg.contains("REVEALING"));
        assert!(msg.contains("commit"));
    }

    #[test]
    fn deposit_failure_keeps_source() {
        let err = CourtError::DepositFailed {
            payer: id("creator"),
            amount: Amount::new(240),
            source: FeeError::InsufficientFunds {
                holder: id("creator"),
                requested: Amount::new(240),
                balance: Amount::new(10),
            },
        };
        assert!(std::error::Error::source(&err).is_some());
        assert!(format!("{err}").contains("240"));
        assert_eq!(err.kind(), ErrorKind::Economic);
    }

    #[test]
    fn clock_errors_are_temporal() {
        let err: CourtError = ClockError::TermOutdated {
            last_ensured: TermId(1),
            current: TermId(2),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Temporal);
        assert!(!err.is_terminal_stall());
    }

    #[test]
    fn unavailable_randomness_is_terminal() {
        let err: CourtError = ClockError::RandomnessUnavailable {
            term: TermId(1),
            block: 2,
            current_block: 300,
        }
        .into();
        assert!(err.is_terminal_stall());
        assert_eq!(err.kind(), ErrorKind::Temporal);
    }

    #[test]
    fn kinds_cover_state_machine_and_validation() {
        assert_eq!(
            CourtError::RoundAlreadySettled {
                dispute: DisputeId(0),
                round: RoundId(0),
            }
            .kind(),
            ErrorKind::StateMachine
        );
        assert_eq!(
            CourtError::InvalidBatchSize {
                requested: 0,
                max: 64,
            }
            .kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            CourtError::Core(CoreError::AmountOverflow { operation: "add" }).kind(),
            ErrorKind::Integrity
        );
    }

    #[test]
    fn all_variants_are_debug() {
        let errors = vec![
            CourtError::DisputeDoesNotExist(DisputeId(1)),
            CourtError::NoActiveJurors,
            CourtError::SubscriptionNotPaid {
                subject: id("subject"),
            },
            CourtError::WontRewardIncoherentJuror {
                dispute: DisputeId(1),
                round: RoundId(0),
                juror: id("juror"),
            },
            CourtError::AppealDepositAlreadySettled {
                dispute: DisputeId(1),
                round: RoundId(0),
            },
        ];
        for err in &errors {
            assert!(!format!("{err:?}").is_empty());
        }
    }
}
