//! # Clock Errors
//!
//! Temporal gating failures. All are recoverable by advancing the clock and
//! retrying, except [`ClockError::RandomnessUnavailable`].

use court_core::{CoreError, TermId};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClockError {
    /// A heartbeat was requested with a zero transition budget.
    #[error("heartbeat must allow at least one transition")]
    InvalidTransitionCount,

    /// More transitions are pending than the caller allowed.
    #[error("{needed} term transitions needed, at most {max} allowed")]
    TooManyTransitions {
        /// Transitions between the last ensured and the current term.
        needed: u64,
        /// The transition budget of the call.
        max: u64,
    },

    /// The clock lags behind wall-clock time.
    #[error("term outdated: last ensured {last_ensured}, current {current}")]
    TermOutdated {
        last_ensured: TermId,
        current: TermId,
    },

    /// The requested term has not been ensured yet.
    #[error("{term} does not exist yet (last ensured {last_ensured})")]
    TermDoesNotExist {
        term: TermId,
        last_ensured: TermId,
    },

    /// The term's randomness block has not been produced yet.
    #[error("randomness for {term} not yet available: block {block}, current block {current_block}")]
    RandomnessNotYetAvailable {
        term: TermId,
        block: u64,
        current_block: u64,
    },

    /// The term's randomness block fell out of the lookup window.
    #[error("randomness for {term} is permanently unavailable: block {block}, current block {current_block}")]
    RandomnessUnavailable {
        term: TermId,
        block: u64,
        current_block: u64,
    },

    /// Configuration changes can only target terms after the last ensured one.
    #[error("cannot schedule configuration for {term}: last ensured is {last_ensured}")]
    ConfigTermInPast {
        term: TermId,
        last_ensured: TermId,
    },

    #[error(transparent)]
    Core(#[from] CoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_many_transitions_display() {
        let err = ClockError::TooManyTransitions { needed: 4, max: 1 };
        let msg = format!("{err}");
        assert!(msg.contains('4'));
        assert!(msg.contains('1'));
    }

    #[test]
    fn term_outdated_display() {
        let err = ClockError::TermOutdated {
            last_ensured: TermId(2),
            current: TermId(3),
        };
        let msg = format!("{err}");
        assert!(msg.contains("term:2"));
        assert!(msg.contains("term:3"));
    }

    #[test]
    fn randomness_errors_name_blocks() {
        let err = ClockError::RandomnessUnavailable {
            term: TermId(5),
            block: 100,
            current_block: 400,
        };
        let msg = format!("{err}");
        assert!(msg.contains("term:5"));
        assert!(msg.contains("100"));
        assert!(msg.contains("400"));
    }

    #[test]
    fn all_variants_are_debug() {
        let errors = vec![
            ClockError::InvalidTransitionCount,
            ClockError::TermDoesNotExist {
                term: TermId(3),
                last_ensured: TermId(2),
            },
            ClockError::RandomnessNotYetAvailable {
                term: TermId(1),
                block: 10,
                current_block: 10,
            },
            ClockError::ConfigTermInPast {
                term: TermId(1),
                last_ensured: TermId(1),
            },
        ];
        for err in &errors {
            assert!(!format!("{err:?}").is_empty());
        }
    }
}
