//! # Court Events
//!
//! Every state change the court makes is recorded as a [`CourtEvent`] and
//! kept until the caller drains it.

use court_core::{AccountId, Amount, DisputeId, Outcome, RoundId, TermId};
use court_voting::VotingEvent;
use serde::{Deserialize, Serialize};

use crate::dispute::DisputeState;

/// Why an escalation round collapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollapseReason {
    /// The confirmer backed the appealed ruling.
    VacuousConfirmation,
    /// The confirmation window closed without a confirmer.
    Unconfirmed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CourtEvent {
    Heartbeat {
        previous: TermId,
        current: TermId,
    },
    ConfigChanged {
        term: TermId,
        changes: u32,
    },
    NewDispute {
        dispute: DisputeId,
        subject: AccountId,
        creator: AccountId,
        possible_rulings: u8,
        draft_term: TermId,
        jurors_number: u64,
    },
    JurorDrafted {
        dispute: DisputeId,
        round: RoundId,
        juror: AccountId,
    },
    DisputeStateChanged {
        dispute: DisputeId,
        state: DisputeState,
    },
    RulingAppealed {
        dispute: DisputeId,
        round: RoundId,
        appellant: AccountId,
        ruling: Outcome,
    },
    RulingAppealConfirmed {
        dispute: DisputeId,
        round: RoundId,
        confirmer: AccountId,
        ruling: Outcome,
        next_round: RoundId,
        draft_term: TermId,
        jurors_number: u64,
    },
    AppealCollapsed {
        dispute: DisputeId,
        round: RoundId,
        reason: CollapseReason,
    },
    RulingExecuted {
        dispute: DisputeId,
        ruling: Outcome,
    },
    PenaltiesSettled {
        dispute: DisputeId,
        round: RoundId,
        collected_tokens: Amount,
        coherent_jurors: u64,
    },
    RewardSettled {
        dispute: DisputeId,
        round: RoundId,
        juror: AccountId,
        tokens: Amount,
        fees: Amount,
    },
    AppealDepositSettled {
        dispute: DisputeId,
        round: RoundId,
    },
    MaxJurorsPerDraftBatchChanged {
        previous: u64,
        current: u64,
    },
    Vote {
        vote: VotingEvent,
    },
}

impl From<VotingEvent> for CourtEvent {
    fn from(vote: VotingEvent) -> Self {
        Self::Vote { vote }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use court_core::VoteId;

    #[test]
    fn events_serialize_with_tag() {
        let event = CourtEvent::DisputeStateChanged {
            dispute: DisputeId(2),
            state: DisputeState::Adjudicating,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "dispute_state_changed");
        assert_eq!(json["state"], "Adjudicating");
    }

    #[test]
    fn vote_events_nest_their_own_tag() {
        let event = CourtEvent::from(VotingEvent::VoteRevealed {
            vote: VoteId::for_round(DisputeId(0), RoundId(1)),
            voter: AccountId::new("juror").unwrap(),
            outcome: Outcome::option(1),
            weight: 2,
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "vote");
        assert_eq!(json["vote"]["event"], "vote_revealed");
        assert_eq!(json["vote"]["weight"], 2);
    }
}
