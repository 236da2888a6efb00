//! # Disputes and Rounds
//!
//! A dispute owns an append-only list of rounds. Round 0 is opened at
//! creation; each appeal opens the next round, and the round at index
//! `max_regular_appeal_rounds` is the final one, which is not drafted.
//!
//! ## Phases
//!
//! A round's phase is never stored. It is recomputed from the round, the
//! dispute's phase lengths and the court's last ensured term:
//!
//! ```text
//! start = draft_term + delayed_terms
//!
//! Invalid           not fully drafted, awaiting confirmation, or collapsed
//! Committing        start            ≤ t < start + C
//! Revealing         start + C        ≤ t < start + C + R
//! Appealing         start + C + R    ≤ t < start + C + R + A      (regular rounds)
//! ConfirmingAppeal  start + C + R + A ≤ t < … + A + F              (appealed, not answered)
//! Ended             otherwise
//! ```
//!
//! Final rounds end right after their reveal phase.

use std::collections::BTreeMap;

use court_core::{AccountId, Amount, DisputeId, Outcome, RoundId, TermId, TermsConfig};
use serde::{Deserialize, Serialize};

/// Weight units shared among final-round voters.
pub const FINAL_ROUND_WEIGHT_PRECISION: u64 = 1_000;

// ── Dispute State ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DisputeState {
    /// The last round is waiting to be drafted.
    PreDraft,
    /// The last round is drafted and in its voting/appeal cycle.
    Adjudicating,
    /// The final ruling has been computed.
    Ruled,
    /// The ruling was delivered to the subject. Terminal state.
    Executed,
}

impl DisputeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreDraft => "PRE_DRAFT",
            Self::Adjudicating => "ADJUDICATING",
            Self::Ruled => "RULED",
            Self::Executed => "EXECUTED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Executed)
    }

    pub fn valid_transitions(&self) -> &'static [DisputeState] {
        match self {
            Self::PreDraft => &[Self::Adjudicating],
            Self::Adjudicating => &[Self::PreDraft, Self::Ruled],
            Self::Ruled => &[Self::Executed],
            Self::Executed => &[],
        }
    }

    pub fn can_transition_to(&self, target: DisputeState) -> bool {
        self.valid_transitions().contains(&target)
    }
}

impl std::fmt::Display for DisputeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Round Phase ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoundPhase {
    Invalid,
    Committing,
    Revealing,
    Appealing,
    ConfirmingAppeal,
    Ended,
}

impl RoundPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Invalid => "INVALID",
            Self::Committing => "COMMITTING",
            Self::Revealing => "REVEALING",
            Self::Appealing => "APPEALING",
            Self::ConfirmingAppeal => "CONFIRMING_APPEAL",
            Self::Ended => "ENDED",
        }
    }
}

impl std::fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a round takes part in adjudication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoundStatus {
    Active,
    /// Opened by an appeal that has not been confirmed yet.
    AwaitingConfirmation,
    /// Invalidated by a vacuous or missing confirmation.
    Collapsed,
}

// ── Records ─────────────────────────────────────────────────────────────

/// A juror's stake in one round.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JurorParticipation {
    /// Drafted slots, or stake-proportional weight in a final round.
    pub weight: u64,
    /// Stake locked in a regular round, or collected in a final round.
    pub locked: Amount,
    pub rewarded: bool,
}

/// Fees that fund a round.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundFees {
    /// Shared among coherent jurors.
    pub juror_fees: Amount,
    /// Paid per drafted slot.
    pub draft_fee: Amount,
    /// Paid per settled slot in regular rounds; the whole settlement fee in
    /// final rounds.
    pub settle_fee: Amount,
    /// Everything the funding parties deposited for the round.
    pub total: Amount,
}

/// An appeal lodged against a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appeal {
    pub appellant: AccountId,
    pub appealed_ruling: Outcome,
    pub appeal_deposit: Amount,
    pub confirmer: Option<AccountId>,
    /// `missing` until confirmed.
    pub confirmed_ruling: Outcome,
    pub confirm_deposit: Amount,
    /// Cost of the round the appeal funds.
    pub round_cost: Amount,
    /// Confirmation was vacuous or never came.
    pub collapsed: bool,
    pub deposits_settled: bool,
}

impl Appeal {
    pub fn is_confirmed(&self) -> bool {
        self.confirmer.is_some()
    }

    /// The appeal no longer waits for a confirmer.
    pub fn is_answered(&self) -> bool {
        self.is_confirmed() || self.collapsed
    }
}

/// One adjudication round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    pub id: RoundId,
    pub is_final: bool,
    pub status: RoundStatus,
    pub draft_term: TermId,
    pub delayed_terms: u64,
    pub jurors_number: u64,
    pub selected_jurors: u64,
    /// Draws consumed so far; never reset.
    pub draft_nonce: u64,
    pub fees: RoundFees,
    /// Stake locked per drafted slot.
    pub lock_per_slot: Amount,
    /// Total active stake when a final round opened.
    pub final_total_active: Amount,
    pub triggered_by: AccountId,
    /// Distinct participants in draft (or commit) order.
    pub jurors: Vec<AccountId>,
    pub participants: BTreeMap<AccountId, JurorParticipation>,
    pub settled_penalties: bool,
    pub collected_tokens: Amount,
    pub coherent_jurors: u64,
    /// Settlement cursor into `jurors`.
    pub settled_jurors: usize,
    pub appeal: Option<Appeal>,
}

impl Round {
    /// An empty active round; callers fill in panel size and fees.
    pub fn new(id: RoundId, draft_term: TermId, triggered_by: AccountId) -> Self {
        Self {
            id,
            is_final: false,
            status: RoundStatus::Active,
            draft_term,
            delayed_terms: 0,
            jurors_number: 0,
            selected_jurors: 0,
            draft_nonce: 0,
            fees: RoundFees::default(),
            lock_per_slot: Amount::ZERO,
            final_total_active: Amount::ZERO,
            triggered_by,
            jurors: Vec::new(),
            participants: BTreeMap::new(),
            settled_penalties: false,
            collected_tokens: Amount::ZERO,
            coherent_jurors: 0,
            settled_jurors: 0,
            appeal: None,
        }
    }

    pub fn is_fully_drafted(&self) -> bool {
        self.selected_jurors >= self.jurors_number
    }

    /// First term of the commit phase.
    pub fn start_term(&self) -> TermId {
        self.draft_term.plus(self.delayed_terms)
    }

    pub fn reveal_end_term(&self, terms: &TermsConfig) -> TermId {
        self.start_term()
            .plus(terms.commit_terms)
            .plus(terms.reveal_terms)
    }

    /// First term after the appeal window.
    pub fn appeal_end_term(&self, terms: &TermsConfig) -> TermId {
        self.reveal_end_term(terms).plus(terms.appeal_terms)
    }

    /// First term after the confirmation window: the draft term of the
    /// round an appeal of this one opens.
    pub fn confirm_end_term(&self, terms: &TermsConfig) -> TermId {
        self.appeal_end_term(terms).plus(terms.appeal_confirm_terms)
    }

    pub fn phase(&self, terms: &TermsConfig, term: TermId) -> RoundPhase {
        if self.status != RoundStatus::Active || !self.is_fully_drafted() {
            return RoundPhase::Invalid;
        }
        let start = self.start_term();
        if term < start {
            return RoundPhase::Invalid;
        }
        if term < start.plus(terms.commit_terms) {
            return RoundPhase::Committing;
        }
        if term < self.reveal_end_term(terms) {
            return RoundPhase::Revealing;
        }
        if self.is_final {
            return RoundPhase::Ended;
        }
        if term < self.appeal_end_term(terms) {
            return RoundPhase::Appealing;
        }
        match &self.appeal {
            Some(appeal) if !appeal.is_answered() && term < self.confirm_end_term(terms) => {
                RoundPhase::ConfirmingAppeal
            }
            _ => RoundPhase::Ended,
        }
    }

    pub fn participant(&self, juror: &AccountId) -> Option<&JurorParticipation> {
        self.participants.get(juror)
    }

    pub fn weight_of(&self, juror: &AccountId) -> u64 {
        self.participant(juror).map(|p| p.weight).unwrap_or(0)
    }

    /// Sum of all participants' weights.
    pub fn total_weight(&self) -> u64 {
        self.participants
            .values()
            .fold(0u64, |acc, p| acc.saturating_add(p.weight))
    }
}

/// A dispute and its rounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispute {
    pub id: DisputeId,
    pub subject: AccountId,
    pub creator: AccountId,
    pub possible_rulings: u8,
    pub state: DisputeState,
    /// `missing` until computed.
    pub final_ruling: Outcome,
    /// Phase lengths in force when the dispute was created.
    pub terms: TermsConfig,
    pub max_regular_appeal_rounds: u64,
    pub appeal_step_factor: u64,
    pub rounds: Vec<Round>,
}

impl Dispute {
    pub fn round(&self, id: RoundId) -> Option<&Round> {
        self.rounds.get(id.index())
    }

    pub fn round_mut(&mut self, id: RoundId) -> Option<&mut Round> {
        self.rounds.get_mut(id.index())
    }

    pub fn last_round(&self) -> Option<&Round> {
        self.rounds.last()
    }

    pub fn last_round_id(&self) -> RoundId {
        RoundId(self.rounds.len().saturating_sub(1) as u64)
    }

    pub fn phase_of(&self, round: &Round, term: TermId) -> RoundPhase {
        round.phase(&self.terms, term)
    }

    /// The last active round: the one whose outcome decides the dispute.
    pub fn decisive_round(&self) -> Option<&Round> {
        self.rounds
            .iter()
            .rev()
            .find(|r| r.status == RoundStatus::Active)
    }

    /// Panel size of the round an appeal of round `id` would open.
    pub fn next_round_jurors(&self, previous: u64) -> u64 {
        let next = previous.saturating_mul(self.appeal_step_factor);
        if next % 2 == 0 {
            next.saturating_add(1)
        } else {
            next
        }
    }

    /// Whether the round after `id` is the final round.
    pub fn is_final_round_index(&self, id: RoundId) -> bool {
        id.get() >= self.max_regular_appeal_rounds
    }
}
