//! # Court
//!
//! The [`Court`] facade owns the term clock, the dispute records and the
//! commit-reveal vote store, and reaches its collaborators (chain, stake
//! ledger, fee ledger, eligibility gate, arbitrable subjects) through trait
//! objects bundled in [`Collaborators`].
//!
//! ## Lifecycle
//!
//! ```text
//! create_dispute ─▶ PreDraft ─draft─▶ Adjudicating ─(phases elapse)─▶ Ruled ─▶ Executed
//!                       ▲                   │
//!                       └── confirm_appeal ◀┘ appeal
//! ```
//!
//! Only dispute creation advances the clock by itself. Every other
//! time-gated operation requires the clock to be up to date and fails with
//! `TermOutdated` otherwise.
//!
//! Validation happens before mutation: a rejected call leaves the court,
//! the stake ledger and the fee ledger as they were.

use std::collections::BTreeMap;

use court_clock::{CourtClock, RandomnessSource, TermTransition, TimeSource};
use court_core::{
    AccountId, Amount, CourtConfig, DisputeId, GenesisConfig, Outcome, RoundId, TermId, Timestamp,
    VoteId, PCT_BASE,
};
use court_registry::StakeLedger;
use court_voting::{CRVoting, Commitment, Tally, VoteFailure, VotingOwner};
use serde::Serialize;

use crate::dispute::{
    Appeal, Dispute, DisputeState, JurorParticipation, Round, RoundFees, RoundPhase, RoundStatus,
    FINAL_ROUND_WEIGHT_PRECISION,
};
use crate::error::CourtError;
use crate::events::{CollapseReason, CourtEvent};
use crate::fees::{FeeError, FeeLedger};
use crate::subjects::{Arbitrable, EligibilityGate, RulingRecorder, SubscriptionRoster};

// ── Collaborators ───────────────────────────────────────────────────────

/// Time and randomness provider.
pub trait Chain: TimeSource + RandomnessSource + Send {}

impl<T: TimeSource + RandomnessSource + Send> Chain for T {}

/// External systems the court consumes.
pub struct Collaborators {
    pub chain: Box<dyn Chain>,
    pub stake: Box<dyn StakeLedger + Send>,
    pub fees: Box<dyn FeeLedger + Send>,
    pub eligibility: Box<dyn EligibilityGate + Send>,
    pub subjects: Box<dyn Arbitrable + Send>,
}

impl Collaborators {
    /// Bundle a chain with stake and fee ledgers. Every subject starts out
    /// eligible and rulings are recorded in a fresh [`RulingRecorder`].
    pub fn new(
        chain: impl Chain + 'static,
        stake: impl StakeLedger + Send + 'static,
        fees: impl FeeLedger + Send + 'static,
    ) -> Self {
        Self {
            chain: Box::new(chain),
            stake: Box::new(stake),
            fees: Box::new(fees),
            eligibility: Box::new(SubscriptionRoster::new()),
            subjects: Box::new(RulingRecorder::new()),
        }
    }

    pub fn with_eligibility(mut self, gate: impl EligibilityGate + Send + 'static) -> Self {
        self.eligibility = Box::new(gate);
        self
    }

    pub fn with_subjects(mut self, subjects: impl Arbitrable + Send + 'static) -> Self {
        self.subjects = Box::new(subjects);
        self
    }
}

// ── Views ───────────────────────────────────────────────────────────────

/// Round summary with its computed phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundView {
    pub round: RoundId,
    pub phase: RoundPhase,
    pub status: RoundStatus,
    pub is_final: bool,
    pub draft_term: TermId,
    pub delayed_terms: u64,
    pub jurors_number: u64,
    pub selected_jurors: u64,
    pub triggered_by: AccountId,
    pub settled_penalties: bool,
    pub collected_tokens: Amount,
    pub coherent_jurors: u64,
    pub appealed: bool,
}

/// A juror's standing in one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JurorView {
    pub weight: u64,
    pub locked: Amount,
    pub rewarded: bool,
}

// ── Court State ─────────────────────────────────────────────────────────

/// Everything but the vote store; the vote store borrows this as its owner.
pub(crate) struct CourtState {
    pub(crate) clock: CourtClock,
    base_config: CourtConfig,
    /// Configurations taking effect from the keyed term on.
    scheduled_configs: BTreeMap<TermId, CourtConfig>,
    pub(crate) disputes: Vec<Dispute>,
    pub(crate) collab: Collaborators,
    pub(crate) events: Vec<CourtEvent>,
}

impl CourtState {
    pub(crate) fn now(&self) -> Timestamp {
        self.collab.chain.now()
    }

    pub(crate) fn require_up_to_date(&self) -> Result<TermId, CourtError> {
        Ok(self.clock.require_up_to_date(self.now())?)
    }

    /// The configuration governing `term`.
    pub(crate) fn config_at(&self, term: TermId) -> &CourtConfig {
        self.scheduled_configs
            .range(..=term)
            .next_back()
            .map(|(_, config)| config)
            .unwrap_or(&self.base_config)
    }

    pub(crate) fn dispute(&self, id: DisputeId) -> Result<&Dispute, CourtError> {
        usize::try_from(id.get())
            .ok()
            .and_then(|i| self.disputes.get(i))
            .ok_or(CourtError::DisputeDoesNotExist(id))
    }

    pub(crate) fn dispute_mut(&mut self, id: DisputeId) -> Result<&mut Dispute, CourtError> {
        usize::try_from(id.get())
            .ok()
            .and_then(|i| self.disputes.get_mut(i))
            .ok_or(CourtError::DisputeDoesNotExist(id))
    }

    pub(crate) fn round(&self, id: DisputeId, round: RoundId) -> Result<&Round, CourtError> {
        self.dispute(id)?
            .round(round)
            .ok_or(CourtError::RoundDoesNotExist { dispute: id, round })
    }

    pub(crate) fn round_mut(
        &mut self,
        id: DisputeId,
        round: RoundId,
    ) -> Result<&mut Round, CourtError> {
        self.dispute_mut(id)?
            .round_mut(round)
            .ok_or(CourtError::RoundDoesNotExist { dispute: id, round })
    }

    /// Take a deposit from `payer` into escrow.
    pub(crate) fn collect_deposit(
        &mut self,
        payer: &AccountId,
        amount: Amount,
    ) -> Result<(), CourtError> {
        self.collab
            .fees
            .transfer_from(payer, amount)
            .map_err(|source| CourtError::DepositFailed {
                payer: payer.clone(),
                amount,
                source,
            })
    }

    /// Pay `amount` out of escrow.
    pub(crate) fn pay(&mut self, recipient: &AccountId, amount: Amount) -> Result<(), CourtError> {
        self.collab
            .fees
            .pay_to(recipient, amount)
            .map_err(|source| CourtError::TokenTransferFailed {
                recipient: recipient.clone(),
                amount,
                source,
            })
    }

    /// Fail unless escrow can cover `amount` paid to `recipient`.
    pub(crate) fn ensure_payable(
        &self,
        recipient: &AccountId,
        amount: Amount,
    ) -> Result<(), CourtError> {
        let escrow = self.collab.fees.escrow_balance();
        if escrow < amount {
            return Err(CourtError::TokenTransferFailed {
                recipient: recipient.clone(),
                amount,
                source: FeeError::InsufficientEscrow {
                    requested: amount,
                    escrow,
                },
            });
        }
        Ok(())
    }

    pub(crate) fn emit(&mut self, event: CourtEvent) {
        self.events.push(event);
    }

    pub(crate) fn set_dispute_state(&mut self, id: DisputeId, state: DisputeState) -> Result<(), CourtError> {
        let dispute = self.dispute_mut(id)?;
        if dispute.state == state {
            return Ok(());
        }
        if !dispute.state.can_transition_to(state) {
            return Err(CourtError::InvalidDisputeState {
                dispute: id,
                state: dispute.state,
                operation: "change state",
            });
        }
        dispute.state = state;
        tracing::info!(dispute = %id, state = %state, "dispute state changed");
        self.emit(CourtEvent::DisputeStateChanged { dispute: id, state });
        Ok(())
    }

    fn record_transitions(&mut self, transitions: &[TermTransition]) {
        for transition in transitions {
            self.emit(CourtEvent::Heartbeat {
                previous: transition.previous,
                current: transition.current,
            });
            if transition.config_changes > 0 {
                tracing::info!(term = %transition.current, changes = transition.config_changes, "configuration changed");
                self.emit(CourtEvent::ConfigChanged {
                    term: transition.current,
                    changes: transition.config_changes,
                });
            }
        }
    }

    /// Refund an unanswered appeal and collapse the round it opened.
    fn collapse_appeal(
        &mut self,
        id: DisputeId,
        round: RoundId,
        reason: CollapseReason,
    ) -> Result<(), CourtError> {
        let appeal = self
            .round(id, round)?
            .appeal
            .clone()
            .ok_or(CourtError::RoundNotAppealed { dispute: id, round })?;
        self.pay(&appeal.appellant, appeal.appeal_deposit)?;

        if let Some(appeal) = self.round_mut(id, round)?.appeal.as_mut() {
            appeal.collapsed = true;
            appeal.deposits_settled = true;
        }
        if let Ok(next) = self.round_mut(id, round.next()) {
            next.status = RoundStatus::Collapsed;
        }
        tracing::warn!(dispute = %id, round = %round, ?reason, "appeal collapsed");
        self.emit(CourtEvent::AppealCollapsed {
            dispute: id,
            round,
            reason,
        });
        Ok(())
    }

    /// Weight `juror` holds, or would receive on first commit, in a final
    /// round.
    fn final_weight_of(
        &self,
        id: DisputeId,
        round_id: RoundId,
        juror: &AccountId,
        term: TermId,
    ) -> Result<u64, CourtError> {
        let round = self.round(id, round_id)?;
        if !round.is_final {
            return Ok(0);
        }
        let held = round.weight_of(juror);
        if held > 0 {
            return Ok(held);
        }
        let share_pct = self.config_at(term).penalties.final_round_max_share_pct;
        let precision = round.jurors_number;
        let active = self.collab.stake.active_balance(juror);
        let proportional = if round.final_total_active.is_zero() {
            0
        } else {
            to_u64(active.mul_div(u128::from(precision), round.final_total_active.raw())?)
        };
        let cap = to_u64(Amount::from(precision).mul_div(u128::from(share_pct), PCT_BASE)?);
        let remaining = precision.saturating_sub(round.total_weight());
        Ok(proportional.min(cap).min(remaining))
    }

    /// Weight and pre-collected stake of a juror joining a final round.
    fn join_final_round(
        &mut self,
        id: DisputeId,
        round_id: RoundId,
        juror: &AccountId,
        term: TermId,
    ) -> Result<(), CourtError> {
        let penalties = self.config_at(term).penalties.clone();
        let weight = self.final_weight_of(id, round_id, juror, term)?;
        let active = self.collab.stake.active_balance(juror);
        if weight == 0 {
            return Err(CourtError::JurorHasNoWeight {
                dispute: id,
                round: round_id,
                juror: juror.clone(),
            });
        }

        let collected = active.pct(penalties.penalty_pct)?;
        self.collab.stake.collect(juror, collected)?;

        let round = self.round_mut(id, round_id)?;
        round.collected_tokens = round.collected_tokens.checked_add(collected)?;
        round.jurors.push(juror.clone());
        round.participants.insert(
            juror.clone(),
            JurorParticipation {
                weight,
                locked: collected,
                rewarded: false,
            },
        );
        tracing::debug!(dispute = %id, round = %round_id, juror = %juror, weight, collected = %collected, "juror joined final round");
        Ok(())
    }
}

impl VotingOwner for CourtState {
    type Error = CourtError;

    fn ensure_can_commit(&mut self, vote: VoteId, voter: &AccountId) -> Result<(), CourtError> {
        let term = self.require_up_to_date()?;
        let (id, round_id) = (vote.dispute(), vote.round());
        let dispute = self.dispute(id)?;
        let round = self.round(id, round_id)?;
        let phase = dispute.phase_of(round, term);
        if phase != RoundPhase::Committing {
            return Err(CourtError::InvalidAdjudicationState {
                dispute: id,
                round: round_id,
                phase,
                operation: "commit vote",
            });
        }
        if round.weight_of(voter) > 0 {
            return Ok(());
        }
        if round.is_final {
            return self.join_final_round(id, round_id, voter, term);
        }
        Err(CourtError::JurorHasNoWeight {
            dispute: id,
            round: round_id,
            juror: voter.clone(),
        })
    }

    fn ensure_can_reveal(&mut self, vote: VoteId, voter: &AccountId) -> Result<u64, CourtError> {
        let term = self.require_up_to_date()?;
        let (id, round_id) = (vote.dispute(), vote.round());
        let dispute = self.dispute(id)?;
        let round = self.round(id, round_id)?;
        let phase = dispute.phase_of(round, term);
        if phase != RoundPhase::Revealing {
            return Err(CourtError::InvalidAdjudicationState {
                dispute: id,
                round: round_id,
                phase,
                operation: "reveal vote",
            });
        }
        match round.weight_of(voter) {
            0 => Err(CourtError::JurorHasNoWeight {
                dispute: id,
                round: round_id,
                juror: voter.clone(),
            }),
            weight => Ok(weight),
        }
    }
}

// ── Court ───────────────────────────────────────────────────────────────

/// The staked-juror court.
pub struct Court {
    pub(crate) state: CourtState,
    pub(crate) voting: CRVoting,
}

impl Court {
    pub fn new(
        genesis: GenesisConfig,
        config: CourtConfig,
        collab: Collaborators,
    ) -> Result<Self, CourtError> {
        config.validate()?;
        let clock = CourtClock::new(genesis, collab.chain.current_block())?;
        tracing::info!(first_term_start = %clock.genesis().first_term_start, term_duration_secs = clock.genesis().term_duration_secs, "court created");
        Ok(Self {
            state: CourtState {
                clock,
                base_config: config,
                scheduled_configs: BTreeMap::new(),
                disputes: Vec::new(),
                collab,
                events: Vec::new(),
            },
            voting: CRVoting::new(),
        })
    }

    // ── Clock and configuration ─────────────────────────────────────────

    /// Ensure up to `max_transitions` pending terms.
    pub fn heartbeat(&mut self, max_transitions: u64) -> Result<Vec<TermTransition>, CourtError> {
        let now = self.state.now();
        let block = self.state.collab.chain.current_block();
        let transitions = self.state.clock.heartbeat(max_transitions, now, block)?;
        self.state.record_transitions(&transitions);
        Ok(transitions)
    }

    pub fn needed_transitions(&self) -> u64 {
        self.state.clock.needed_transitions(self.state.now())
    }

    pub fn last_ensured_term(&self) -> TermId {
        self.state.clock.last_ensured_term()
    }

    pub fn clock(&self) -> &CourtClock {
        &self.state.clock
    }

    /// The configuration in force at the last ensured term.
    pub fn current_config(&self) -> &CourtConfig {
        self.state.config_at(self.last_ensured_term())
    }

    /// Replace the configuration from `term` on.
    pub fn schedule_config(&mut self, term: TermId, config: CourtConfig) -> Result<(), CourtError> {
        config.validate()?;
        self.state.clock.schedule_config_change(term)?;
        tracing::info!(term = %term, "configuration change scheduled");
        self.state.scheduled_configs.insert(term, config);
        Ok(())
    }

    pub fn set_max_jurors_per_draft_batch(&mut self, max: u64) -> Result<(), CourtError> {
        let previous = self.current_config().disputes.max_jurors_per_draft_batch;
        if max == 0 {
            return Err(CourtError::InvalidBatchSize {
                requested: max,
                max: previous,
            });
        }
        let state = &mut self.state;
        for config in std::iter::once(&mut state.base_config).chain(state.scheduled_configs.values_mut()) {
            config.disputes.max_jurors_per_draft_batch = max;
        }
        tracing::info!(previous, current = max, "max jurors per draft batch changed");
        state.emit(CourtEvent::MaxJurorsPerDraftBatchChanged {
            previous,
            current: max,
        });
        Ok(())
    }

    // ── Disputes ────────────────────────────────────────────────────────

    /// Open a dispute on behalf of `subject`, funded by `creator`.
    pub fn create_dispute(
        &mut self,
        creator: &AccountId,
        subject: &AccountId,
        possible_rulings: u8,
    ) -> Result<DisputeId, CourtError> {
        let state = &mut self.state;
        let now = state.now();
        let max_transitions = state.clock.genesis().max_auto_transitions;
        let planned = state.clock.planned_current_term(max_transitions, now);
        let config_term = match &planned {
            Ok(term) => *term,
            Err(_) => state.clock.last_ensured_term(),
        };
        let config = state.config_at(config_term).clone();

        let bounds = &config.disputes;
        if possible_rulings < bounds.min_possible_rulings
            || possible_rulings > bounds.max_possible_rulings
        {
            return Err(CourtError::InvalidRulingOptions {
                requested: possible_rulings,
                min: bounds.min_possible_rulings,
                max: bounds.max_possible_rulings,
            });
        }
        if !state.collab.eligibility.is_up_to_date(subject) {
            return Err(CourtError::SubscriptionNotPaid {
                subject: subject.clone(),
            });
        }
        let target = planned?;
        let jurors_number = bounds.first_round_jurors_number;
        let fees = regular_round_fees(&config, jurors_number)?;
        let lock_per_slot = config.lock_per_slot()?;

        state.collect_deposit(creator, fees.total)?;
        let block = state.collab.chain.current_block();
        let transitions = state.clock.ensure_current_term(max_transitions, now, block)?;
        state.record_transitions(&transitions);

        let id = DisputeId(state.disputes.len() as u64);
        let draft_term = target.plus(config.terms.draft_delay_terms);
        let mut round = Round::new(RoundId(0), draft_term, creator.clone());
        round.jurors_number = jurors_number;
        round.fees = fees;
        round.lock_per_slot = lock_per_slot;
        self.voting
            .create(VoteId::for_round(id, RoundId(0)), possible_rulings)?;

        state.disputes.push(Dispute {
            id,
            subject: subject.clone(),
            creator: creator.clone(),
            possible_rulings,
            state: DisputeState::PreDraft,
            final_ruling: Outcome::MISSING,
            terms: config.terms.clone(),
            max_regular_appeal_rounds: config.disputes.max_regular_appeal_rounds,
            appeal_step_factor: config.disputes.appeal_step_factor,
            rounds: vec![round],
        });
        tracing::info!(dispute = %id, subject = %subject, creator = %creator, draft_term = %draft_term, jurors_number, "dispute created");
        metrics::counter!("court_disputes_created_total").increment(1);
        state.emit(CourtEvent::NewDispute {
            dispute: id,
            subject: subject.clone(),
            creator: creator.clone(),
            possible_rulings,
            draft_term,
            jurors_number,
        });
        Ok(id)
    }

    /// Appeal the outcome of `round` in favour of `ruling`.
    pub fn appeal(
        &mut self,
        id: DisputeId,
        round_id: RoundId,
        appellant: &AccountId,
        ruling: Outcome,
    ) -> Result<(), CourtError> {
        let term = self.state.require_up_to_date()?;
        let dispute = self.state.dispute(id)?;
        let round = self.state.round(id, round_id)?;
        if round.is_final {
            return Err(CourtError::RoundIsFinal {
                dispute: id,
                round: round_id,
            });
        }
        let phase = dispute.phase_of(round, term);
        if phase != RoundPhase::Appealing {
            return Err(CourtError::InvalidAdjudicationState {
                dispute: id,
                round: round_id,
                phase,
                operation: "appeal",
            });
        }
        if round.appeal.is_some() {
            return Err(CourtError::AppealAlreadyMade {
                dispute: id,
                round: round_id,
            });
        }
        if !ruling.is_valid_ruling(dispute.possible_rulings) {
            return Err(CourtError::InvalidAppealRuling {
                dispute: id,
                round: round_id,
                ruling,
                reason: "not a ruling option",
            });
        }
        let winning = self.voting.winning_outcome(VoteId::for_round(id, round_id))?;
        if ruling == winning {
            return Err(CourtError::InvalidAppealRuling {
                dispute: id,
                round: round_id,
                ruling,
                reason: "already the winning ruling",
            });
        }

        let config = self.state.config_at(term).clone();
        let next_id = round_id.next();
        let mut next = Round::new(next_id, round.confirm_end_term(&dispute.terms), appellant.clone());
        next.status = RoundStatus::AwaitingConfirmation;
        if dispute.is_final_round_index(next_id) {
            let total_active = self.state.collab.stake.total_active_balance();
            next.is_final = true;
            next.jurors_number = FINAL_ROUND_WEIGHT_PRECISION;
            next.selected_jurors = FINAL_ROUND_WEIGHT_PRECISION;
            next.final_total_active = total_active;
            next.fees = final_round_fees(&config, total_active)?;
        } else {
            next.jurors_number = dispute.next_round_jurors(round.jurors_number);
            next.fees = regular_round_fees(&config, next.jurors_number)?;
            next.lock_per_slot = config.lock_per_slot()?;
        }
        let round_cost = next.fees.total;
        let appeal_deposit = round_cost.mul_div(
            u128::from(config.collateral.appeal_collateral_factor),
            PCT_BASE,
        )?;
        let possible_rulings = dispute.possible_rulings;

        self.state.collect_deposit(appellant, appeal_deposit)?;
        self.voting
            .create(VoteId::for_round(id, next_id), possible_rulings)?;
        let dispute = self.state.dispute_mut(id)?;
        if let Some(round) = dispute.round_mut(round_id) {
            round.appeal = Some(Appeal {
                appellant: appellant.clone(),
                appealed_ruling: ruling,
                appeal_deposit,
                confirmer: None,
                confirmed_ruling: Outcome::MISSING,
                confirm_deposit: Amount::ZERO,
                round_cost,
                collapsed: false,
                deposits_settled: false,
            });
        }
        dispute.rounds.push(next);
        tracing::info!(dispute = %id, round = %round_id, appellant = %appellant, ruling = %ruling, deposit = %appeal_deposit, "ruling appealed");
        self.state.emit(CourtEvent::RulingAppealed {
            dispute: id,
            round: round_id,
            appellant: appellant.clone(),
            ruling,
        });
        Ok(())
    }

    /// Answer an appeal of `round`. Backing the appealed ruling is vacuous
    /// and collapses the escalation round.
    pub fn confirm_appeal(
        &mut self,
        id: DisputeId,
        round_id: RoundId,
        confirmer: &AccountId,
        ruling: Outcome,
    ) -> Result<(), CourtError> {
        let term = self.state.require_up_to_date()?;
        let dispute = self.state.dispute(id)?;
        let round = self.state.round(id, round_id)?;
        let phase = dispute.phase_of(round, term);
        if phase != RoundPhase::ConfirmingAppeal {
            return Err(CourtError::InvalidAdjudicationState {
                dispute: id,
                round: round_id,
                phase,
                operation: "confirm appeal",
            });
        }
        let appeal = round.appeal.clone().ok_or(CourtError::RoundNotAppealed {
            dispute: id,
            round: round_id,
        })?;
        if !ruling.is_valid_ruling(dispute.possible_rulings) {
            return Err(CourtError::InvalidAppealRuling {
                dispute: id,
                round: round_id,
                ruling,
                reason: "not a ruling option",
            });
        }
        if ruling == appeal.appealed_ruling {
            return self
                .state
                .collapse_appeal(id, round_id, CollapseReason::VacuousConfirmation);
        }

        let factor = self.state.config_at(term).collateral.confirm_collateral_factor;
        let confirm_deposit = appeal.round_cost.mul_div(u128::from(factor), PCT_BASE)?;
        self.state.collect_deposit(confirmer, confirm_deposit)?;

        let next_id = round_id.next();
        let dispute = self.state.dispute_mut(id)?;
        if let Some(appeal) = dispute.round_mut(round_id).and_then(|r| r.appeal.as_mut()) {
            appeal.confirmer = Some(confirmer.clone());
            appeal.confirmed_ruling = ruling;
            appeal.confirm_deposit = confirm_deposit;
        }
        let next = dispute
            .round_mut(next_id)
            .ok_or(CourtError::RoundDoesNotExist {
                dispute: id,
                round: next_id,
            })?;
        next.status = RoundStatus::Active;
        let (is_final, draft_term, jurors_number) =
            (next.is_final, next.draft_term, next.jurors_number);

        let state = if is_final {
            DisputeState::Adjudicating
        } else {
            DisputeState::PreDraft
        };
        self.state.set_dispute_state(id, state)?;
        tracing::info!(dispute = %id, round = %round_id, confirmer = %confirmer, ruling = %ruling, next_round = %next_id, "appeal confirmed");
        self.state.emit(CourtEvent::RulingAppealConfirmed {
            dispute: id,
            round: round_id,
            confirmer: confirmer.clone(),
            ruling,
            next_round: next_id,
            draft_term,
            jurors_number,
        });
        Ok(())
    }

    /// Compute (once) and return the final ruling of `id`.
    ///
    /// The decisive round is the last active one and must have ended. An
    /// appeal of it that was never confirmed collapses here, refunding the
    /// appellant; its ruling then stands.
    pub fn ensure_final_ruling(&mut self, id: DisputeId) -> Result<Outcome, CourtError> {
        let term = self.state.require_up_to_date()?;
        let dispute = self.state.dispute(id)?;
        if !dispute.final_ruling.is_missing() {
            return Ok(dispute.final_ruling);
        }
        let round = dispute
            .decisive_round()
            .ok_or(CourtError::RoundDoesNotExist {
                dispute: id,
                round: RoundId(0),
            })?;
        let round_id = round.id;
        let phase = dispute.phase_of(round, term);
        if phase != RoundPhase::Ended {
            return Err(CourtError::InvalidAdjudicationState {
                dispute: id,
                round: round_id,
                phase,
                operation: "compute final ruling",
            });
        }

        let ruling = match round.appeal.clone() {
            Some(appeal) if !appeal.is_confirmed() => {
                if !appeal.collapsed {
                    self.state
                        .collapse_appeal(id, round_id, CollapseReason::Unconfirmed)?;
                }
                appeal.appealed_ruling
            }
            _ => self.voting.winning_outcome(VoteId::for_round(id, round_id))?,
        };
        self.state.dispute_mut(id)?.final_ruling = ruling;
        tracing::info!(dispute = %id, round = %round_id, ruling = %ruling, "final ruling computed");
        self.state.set_dispute_state(id, DisputeState::Ruled)?;
        Ok(ruling)
    }

    /// Deliver the final ruling to the dispute's subject.
    pub fn execute_ruling(&mut self, id: DisputeId) -> Result<Outcome, CourtError> {
        self.state.require_up_to_date()?;
        let state = self.state.dispute(id)?.state;
        if state == DisputeState::Executed {
            return Err(CourtError::InvalidDisputeState {
                dispute: id,
                state,
                operation: "execute ruling",
            });
        }
        let ruling = self.ensure_final_ruling(id)?;
        let subject = self.state.dispute(id)?.subject.clone();
        self.state.collab.subjects.rule(&subject, id, ruling);
        self.state.set_dispute_state(id, DisputeState::Executed)?;
        tracing::info!(dispute = %id, subject = %subject, ruling = %ruling, "ruling executed");
        self.state.emit(CourtEvent::RulingExecuted { dispute: id, ruling });
        Ok(ruling)
    }

    // ── Voting ──────────────────────────────────────────────────────────

    pub fn commit_vote(
        &mut self,
        id: DisputeId,
        round: RoundId,
        voter: &AccountId,
        commitment: Commitment,
    ) -> Result<(), CourtError> {
        self.state.round(id, round)?;
        let result = self.voting.commit(
            &mut self.state,
            VoteId::for_round(id, round),
            voter,
            commitment,
        );
        self.finish_vote(result)
    }

    pub fn reveal_vote(
        &mut self,
        id: DisputeId,
        round: RoundId,
        voter: &AccountId,
        outcome: Outcome,
        salt: &[u8],
    ) -> Result<(), CourtError> {
        self.state.round(id, round)?;
        let result = self.voting.reveal(
            &mut self.state,
            VoteId::for_round(id, round),
            voter,
            outcome,
            salt,
        );
        self.finish_vote(result)
    }

    /// Void `voter`'s commitment by exposing its outcome and salt.
    pub fn leak_vote(
        &mut self,
        id: DisputeId,
        round: RoundId,
        voter: &AccountId,
        outcome: Outcome,
        salt: &[u8],
        leaker: &AccountId,
    ) -> Result<(), CourtError> {
        self.state.round(id, round)?;
        let result = self.voting.leak(
            &mut self.state,
            VoteId::for_round(id, round),
            voter,
            outcome,
            salt,
            leaker,
        );
        self.finish_vote(result)
    }

    fn finish_vote(&mut self, result: Result<(), VoteFailure<CourtError>>) -> Result<(), CourtError> {
        for event in self.voting.drain_events() {
            self.state.emit(event.into());
        }
        result.map_err(|failure| match failure {
            VoteFailure::Voting(err) => CourtError::Voting(err),
            VoteFailure::Owner(err) => err,
        })
    }

    // ── Views ───────────────────────────────────────────────────────────

    pub fn get_dispute(&self, id: DisputeId) -> Result<&Dispute, CourtError> {
        self.state.dispute(id)
    }

    pub fn dispute_count(&self) -> usize {
        self.state.disputes.len()
    }

    pub fn get_round(&self, id: DisputeId, round_id: RoundId) -> Result<RoundView, CourtError> {
        let dispute = self.state.dispute(id)?;
        let round = self.state.round(id, round_id)?;
        Ok(RoundView {
            round: round.id,
            phase: dispute.phase_of(round, self.last_ensured_term()),
            status: round.status,
            is_final: round.is_final,
            draft_term: round.draft_term,
            delayed_terms: round.delayed_terms,
            jurors_number: round.jurors_number,
            selected_jurors: round.selected_jurors,
            triggered_by: round.triggered_by.clone(),
            settled_penalties: round.settled_penalties,
            collected_tokens: round.collected_tokens,
            coherent_jurors: round.coherent_jurors,
            appealed: round.appeal.is_some(),
        })
    }

    pub fn get_juror(
        &self,
        id: DisputeId,
        round: RoundId,
        juror: &AccountId,
    ) -> Result<JurorView, CourtError> {
        let participation = self
            .state
            .round(id, round)?
            .participant(juror)
            .cloned()
            .unwrap_or_default();
        Ok(JurorView {
            weight: participation.weight,
            locked: participation.locked,
            rewarded: participation.rewarded,
        })
    }

    /// Weight `juror` has in final round `round`, or would get by committing
    /// now. Zero for regular rounds.
    pub fn final_round_weight(
        &self,
        id: DisputeId,
        round: RoundId,
        juror: &AccountId,
    ) -> Result<u64, CourtError> {
        self.state
            .final_weight_of(id, round, juror, self.last_ensured_term())
    }

    /// Stake `juror` has at risk in `round`.
    pub fn round_lock_balance(
        &self,
        id: DisputeId,
        round: RoundId,
        juror: &AccountId,
    ) -> Result<Amount, CourtError> {
        Ok(self.get_juror(id, round, juror)?.locked)
    }

    pub fn vote_tally(&self, id: DisputeId, round: RoundId) -> Result<Tally, CourtError> {
        self.state.round(id, round)?;
        Ok(self.voting.tally(VoteId::for_round(id, round))?)
    }

    pub fn stake(&self) -> &dyn StakeLedger {
        self.state.collab.stake.as_ref()
    }

    pub fn fees(&self) -> &dyn FeeLedger {
        self.state.collab.fees.as_ref()
    }

    /// Take the events recorded since the last drain.
    pub fn drain_events(&mut self) -> Vec<CourtEvent> {
        std::mem::take(&mut self.state.events)
    }
}

// ── Round cost ──────────────────────────────────────────────────────────

/// Fees of a drafted round of `jurors` slots.
pub(crate) fn regular_round_fees(config: &CourtConfig, jurors: u64) -> Result<RoundFees, CourtError> {
    let fees = &config.fees;
    let per_slot = Amount::checked_sum([fees.juror_fee, fees.draft_fee, fees.settle_fee])?;
    Ok(RoundFees {
        juror_fees: fees.juror_fee.checked_mul(jurors)?,
        draft_fee: fees.draft_fee,
        settle_fee: fees.settle_fee,
        total: per_slot.checked_mul(jurors)?,
    })
}

/// Fees of a final round, priced as if every `min_active_balance` unit of
/// active stake were one juror. Final rounds are not drafted.
pub(crate) fn final_round_fees(
    config: &CourtConfig,
    total_active: Amount,
) -> Result<RoundFees, CourtError> {
    let unit = config.penalties.min_active_balance.raw();
    let equivalent = if unit == 0 {
        1
    } else {
        to_u64(Amount::new(total_active.raw() / unit)).max(1)
    };
    let juror_fees = config.fees.juror_fee.checked_mul(equivalent)?;
    let settle_fee = config.fees.settle_fee.checked_mul(equivalent)?;
    Ok(RoundFees {
        juror_fees,
        draft_fee: Amount::ZERO,
        settle_fee,
        total: juror_fees.checked_add(settle_fee)?,
    })
}

pub(crate) fn to_u64(amount: Amount) -> u64 {
    u64::try_from(amount.raw()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use court_clock::{ClockError, SimulatedChain};
    use court_core::Seed;
    use court_registry::JurorsRegistry;

    use crate::fees::FeeTreasury;

    const TERM: u64 = 3_600;
    const GENESIS: i64 = 1_700_000_000;

    fn id(name: &str) -> AccountId {
        AccountId::new(name).unwrap()
    }

    fn court_with(config: CourtConfig, creator_funds: u128) -> (Court, SimulatedChain, SubscriptionRoster) {
        let start = Timestamp::from_epoch_secs(GENESIS).unwrap();
        let chain = SimulatedChain::new(start, Seed::derive(&[b"court-unit"]));
        let mut registry = JurorsRegistry::new(id("burn"));
        registry.stake(&id("juror"), Amount::new(1_000)).unwrap();
        let mut treasury = FeeTreasury::new();
        treasury.mint(&id("creator"), Amount::new(creator_funds)).unwrap();
        let roster = SubscriptionRoster::new();
        let collab =
            Collaborators::new(chain.clone(), registry, treasury).with_eligibility(roster.clone());
        let court = Court::new(GenesisConfig::new(start, TERM), config, collab).unwrap();
        (court, chain, roster)
    }

    #[test]
    fn create_dispute_charges_round_cost_and_advances_clock() {
        let (mut court, _, _) = court_with(CourtConfig::default(), 1_000);
        assert_eq!(court.needed_transitions(), 1);
        let dispute = court
            .create_dispute(&id("creator"), &id("subject"), 2)
            .unwrap();
        assert_eq!(dispute, DisputeId(0));
        assert_eq!(court.last_ensured_term(), TermId(1));
        // 3 jurors × (10 + 30 + 40)
        assert_eq!(court.fees().balance_of(&id("creator")), Amount::new(760));
        assert_eq!(court.fees().escrow_balance(), Amount::new(240));

        let round = court.get_round(dispute, RoundId(0)).unwrap();
        assert_eq!(round.draft_term, TermId(2));
        assert_eq!(round.jurors_number, 3);
        assert_eq!(round.phase, RoundPhase::Invalid);
        assert_eq!(court.get_dispute(dispute).unwrap().state, DisputeState::PreDraft);

        let events = court.drain_events();
        assert!(matches!(events[0], CourtEvent::Heartbeat { .. }));
        assert!(matches!(events.last(), Some(CourtEvent::NewDispute { .. })));
    }

    #[test]
    fn failed_deposit_leaves_clock_untouched() {
        let (mut court, _, _) = court_with(CourtConfig::default(), 100);
        let err = court
            .create_dispute(&id("creator"), &id("subject"), 2)
            .unwrap_err();
        assert!(matches!(err, CourtError::DepositFailed { .. }));
        assert_eq!(court.last_ensured_term(), TermId::ZERO);
        assert_eq!(court.dispute_count(), 0);
        assert!(court.drain_events().is_empty());
    }

    #[test]
    fn ruling_options_are_bounded() {
        let (mut court, _, _) = court_with(CourtConfig::default(), 1_000);
        let err = court
            .create_dispute(&id("creator"), &id("subject"), 3)
            .unwrap_err();
        assert_eq!(
            err,
            CourtError::InvalidRulingOptions {
                requested: 3,
                min: 2,
                max: 2,
            }
        );
    }

    #[test]
    fn overdue_subject_cannot_open_disputes() {
        let (mut court, _, roster) = court_with(CourtConfig::default(), 1_000);
        roster.set_overdue(&id("subject"), true);
        assert!(matches!(
            court.create_dispute(&id("creator"), &id("subject"), 2),
            Err(CourtError::SubscriptionNotPaid { .. })
        ));
    }

    #[test]
    fn lagging_clock_blocks_creation() {
        let (mut court, chain, _) = court_with(CourtConfig::default(), 1_000);
        chain.advance_secs(TERM).unwrap();
        let err = court
            .create_dispute(&id("creator"), &id("subject"), 2)
            .unwrap_err();
        assert_eq!(
            err,
            CourtError::Clock(ClockError::TooManyTransitions { needed: 2, max: 1 })
        );
        assert_eq!(court.fees().escrow_balance(), Amount::ZERO);
    }

    #[test]
    fn scheduled_config_governs_from_its_term() {
        let (mut court, chain, _) = court_with(CourtConfig::default(), 10_000);
        let mut bigger = CourtConfig::default();
        bigger.disputes.first_round_jurors_number = 5;
        court.schedule_config(TermId(2), bigger).unwrap();
        assert!(court.schedule_config(TermId::ZERO, CourtConfig::default()).is_err());

        court.create_dispute(&id("creator"), &id("subject"), 2).unwrap();
        assert_eq!(court.get_round(DisputeId(0), RoundId(0)).unwrap().jurors_number, 3);

        chain.advance_secs(TERM).unwrap();
        court.heartbeat(1).unwrap();
        assert!(court
            .drain_events()
            .iter()
            .any(|e| matches!(e, CourtEvent::ConfigChanged { term: TermId(2), changes: 1 })));
        court.create_dispute(&id("creator"), &id("subject"), 2).unwrap();
        assert_eq!(court.get_round(DisputeId(1), RoundId(0)).unwrap().jurors_number, 5);
    }

    #[test]
    fn invalid_scheduled_config_rejected() {
        let (mut court, _, _) = court_with(CourtConfig::default(), 1_000);
        let mut broken = CourtConfig::default();
        broken.terms.reveal_terms = 0;
        assert!(matches!(
            court.schedule_config(TermId(3), broken),
            Err(CourtError::Core(_))
        ));
    }

    #[test]
    fn max_batch_size_must_be_positive() {
        let (mut court, _, _) = court_with(CourtConfig::default(), 1_000);
        assert!(matches!(
            court.set_max_jurors_per_draft_batch(0),
            Err(CourtError::InvalidBatchSize { requested: 0, .. })
        ));
        court.set_max_jurors_per_draft_batch(2).unwrap();
        assert_eq!(court.current_config().disputes.max_jurors_per_draft_batch, 2);
        assert_eq!(
            court.drain_events(),
            vec![CourtEvent::MaxJurorsPerDraftBatchChanged {
                previous: 64,
                current: 2,
            }]
        );
    }

    #[test]
    fn missing_dispute_and_round_are_reported() {
        let (mut court, _, _) = court_with(CourtConfig::default(), 1_000);
        assert_eq!(
            court.get_round(DisputeId(7), RoundId(0)).unwrap_err(),
            CourtError::DisputeDoesNotExist(DisputeId(7))
        );
        court.create_dispute(&id("creator"), &id("subject"), 2).unwrap();
        assert_eq!(
            court.get_round(DisputeId(0), RoundId(1)).unwrap_err(),
            CourtError::RoundDoesNotExist {
                dispute: DisputeId(0),
                round: RoundId(1),
            }
        );
        assert_eq!(
            court.get_juror(DisputeId(0), RoundId(0), &id("nobody")).unwrap().weight,
            0
        );
    }

    #[test]
    fn dispute_state_follows_transition_table() {
        let (mut court, _, _) = court_with(CourtConfig::default(), 1_000);
        let dispute = court
            .create_dispute(&id("creator"), &id("subject"), 2)
            .unwrap();
        court.drain_events();

        let err = court
            .state
            .set_dispute_state(dispute, DisputeState::Executed)
            .unwrap_err();
        assert_eq!(
            err,
            CourtError::InvalidDisputeState {
                dispute,
                state: DisputeState::PreDraft,
                operation: "change state",
            }
        );
        assert_eq!(court.get_dispute(dispute).unwrap().state, DisputeState::PreDraft);
        assert!(court.drain_events().is_empty());

        court
            .state
            .set_dispute_state(dispute, DisputeState::Adjudicating)
            .unwrap();
        assert!(court
            .state
            .set_dispute_state(dispute, DisputeState::Executed)
            .is_err());
        court.state.set_dispute_state(dispute, DisputeState::Ruled).unwrap();
        assert!(court
            .state
            .set_dispute_state(dispute, DisputeState::PreDraft)
            .is_err());
        assert_eq!(court.get_dispute(dispute).unwrap().state, DisputeState::Ruled);
    }

    #[test]
    fn final_round_fees_use_stake_equivalent_jurors() {
        let config = CourtConfig::default();
        let fees = final_round_fees(&config, Amount::new(12_345)).unwrap();
        // 12_345 / 100 = 123 stake-equivalent jurors.
        assert_eq!(fees.juror_fees, Amount::new(1_230));
        assert_eq!(fees.settle_fee, Amount::new(4_920));
        assert_eq!(fees.draft_fee, Amount::ZERO);
        assert_eq!(fees.total, Amount::new(6_150));

        let tiny = final_round_fees(&config, Amount::new(5)).unwrap();
        assert_eq!(tiny.total, Amount::new(50));
    }

    #[test]
    fn regular_round_fees_scale_with_panel() {
        let fees = regular_round_fees(&CourtConfig::default(), 9).unwrap();
        assert_eq!(fees.juror_fees, Amount::new(90));
        assert_eq!(fees.total, Amount::new(720));
    }
}
