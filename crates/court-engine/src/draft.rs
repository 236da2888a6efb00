//! # Juror Draft
//!
//! Jurors are sampled with replacement, weighted by active stake. Each
//! draw hashes the draft term's seed with the dispute, round and a per-round
//! nonce, reduces the digest modulo the total active stake and picks the
//! juror owning that cumulative position:
//!
//! ```text
//! position = sha256(seed ‖ draft_term ‖ dispute ‖ round ‖ nonce)[..16] mod total_active
//! ```
//!
//! The nonce lives on the round and only moves forward, so a draft split
//! over several calls (even across terms) never reuses a draw. A drawn
//! juror who cannot cover the per-slot lock from unlocked stake, or who has
//! reached the per-juror share cap, is skipped and the next nonce drawn.
//! Nothing is locked or recorded unless the drafter's fee is paid.

use std::collections::BTreeMap;

use court_core::{AccountId, Amount, DisputeId, RoundId, Seed, TermId, PCT_BASE};

use crate::court::{to_u64, Court};
use crate::dispute::{DisputeState, RoundStatus};
use crate::error::CourtError;
use crate::events::CourtEvent;

/// Draws attempted per requested slot before a batch gives up.
pub const MAX_DRAWS_PER_SLOT: u64 = 8;

/// Cumulative-stake position selected by draw `nonce`.
pub fn draw_position(
    seed: &Seed,
    draft_term: TermId,
    dispute: DisputeId,
    round: RoundId,
    nonce: u64,
    total_active: Amount,
) -> u128 {
    let digest = Seed::derive(&[
        seed.as_bytes(),
        &draft_term.get().to_be_bytes(),
        &dispute.get().to_be_bytes(),
        &round.get().to_be_bytes(),
        &nonce.to_be_bytes(),
    ]);
    match total_active.raw() {
        0 => 0,
        total => digest.leading_u128() % total,
    }
}

impl Court {
    /// Draft up to `batch` jurors (the configured maximum when `None`) into
    /// the last round of `id`. Returns the number of slots filled.
    pub fn draft(
        &mut self,
        id: DisputeId,
        drafter: &AccountId,
        batch: Option<u64>,
    ) -> Result<u64, CourtError> {
        let state = &mut self.state;
        let dispute = state.dispute(id)?;
        let round_id = dispute.last_round_id();
        let round = state.round(id, round_id)?;
        if round.status == RoundStatus::AwaitingConfirmation {
            return Err(CourtError::RoundAwaitingConfirmation {
                dispute: id,
                round: round_id,
            });
        }
        if dispute.state != DisputeState::PreDraft || round.is_fully_drafted() {
            return Err(CourtError::RoundAlreadyDrafted {
                dispute: id,
                round: round_id,
            });
        }

        let config = state.config_at(state.clock.last_ensured_term());
        let max_batch = config.disputes.max_jurors_per_draft_batch;
        let share_pct = config.penalties.regular_round_max_share_pct;
        let batch = match batch {
            None => max_batch,
            Some(requested) if requested == 0 || requested > max_batch => {
                return Err(CourtError::InvalidBatchSize {
                    requested,
                    max: max_batch,
                })
            }
            Some(requested) => requested,
        };
        let term = state.require_up_to_date()?;
        let draft_term = round.draft_term;
        let seed = state
            .clock
            .term_randomness(draft_term, state.collab.chain.as_ref())?;
        let total_active = state.collab.stake.total_active_balance();
        if total_active.is_zero() {
            return Err(CourtError::NoActiveJurors);
        }

        let round = state.round(id, round_id)?;
        let wanted = round.jurors_number.saturating_sub(round.selected_jurors).min(batch);
        let lock = round.lock_per_slot;
        let share_cap = if u128::from(share_pct) >= PCT_BASE {
            u64::MAX
        } else {
            to_u64(Amount::from(round.jurors_number).mul_div(u128::from(share_pct), PCT_BASE)?)
                .max(1)
        };
        let draft_fee = round.fees.draft_fee;
        let budget = wanted.saturating_mul(MAX_DRAWS_PER_SLOT);

        // Picks are planned against the current balances and only applied
        // once the drafter has been paid.
        let mut picks: Vec<AccountId> = Vec::new();
        let mut planned: BTreeMap<AccountId, u64> = BTreeMap::new();
        let mut nonce = round.draft_nonce;
        let mut draws = 0u64;
        while (picks.len() as u64) < wanted && draws < budget {
            draws += 1;
            let draw = nonce;
            nonce += 1;
            let position = draw_position(&seed, draft_term, id, round_id, draw, total_active);

            let Some(juror) = state.collab.stake.juror_at(position) else {
                continue;
            };
            let slots = planned.get(&juror).copied().unwrap_or(0);
            if state.collab.stake.unlocked_active_balance(&juror) < lock.checked_mul(slots + 1)? {
                tracing::debug!(dispute = %id, round = %round_id, juror = %juror, nonce = draw, "drawn juror cannot cover lock");
                continue;
            }
            if round.weight_of(&juror).saturating_add(slots) >= share_cap {
                continue;
            }
            planned.insert(juror.clone(), slots + 1);
            picks.push(juror);
        }
        let drafted = picks.len() as u64;
        if drafted < wanted {
            tracing::warn!(dispute = %id, round = %round_id, drafted, wanted, draws, "draft batch exhausted its draw budget");
        }

        state.pay(drafter, draft_fee.checked_mul(drafted)?)?;

        for (juror, slots) in &planned {
            state.collab.stake.lock(juror, lock.checked_mul(*slots)?)?;
        }
        let round = state.round_mut(id, round_id)?;
        round.draft_nonce = nonce;
        for juror in &picks {
            if !round.participants.contains_key(juror) {
                round.jurors.push(juror.clone());
            }
            let participation = round.participants.entry(juror.clone()).or_default();
            participation.weight += 1;
            participation.locked = participation.locked.checked_add(lock)?;
            round.selected_jurors += 1;
        }
        for juror in picks {
            tracing::debug!(dispute = %id, round = %round_id, juror = %juror, "juror drafted");
            state.emit(CourtEvent::JurorDrafted {
                dispute: id,
                round: round_id,
                juror,
            });
        }
        metrics::counter!("court_jurors_drafted_total").increment(drafted);

        let round = state.round_mut(id, round_id)?;
        if round.is_fully_drafted() {
            round.delayed_terms = term.since(draft_term);
            let delayed_terms = round.delayed_terms;
            tracing::info!(dispute = %id, round = %round_id, delayed_terms, "round drafted");
            state.set_dispute_state(id, DisputeState::Adjudicating)?;
        }
        Ok(drafted)
    }
}
