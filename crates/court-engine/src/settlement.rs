//! # Settlement
//!
//! Once a dispute has a final ruling its rounds settle in order. Penalty
//! settlement walks a round's jurors: coherent jurors (those who revealed
//! the final ruling) get their lock back, the rest forfeit it into the
//! round's collected pool. Coherent jurors then claim their share of that
//! pool and of the round's juror fees, pro rata to weight and truncated.
//!
//! A round nobody voted coherently in burns its pool and refunds its juror
//! fees to whoever funded the round.

use court_core::{AccountId, Amount, DisputeId, RoundId, VoteId};

use crate::court::{to_u64, Court};
use crate::dispute::{Round, RoundStatus};
use crate::error::CourtError;
use crate::events::CourtEvent;

impl Court {
    /// Settle penalties of up to `batch` jurors of `round` (`0` settles all).
    /// Returns the number of jurors processed.
    pub fn settle_penalties(
        &mut self,
        id: DisputeId,
        round_id: RoundId,
        settler: &AccountId,
        batch: usize,
    ) -> Result<usize, CourtError> {
        let term = self.state.require_up_to_date()?;
        let final_ruling = self.ensure_final_ruling(id)?;
        let dispute = self.state.dispute(id)?;
        let round = self.state.round(id, round_id)?;
        if round.status != RoundStatus::Active {
            return Err(CourtError::InvalidAdjudicationState {
                dispute: id,
                round: round_id,
                phase: dispute.phase_of(round, term),
                operation: "settle penalties",
            });
        }
        if let Some(previous) = round_id.previous().and_then(|p| dispute.round(p)) {
            if !previous.settled_penalties {
                return Err(CourtError::PreviousRoundNotSettled {
                    dispute: id,
                    round: round_id,
                });
            }
        }
        if round.settled_penalties {
            return Err(CourtError::RoundAlreadySettled {
                dispute: id,
                round: round_id,
            });
        }

        let vote = VoteId::for_round(id, round_id);
        let start = round.settled_jurors;
        let end = match batch {
            _ if round.is_final => round.jurors.len(),
            0 => round.jurors.len(),
            n => start.saturating_add(n).min(round.jurors.len()),
        };
        // Final-round stake moved at commit time.
        let pending: Vec<(AccountId, u64, Amount)> = if round.is_final {
            Vec::new()
        } else {
            round.jurors[start..end]
                .iter()
                .map(|juror| {
                    let participation = round.participant(juror).cloned().unwrap_or_default();
                    (juror.clone(), participation.weight, participation.locked)
                })
                .collect()
        };
        let fee = if round.is_final {
            round.fees.settle_fee
        } else {
            let weight = pending.iter().fold(0u64, |acc, (_, w, _)| acc.saturating_add(*w));
            round.fees.settle_fee.checked_mul(weight)?
        };
        let finishes = round.is_final || end >= round.jurors.len();
        let coherent = if finishes {
            Some(self.voting.outcome_tally(vote, final_ruling)?)
        } else {
            None
        };
        let refund = match coherent {
            Some(0) => round.fees.juror_fees,
            _ => Amount::ZERO,
        };
        self.state.ensure_payable(settler, fee.checked_add(refund)?)?;

        let processed = if round.is_final {
            round.jurors.len()
        } else {
            let mut slashed = Amount::ZERO;
            for (juror, _, locked) in &pending {
                if self.voting.has_voted_in_favor_of(vote, final_ruling, juror)? {
                    self.state.collab.stake.unlock(juror, *locked)?;
                } else {
                    let moved = self.state.collab.stake.slash(juror, *locked)?;
                    slashed = slashed.checked_add(moved)?;
                }
                tracing::debug!(dispute = %id, round = %round_id, juror = %juror, "juror penalties settled");
            }
            let round = self.state.round_mut(id, round_id)?;
            round.collected_tokens = round.collected_tokens.checked_add(slashed)?;
            round.settled_jurors = end;
            pending.len()
        };
        self.state.pay(settler, fee)?;

        if let Some(coherent) = coherent {
            self.finish_penalties(id, round_id, coherent)?;
        }
        Ok(processed)
    }

    fn finish_penalties(
        &mut self,
        id: DisputeId,
        round_id: RoundId,
        coherent: u64,
    ) -> Result<(), CourtError> {
        let round = self.state.round_mut(id, round_id)?;
        round.coherent_jurors = coherent;
        round.settled_penalties = true;
        let collected = round.collected_tokens;
        let juror_fees = round.fees.juror_fees;

        if coherent == 0 {
            if !collected.is_zero() {
                self.state.collab.stake.burn(collected)?;
                metrics::counter!("court_tokens_burned_total").increment(to_u64(collected));
            }
            for (funder, amount) in self.round_funders(id, round_id, juror_fees)? {
                self.state.pay(&funder, amount)?;
            }
        }
        tracing::info!(dispute = %id, round = %round_id, collected = %collected, coherent, "penalties settled");
        metrics::counter!("court_penalties_settled_total").increment(1);
        self.state.emit(CourtEvent::PenaltiesSettled {
            dispute: id,
            round: round_id,
            collected_tokens: collected,
            coherent_jurors: coherent,
        });
        Ok(())
    }

    /// Who funded `round` and how `amount` splits among them.
    fn round_funders(
        &self,
        id: DisputeId,
        round_id: RoundId,
        amount: Amount,
    ) -> Result<Vec<(AccountId, Amount)>, CourtError> {
        let dispute = self.state.dispute(id)?;
        let appeal = round_id
            .previous()
            .and_then(|p| dispute.round(p))
            .and_then(|r: &Round| r.appeal.as_ref());
        match appeal.map(|a| (a.appellant.clone(), a.confirmer.clone())) {
            Some((appellant, Some(confirmer))) => {
                let half = amount.mul_div(1, 2)?;
                Ok(vec![
                    (appellant, amount.saturating_sub(half)),
                    (confirmer, half),
                ])
            }
            _ => Ok(vec![(dispute.creator.clone(), amount)]),
        }
    }

    /// Pay `juror` its share of the round's collected stake and juror fees.
    /// Returns `(tokens, fees)`.
    pub fn settle_reward(
        &mut self,
        id: DisputeId,
        round_id: RoundId,
        juror: &AccountId,
    ) -> Result<(Amount, Amount), CourtError> {
        self.state.require_up_to_date()?;
        let dispute = self.state.dispute(id)?;
        let round = self.state.round(id, round_id)?;
        if !round.settled_penalties {
            return Err(CourtError::RoundPenaltiesNotSettled {
                dispute: id,
                round: round_id,
            });
        }
        let participation = round.participant(juror).cloned().unwrap_or_default();
        if participation.rewarded {
            return Err(CourtError::JurorAlreadyRewarded {
                dispute: id,
                round: round_id,
                juror: juror.clone(),
            });
        }
        if participation.weight == 0 {
            return Err(CourtError::WontRewardNonVoterJuror {
                dispute: id,
                round: round_id,
                juror: juror.clone(),
            });
        }
        let vote = VoteId::for_round(id, round_id);
        if !self
            .voting
            .has_voted_in_favor_of(vote, dispute.final_ruling, juror)?
        {
            return Err(CourtError::WontRewardIncoherentJuror {
                dispute: id,
                round: round_id,
                juror: juror.clone(),
            });
        }

        let weight = u128::from(participation.weight);
        let coherent = u128::from(round.coherent_jurors);
        let tokens = round.collected_tokens.mul_div(weight, coherent)?;
        let fees = round.fees.juror_fees.mul_div(weight, coherent)?;
        let withdrawal_lock = round.is_final.then(|| {
            round
                .draft_term
                .plus(dispute.terms.commit_terms)
                .plus(dispute.terms.reveal_terms)
                .plus(dispute.terms.final_round_lock_terms)
        });

        self.state.pay(juror, fees)?;
        self.state.collab.stake.assign(juror, tokens)?;
        if let Some(until) = withdrawal_lock {
            self.state.collab.stake.lock_withdrawals(juror, until)?;
        }
        if let Some(participation) = self.state.round_mut(id, round_id)?.participants.get_mut(juror) {
            participation.rewarded = true;
        }
        tracing::debug!(dispute = %id, round = %round_id, juror = %juror, tokens = %tokens, fees = %fees, "reward settled");
        metrics::counter!("court_rewards_settled_total").increment(1);
        self.state.emit(CourtEvent::RewardSettled {
            dispute: id,
            round: round_id,
            juror: juror.clone(),
            tokens,
            fees,
        });
        Ok((tokens, fees))
    }

    /// Return the appeal and confirmation deposits of `round` once the
    /// round they funded has settled. The side whose ruling won takes both
    /// deposits minus the funded round's cost; if neither did, each side
    /// gets its own deposit back minus half that cost.
    pub fn settle_appeal_deposit(
        &mut self,
        id: DisputeId,
        round_id: RoundId,
    ) -> Result<(), CourtError> {
        self.state.require_up_to_date()?;
        let dispute = self.state.dispute(id)?;
        let round = self.state.round(id, round_id)?;
        let appeal = match &round.appeal {
            Some(appeal) if appeal.is_confirmed() => appeal,
            _ => {
                return Err(CourtError::RoundNotAppealed {
                    dispute: id,
                    round: round_id,
                })
            }
        };
        if appeal.deposits_settled {
            return Err(CourtError::AppealDepositAlreadySettled {
                dispute: id,
                round: round_id,
            });
        }
        let next_id = round_id.next();
        let next_settled = dispute
            .round(next_id)
            .map(|next| next.settled_penalties)
            .unwrap_or(false);
        if !next_settled {
            return Err(CourtError::RoundPenaltiesNotSettled {
                dispute: id,
                round: next_id,
            });
        }

        let final_ruling = dispute.final_ruling;
        let total = appeal.appeal_deposit.checked_add(appeal.confirm_deposit)?;
        let cost = appeal.round_cost;
        let mut payouts = Vec::new();
        match &appeal.confirmer {
            Some(confirmer) if final_ruling == appeal.confirmed_ruling => {
                payouts.push((confirmer.clone(), total.saturating_sub(cost)));
            }
            _ if final_ruling == appeal.appealed_ruling => {
                payouts.push((appeal.appellant.clone(), total.saturating_sub(cost)));
            }
            // The appellant bears the odd unit of the cost.
            Some(confirmer) => {
                let half = cost.mul_div(1, 2)?;
                payouts.push((
                    appeal.appellant.clone(),
                    appeal.appeal_deposit.saturating_sub(cost.saturating_sub(half)),
                ));
                payouts.push((confirmer.clone(), appeal.confirm_deposit.saturating_sub(half)));
            }
            None => {}
        }

        let owed = payouts
            .iter()
            .try_fold(Amount::ZERO, |acc, (_, amount)| acc.checked_add(*amount))?;
        self.state.ensure_payable(&appeal.appellant, owed)?;
        for (recipient, amount) in &payouts {
            self.state.pay(recipient, *amount)?;
        }
        if let Some(appeal) = self.state.round_mut(id, round_id)?.appeal.as_mut() {
            appeal.deposits_settled = true;
        }
        tracing::info!(dispute = %id, round = %round_id, "appeal deposits settled");
        self.state.emit(CourtEvent::AppealDepositSettled {
            dispute: id,
            round: round_id,
        });
        Ok(())
    }
}
