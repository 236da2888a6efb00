//! # Court Invariants — Property Tests
//!
//! Random stake distributions, panel sizes and ballots, checked against the
//! accounting invariants: drafted weight matches the panel, collected stake
//! equals the slashed locks, rewards never exceed the pool, fee tokens are
//! conserved.

mod common;

use common::*;
use court_core::{AccountId, Amount, CourtConfig, DisputeId, Outcome, RoundId};
use proptest::prelude::*;

const R0: RoundId = RoundId(0);

fn stakes_strategy() -> impl Strategy<Value = Vec<u128>> {
    prop::collection::vec(200u128..5_000, 3..8)
}

fn panel_strategy() -> impl Strategy<Value = u64> {
    (0u64..4).prop_map(|n| 2 * n + 1)
}

/// `0` abstains, `1` votes LOW, `2` votes HIGH.
fn ballots_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(0u8..3, 8)
}

fn harness(stakes: &[u128], panel: u64) -> Harness {
    let mut config = CourtConfig::default();
    config.disputes.first_round_jurors_number = panel;
    let stakes: Vec<(AccountId, Amount)> = stakes
        .iter()
        .enumerate()
        .map(|(i, s)| (juror(i), Amount::new(*s)))
        .collect();
    Harness::with_stakes(config, &stakes)
}

fn ballot(choice: u8) -> Option<Outcome> {
    match choice {
        1 => Some(LOW),
        2 => Some(HIGH),
        _ => None,
    }
}

/// Draft, vote with `choices` and step past the appeal window.
fn ruled_dispute(h: &mut Harness, choices: &[u8]) -> (DisputeId, Vec<(AccountId, Option<Outcome>)>) {
    let id = h.drafted_dispute();
    let ballots: Vec<(AccountId, Option<Outcome>)> = h
        .round_jurors(id, R0)
        .into_iter()
        .zip(choices.iter().copied())
        .map(|(juror, choice)| (juror, ballot(choice)))
        .collect();
    h.vote(id, R0, &ballots);
    h.next_term();
    (id, ballots)
}

fn all_holders(h: &Harness) -> Vec<AccountId> {
    let mut holders = vec![creator(), appellant(), confirmer(), keeper()];
    holders.extend(h.jurors.iter().cloned());
    holders
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Drafted weights add up to the panel and every slot locks stake.
    #[test]
    fn drafted_weight_matches_panel(stakes in stakes_strategy(), panel in panel_strategy()) {
        let mut h = harness(&stakes, panel);
        let id = h.drafted_dispute();

        let jurors = h.round_jurors(id, R0);
        let mut weight = 0u64;
        for juror in &jurors {
            let view = h.court.get_juror(id, R0, juror).unwrap();
            prop_assert!(view.weight > 0);
            prop_assert_eq!(view.locked, Amount::new(10 * u128::from(view.weight)));
            prop_assert_eq!(h.stake_of(juror).locked, view.locked);
            weight += view.weight;
        }
        prop_assert_eq!(weight, panel);
        prop_assert_eq!(h.court.get_round(id, R0).unwrap().selected_jurors, panel);
    }

    /// A drafted round rejects further drafts without side effects.
    #[test]
    fn redrafting_changes_nothing(stakes in stakes_strategy(), panel in panel_strategy()) {
        let mut h = harness(&stakes, panel);
        let id = h.drafted_dispute();
        let before = h.court.get_dispute(id).unwrap().clone();
        let keeper_fees = h.fee_balance(&keeper());
        h.events();

        prop_assert!(h.court.draft(id, &keeper(), None).is_err());
        prop_assert_eq!(h.court.get_dispute(id).unwrap(), &before);
        prop_assert_eq!(h.fee_balance(&keeper()), keeper_fees);
        prop_assert!(h.events().is_empty());
    }

    /// Collected stake is exactly the locks of jurors who missed the ruling.
    #[test]
    fn collected_equals_slashed_locks(
        stakes in stakes_strategy(),
        panel in panel_strategy(),
        choices in ballots_strategy(),
    ) {
        let mut h = harness(&stakes, panel);
        let (id, ballots) = ruled_dispute(&mut h, &choices);
        let active_before = h.court.stake().total_active_balance();

        h.court.settle_penalties(id, R0, &keeper(), 0).unwrap();
        let ruling = h.court.get_dispute(id).unwrap().final_ruling;

        let mut expected = Amount::ZERO;
        for (juror, outcome) in &ballots {
            if *outcome != Some(ruling) {
                let locked = h.court.round_lock_balance(id, R0, juror).unwrap();
                expected = expected.checked_add(locked).unwrap();
            }
            prop_assert_eq!(h.stake_of(juror).locked, Amount::ZERO);
        }
        let round = h.court.get_round(id, R0).unwrap();
        prop_assert_eq!(round.collected_tokens, expected);
        prop_assert_eq!(
            active_before.checked_sub(h.court.stake().total_active_balance()),
            Some(expected)
        );
        if round.coherent_jurors == 0 {
            prop_assert_eq!(h.court.stake().pooled(), Amount::ZERO);
        } else {
            prop_assert_eq!(h.court.stake().pooled(), expected);
        }
    }

    /// Truncated token and fee rewards each leave less than one unit per
    /// claimant behind.
    #[test]
    fn rewards_never_exceed_the_pool(
        stakes in stakes_strategy(),
        panel in panel_strategy(),
        choices in ballots_strategy(),
    ) {
        let mut h = harness(&stakes, panel);
        let (id, ballots) = ruled_dispute(&mut h, &choices);
        h.court.settle_penalties(id, R0, &keeper(), 0).unwrap();
        let ruling = h.court.get_dispute(id).unwrap().final_ruling;
        let round = h.court.get_round(id, R0).unwrap();
        let juror_fees = h.court.get_dispute(id).unwrap().rounds[0].fees.juror_fees;

        let mut tokens = Amount::ZERO;
        let mut fees = Amount::ZERO;
        let mut claimants = 0u128;
        for (juror, outcome) in &ballots {
            if *outcome == Some(ruling) {
                let (paid, earned) = h.court.settle_reward(id, R0, juror).unwrap();
                tokens = tokens.checked_add(paid).unwrap();
                fees = fees.checked_add(earned).unwrap();
                claimants += 1;
            }
        }
        if claimants > 0 {
            let shortfall = round.collected_tokens.checked_sub(tokens).unwrap();
            prop_assert!(shortfall.raw() < claimants);
            let unpaid = juror_fees.checked_sub(fees).unwrap();
            prop_assert!(unpaid.raw() < claimants);
        }
    }

    /// Fee tokens only move between holders and escrow.
    #[test]
    fn fee_tokens_are_conserved(
        stakes in stakes_strategy(),
        panel in panel_strategy(),
        choices in ballots_strategy(),
    ) {
        let mut h = harness(&stakes, panel);
        let (id, ballots) = ruled_dispute(&mut h, &choices);
        h.court.settle_penalties(id, R0, &keeper(), 0).unwrap();
        let ruling = h.court.get_dispute(id).unwrap().final_ruling;
        for (juror, outcome) in &ballots {
            if *outcome == Some(ruling) {
                h.court.settle_reward(id, R0, juror).unwrap();
            }
        }

        let held: u128 = all_holders(&h).iter().map(|a| h.fee_balance(a).raw()).sum();
        let escrow = h.court.fees().escrow_balance().raw();
        prop_assert_eq!(held + escrow, 3 * PARTY_FUNDS);
    }
}
