//! Shared fixtures for the cross-crate court tests.
//!
//! A [`Harness`] wires a [`Court`] to a simulated chain, a stake registry and
//! a fee treasury, and keeps handles on the chain, the subscription roster
//! and the ruling recorder so tests can drive time and observe rulings.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use court_clock::SimulatedChain;
use court_core::{
    AccountId, Amount, CourtConfig, DisputeId, GenesisConfig, Outcome, RoundId, Seed, Timestamp,
};
use court_engine::{
    Collaborators, Court, CourtEvent, FeeError, FeeLedger, FeeTreasury, RulingRecorder,
    SubscriptionRoster,
};
use court_registry::{JurorBalances, JurorsRegistry, StakeLedger};
use court_voting::Commitment;

/// Start of term 1.
pub const GENESIS: i64 = 1_700_000_000;
/// Term length in seconds.
pub const TERM: u64 = 3_600;
/// Stake of every harness juror.
pub const JUROR_STAKE: u128 = 1_000;
/// Fee tokens minted to each funded party.
pub const PARTY_FUNDS: u128 = 1_000_000;

pub const LOW: Outcome = Outcome(3);
pub const HIGH: Outcome = Outcome(4);

pub fn account(name: &str) -> AccountId {
    AccountId::new(name).unwrap()
}

pub fn creator() -> AccountId {
    account("creator")
}

pub fn appellant() -> AccountId {
    account("appellant")
}

pub fn confirmer() -> AccountId {
    account("confirmer")
}

pub fn subject() -> AccountId {
    account("arbitrable")
}

/// Drafts and settles; starts with no fee tokens.
pub fn keeper() -> AccountId {
    account("keeper")
}

pub fn juror(i: usize) -> AccountId {
    account(&format!("juror-{i}"))
}

pub fn salt(juror: &AccountId) -> Vec<u8> {
    format!("salt-{juror}").into_bytes()
}

/// Default configuration with every regular-round juror capped at one slot.
pub fn distinct_jurors_config() -> CourtConfig {
    let mut config = CourtConfig::default();
    config.penalties.regular_round_max_share_pct = 1;
    config
}

/// Fee treasury whose escrow can be frozen. A frozen escrow reports no
/// balance and refuses every payout; deposits still flow in.
pub struct GatedTreasury {
    inner: FeeTreasury,
    frozen: Arc<AtomicBool>,
}

impl FeeLedger for GatedTreasury {
    fn transfer_from(&mut self, payer: &AccountId, amount: Amount) -> Result<(), FeeError> {
        self.inner.transfer_from(payer, amount)
    }

    fn pay_to(&mut self, recipient: &AccountId, amount: Amount) -> Result<(), FeeError> {
        if self.frozen.load(Ordering::SeqCst) && !amount.is_zero() {
            return Err(FeeError::InsufficientEscrow {
                requested: amount,
                escrow: Amount::ZERO,
            });
        }
        self.inner.pay_to(recipient, amount)
    }

    fn balance_of(&self, holder: &AccountId) -> Amount {
        self.inner.balance_of(holder)
    }

    fn escrow_balance(&self) -> Amount {
        if self.frozen.load(Ordering::SeqCst) {
            Amount::ZERO
        } else {
            self.inner.escrow_balance()
        }
    }
}

pub struct Harness {
    pub court: Court,
    pub chain: SimulatedChain,
    pub roster: SubscriptionRoster,
    pub recorder: RulingRecorder,
    pub jurors: Vec<AccountId>,
    escrow_frozen: Arc<AtomicBool>,
}

impl Harness {
    /// Twelve equally staked jurors, one slot each per regular round.
    pub fn new() -> Self {
        Self::with_config(distinct_jurors_config())
    }

    pub fn with_config(config: CourtConfig) -> Self {
        let stakes: Vec<(AccountId, Amount)> = (0..12)
            .map(|i| (juror(i), Amount::new(JUROR_STAKE)))
            .collect();
        Self::with_stakes(config, &stakes)
    }

    /// A court at term 1 with the given juror stakes; creator, appellant
    /// and confirmer hold [`PARTY_FUNDS`] each.
    pub fn with_stakes(config: CourtConfig, stakes: &[(AccountId, Amount)]) -> Self {
        let start = Timestamp::from_epoch_secs(GENESIS).unwrap();
        let chain = SimulatedChain::new(start, Seed::derive(&[b"integration"]));

        let mut registry = JurorsRegistry::new(account("burn"));
        for (juror, stake) in stakes {
            registry.stake(juror, *stake).unwrap();
        }
        let mut treasury = FeeTreasury::new();
        for party in [creator(), appellant(), confirmer()] {
            treasury.mint(&party, Amount::new(PARTY_FUNDS)).unwrap();
        }
        let roster = SubscriptionRoster::new();
        let recorder = RulingRecorder::new();
        let escrow_frozen = Arc::new(AtomicBool::new(false));
        let treasury = GatedTreasury {
            inner: treasury,
            frozen: Arc::clone(&escrow_frozen),
        };
        let collab = Collaborators::new(chain.clone(), registry, treasury)
            .with_eligibility(roster.clone())
            .with_subjects(recorder.clone());
        let mut court = Court::new(GenesisConfig::new(start, TERM), config, collab).unwrap();
        court.heartbeat(1).unwrap();

        Self {
            court,
            chain,
            roster,
            recorder,
            jurors: stakes.iter().map(|(j, _)| j.clone()).collect(),
            escrow_frozen,
        }
    }

    /// Make every payout out of escrow fail until [`Harness::thaw_escrow`].
    pub fn freeze_escrow(&self) {
        self.escrow_frozen.store(true, Ordering::SeqCst);
    }

    pub fn thaw_escrow(&self) {
        self.escrow_frozen.store(false, Ordering::SeqCst);
    }

    /// Move to the next term, ensure it and mine past its randomness block.
    pub fn next_term(&mut self) {
        self.chain.advance_secs(TERM).unwrap();
        self.court.heartbeat(1).unwrap();
        self.chain.advance_blocks(2);
    }

    pub fn next_terms(&mut self, count: u64) {
        for _ in 0..count {
            self.next_term();
        }
    }

    pub fn term(&self) -> u64 {
        self.court.last_ensured_term().get()
    }

    /// A two-ruling dispute funded by the creator.
    pub fn create_dispute(&mut self) -> DisputeId {
        self.court.create_dispute(&creator(), &subject(), 2).unwrap()
    }

    /// Draft the current round of `id` completely, by the keeper.
    pub fn draft_all(&mut self, id: DisputeId) -> u64 {
        let mut drafted = 0;
        while !self
            .court
            .get_dispute(id)
            .unwrap()
            .last_round()
            .unwrap()
            .is_fully_drafted()
        {
            drafted += self.court.draft(id, &keeper(), None).unwrap();
        }
        drafted
    }

    /// Create a dispute, move to its draft term and draft it.
    pub fn drafted_dispute(&mut self) -> DisputeId {
        let id = self.create_dispute();
        self.next_term();
        self.draft_all(id);
        id
    }

    /// Distinct jurors of a round, in draft order.
    pub fn round_jurors(&self, id: DisputeId, round: RoundId) -> Vec<AccountId> {
        self.court
            .get_dispute(id)
            .unwrap()
            .round(round)
            .unwrap()
            .jurors
            .clone()
    }

    pub fn commit(&mut self, id: DisputeId, round: RoundId, juror: &AccountId, outcome: Outcome) {
        self.court
            .commit_vote(id, round, juror, Commitment::new(outcome, &salt(juror)))
            .unwrap();
    }

    pub fn reveal(&mut self, id: DisputeId, round: RoundId, juror: &AccountId, outcome: Outcome) {
        self.court
            .reveal_vote(id, round, juror, outcome, &salt(juror))
            .unwrap();
    }

    /// Commit now, reveal next term, and step into the appeal phase.
    /// `None` commits nothing for that juror.
    pub fn vote(&mut self, id: DisputeId, round: RoundId, ballots: &[(AccountId, Option<Outcome>)]) {
        for (juror, outcome) in ballots {
            if let Some(outcome) = outcome {
                self.commit(id, round, juror, *outcome);
            }
        }
        self.next_term();
        for (juror, outcome) in ballots {
            if let Some(outcome) = outcome {
                self.reveal(id, round, juror, *outcome);
            }
        }
        self.next_term();
    }

    /// Every juror of the round votes `outcome`.
    pub fn vote_all(&mut self, id: DisputeId, round: RoundId, outcome: Outcome) {
        let ballots: Vec<(AccountId, Option<Outcome>)> = self
            .round_jurors(id, round)
            .into_iter()
            .map(|j| (j, Some(outcome)))
            .collect();
        self.vote(id, round, &ballots);
    }

    pub fn fee_balance(&self, holder: &AccountId) -> Amount {
        self.court.fees().balance_of(holder)
    }

    pub fn stake_of(&self, juror: &AccountId) -> JurorBalances {
        self.court.stake().balance_of(juror)
    }

    pub fn events(&mut self) -> Vec<CourtEvent> {
        self.court.drain_events()
    }
}
