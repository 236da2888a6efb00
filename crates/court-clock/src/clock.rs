//! # Court Clock
//!
//! Terms are numbered from 0. Term 1 starts at the genesis
//! `first_term_start`; every term lasts `term_duration_secs`. The computed
//! current term is the last one whose start has elapsed. Persisted terms
//! ("ensured") are appended strictly in sequence by [`CourtClock::heartbeat`].
//!
//! When a term is ensured it records `randomness_block = current_block + 1`.
//! The first draft that needs the term's seed reads that block's hash and
//! stores it, so later drafts in the same term keep using it even after the
//! hash leaves the lookup window.

use std::collections::BTreeMap;

use court_core::{GenesisConfig, Seed, TermId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::error::ClockError;
use crate::randomness::{Randomness, RandomnessSource};

/// A persisted term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub id: TermId,
    pub start_time: Timestamp,
    /// Block whose hash seeds drafts for this term.
    pub randomness_block: u64,
    /// Seed recorded on first use.
    pub randomness: Option<Seed>,
    /// Configuration changes scheduled to take effect at this term.
    pub config_changes: u32,
}

/// One step of a heartbeat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermTransition {
    pub previous: TermId,
    pub current: TermId,
    pub start_time: Timestamp,
    /// Configuration changes this transition activated.
    pub config_changes: u32,
}

/// The term schedule and its persisted terms.
#[derive(Debug, Clone)]
pub struct CourtClock {
    genesis: GenesisConfig,
    /// Index equals term id; never empty.
    terms: Vec<Term>,
    /// Changes scheduled for terms not yet ensured.
    scheduled_changes: BTreeMap<TermId, u32>,
}

impl CourtClock {
    /// Create a clock with the pre-genesis term 0 ensured.
    pub fn new(genesis: GenesisConfig, current_block: u64) -> Result<Self, ClockError> {
        genesis.validate()?;
        let start_time = Timestamp::from_epoch_secs(
            genesis.first_term_start.epoch_secs() - duration_secs(&genesis),
        )?;
        let term_zero = Term {
            id: TermId::ZERO,
            start_time,
            randomness_block: current_block.saturating_add(1),
            randomness: None,
            config_changes: 0,
        };
        Ok(Self {
            genesis,
            terms: vec![term_zero],
            scheduled_changes: BTreeMap::new(),
        })
    }

    pub fn genesis(&self) -> &GenesisConfig {
        &self.genesis
    }

    pub fn last_ensured_term(&self) -> TermId {
        TermId(self.terms.len() as u64 - 1)
    }

    /// The term implied by `now`.
    pub fn current_term_at(&self, now: Timestamp) -> TermId {
        let elapsed = now.epoch_secs() - self.genesis.first_term_start.epoch_secs();
        if elapsed < 0 {
            return TermId::ZERO;
        }
        let elapsed = u64::try_from(elapsed).unwrap_or(u64::MAX);
        TermId(elapsed / self.genesis.term_duration_secs + 1)
    }

    /// Transitions pending at `now`.
    pub fn needed_transitions(&self, now: Timestamp) -> u64 {
        self.current_term_at(now).since(self.last_ensured_term())
    }

    /// Ensure up to `max_transitions` pending terms, one at a time.
    pub fn heartbeat(
        &mut self,
        max_transitions: u64,
        now: Timestamp,
        current_block: u64,
    ) -> Result<Vec<TermTransition>, ClockError> {
        if max_transitions == 0 {
            return Err(ClockError::InvalidTransitionCount);
        }
        let count = self.needed_transitions(now).min(max_transitions);
        self.advance(count, current_block)
    }

    /// Ensure every pending term, refusing when more than `max` are pending.
    pub fn ensure_current_term(
        &mut self,
        max: u64,
        now: Timestamp,
        current_block: u64,
    ) -> Result<Vec<TermTransition>, ClockError> {
        let target = self.planned_current_term(max, now)?;
        self.advance(target.since(self.last_ensured_term()), current_block)
    }

    /// The term [`CourtClock::ensure_current_term`] would reach, without
    /// mutating anything.
    pub fn planned_current_term(&self, max: u64, now: Timestamp) -> Result<TermId, ClockError> {
        let needed = self.needed_transitions(now);
        if needed > max {
            return Err(ClockError::TooManyTransitions { needed, max });
        }
        Ok(self.current_term_at(now))
    }

    /// Fail unless the clock has been ensured up to the current term.
    pub fn require_up_to_date(&self, now: Timestamp) -> Result<TermId, ClockError> {
        let last_ensured = self.last_ensured_term();
        let current = self.current_term_at(now);
        if current > last_ensured {
            return Err(ClockError::TermOutdated {
                last_ensured,
                current,
            });
        }
        Ok(last_ensured)
    }

    pub fn term(&self, id: TermId) -> Option<&Term> {
        usize::try_from(id.0).ok().and_then(|i| self.terms.get(i))
    }

    /// The draft seed of `id`, recording it on first successful lookup.
    pub fn term_randomness<S: RandomnessSource + ?Sized>(
        &mut self,
        id: TermId,
        source: &S,
    ) -> Result<Seed, ClockError> {
        let last_ensured = self.last_ensured_term();
        let term = usize::try_from(id.0)
            .ok()
            .and_then(|i| self.terms.get_mut(i))
            .ok_or(ClockError::TermDoesNotExist {
                term: id,
                last_ensured,
            })?;
        if let Some(seed) = term.randomness {
            return Ok(seed);
        }
        let block = term.randomness_block;
        let current_block = source.current_block();
        match source.seed_for(block) {
            Randomness::Available(seed) => {
                term.randomness = Some(seed);
                tracing::debug!(term = %id, block, "recorded term randomness");
                Ok(seed)
            }
            Randomness::NotYetAvailable => Err(ClockError::RandomnessNotYetAvailable {
                term: id,
                block,
                current_block,
            }),
            Randomness::Unavailable => Err(ClockError::RandomnessUnavailable {
                term: id,
                block,
                current_block,
            }),
        }
    }

    /// Record a configuration change taking effect at `term`.
    pub fn schedule_config_change(&mut self, term: TermId) -> Result<(), ClockError> {
        let last_ensured = self.last_ensured_term();
        if term <= last_ensured {
            return Err(ClockError::ConfigTermInPast { term, last_ensured });
        }
        *self.scheduled_changes.entry(term).or_insert(0) += 1;
        Ok(())
    }

    /// Start time of term `id`, ensured or not.
    pub fn term_start(&self, id: TermId) -> Result<Timestamp, ClockError> {
        let first = self.genesis.first_term_start;
        if id == TermId::ZERO {
            return Ok(Timestamp::from_epoch_secs(
                first.epoch_secs() - duration_secs(&self.genesis),
            )?);
        }
        let offset = (id.0 - 1).saturating_mul(self.genesis.term_duration_secs);
        Ok(first.plus_secs(offset)?)
    }

    fn advance(
        &mut self,
        count: u64,
        current_block: u64,
    ) -> Result<Vec<TermTransition>, ClockError> {
        let mut transitions = Vec::new();
        for _ in 0..count {
            let previous = self.last_ensured_term();
            let id = previous.next();
            let start_time = self.term_start(id)?;
            let config_changes = self.scheduled_changes.remove(&id).unwrap_or(0);
            self.terms.push(Term {
                id,
                start_time,
                randomness_block: current_block.saturating_add(1),
                randomness: None,
                config_changes,
            });
            tracing::info!(previous = %previous, current = %id, "heartbeat");
            transitions.push(TermTransition {
                previous,
                current: id,
                start_time,
                config_changes,
            });
        }
        Ok(transitions)
    }
}

fn duration_secs(genesis: &GenesisConfig) -> i64 {
    i64::try_from(genesis.term_duration_secs).unwrap_or(i64::MAX)
}
