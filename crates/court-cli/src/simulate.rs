//! # Simulate CLI — Run scripted scenarios against an in-memory court.
//!
//! The court is wired to a [`SimulatedChain`], a [`JurorsRegistry`] and a
//! [`FeeTreasury`] seeded from the scenario. Each step is applied in order
//! and the events it produced are written as JSON lines. Vote salts and the
//! chain's block hashes derive from the run seed, so a seed reproduces a run
//! exactly.
//!
//! ```bash
//! court simulate scenarios/appeal.yaml --seed 7 > events.jsonl
//! ```

use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Args;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use court_clock::SimulatedChain;
use court_core::{AccountId, DisputeId, Outcome, RoundId, Seed};
use court_engine::{
    Collaborators, Court, CourtError, FeeTreasury, RulingNotice, RulingRecorder,
    SubscriptionRoster,
};
use court_registry::JurorsRegistry;
use court_voting::Commitment;

use crate::load_document;
use crate::scenario::{ids, ruling, Scenario, Step};

/// Simulate subcommand arguments.
#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Path to the scenario file (YAML or JSON).
    pub scenario: PathBuf,

    /// Seed for vote salts and block hashes; random when omitted.
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Execute the simulate subcommand.
pub fn run_simulate(args: &SimulateArgs) -> Result<u8> {
    let scenario: Scenario = load_document(&args.scenario)?;
    let seed = args.seed.unwrap_or_else(|| rand::thread_rng().gen());
    tracing::info!(scenario = %args.scenario.display(), seed, "starting simulation");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let report = Simulation::new(&scenario, seed)?.run(&scenario.steps, &mut out)?;
    tracing::info!(
        steps = report.steps,
        events = report.events,
        disputes = report.disputes,
        rulings = report.rulings.len(),
        "simulation finished"
    );
    Ok(0)
}

/// What a completed run did.
#[derive(Debug, Clone)]
pub struct SimulationReport {
    pub steps: usize,
    pub events: usize,
    pub disputes: usize,
    pub rulings: Vec<RulingNotice>,
}

#[derive(Debug, Clone)]
struct Ballot {
    outcome: Outcome,
    salt: [u8; 32],
}

/// A court under scripted control.
pub struct Simulation {
    court: Court,
    chain: SimulatedChain,
    recorder: RulingRecorder,
    term_duration_secs: u64,
    rng: StdRng,
    ballots: BTreeMap<(DisputeId, RoundId, AccountId), Ballot>,
    events: usize,
}

impl Simulation {
    /// Build the court described by `scenario`.
    pub fn new(scenario: &Scenario, seed: u64) -> Result<Self> {
        scenario.genesis.validate().context("invalid genesis")?;
        let chain = SimulatedChain::new(
            scenario.genesis.first_term_start,
            Seed::derive(&[b"court-simulation", &seed.to_be_bytes()]),
        );

        let mut registry = JurorsRegistry::new(AccountId::new("burn")?);
        for juror in &scenario.jurors {
            registry
                .stake(&juror.account, juror.stake)
                .with_context(|| format!("failed to stake juror {}", juror.account))?;
        }
        let mut treasury = FeeTreasury::new();
        for party in &scenario.parties {
            treasury
                .mint(&party.account, party.funds)
                .with_context(|| format!("failed to fund party {}", party.account))?;
        }
        let roster = SubscriptionRoster::new();
        for subject in &scenario.overdue_subjects {
            roster.set_overdue(subject, true);
        }
        let recorder = RulingRecorder::new();

        let collab = Collaborators::new(chain.clone(), registry, treasury)
            .with_eligibility(roster)
            .with_subjects(recorder.clone());
        let court = Court::new(scenario.genesis.clone(), scenario.config.clone(), collab)
            .context("failed to create court")?;

        Ok(Self {
            court,
            chain,
            recorder,
            term_duration_secs: scenario.genesis.term_duration_secs,
            rng: StdRng::seed_from_u64(seed),
            ballots: BTreeMap::new(),
            events: 0,
        })
    }

    pub fn court(&self) -> &Court {
        &self.court
    }

    /// Apply `steps` in order, writing events to `out` after each one.
    /// Stops at the first failing step.
    pub fn run(mut self, steps: &[Step], out: &mut dyn Write) -> Result<SimulationReport> {
        for (index, step) in steps.iter().enumerate() {
            tracing::debug!(step = index + 1, name = step.name(), "applying step");
            let result = self.apply(step);
            self.flush(out)?;
            result.with_context(|| format!("step {} ({}) failed", index + 1, step.name()))?;
        }
        Ok(SimulationReport {
            steps: steps.len(),
            events: self.events,
            disputes: self.court.dispute_count(),
            rulings: self.recorder.notices(),
        })
    }

    fn flush(&mut self, out: &mut dyn Write) -> Result<()> {
        for event in self.court.drain_events() {
            writeln!(out, "{}", serde_json::to_string(&event)?)?;
            self.events += 1;
        }
        Ok(())
    }

    fn apply(&mut self, step: &Step) -> Result<()> {
        match step {
            Step::Advance { terms } => self.advance(*terms)?,
            Step::Heartbeat { max } => {
                let max = max.unwrap_or_else(|| self.court.needed_transitions().max(1));
                self.court.heartbeat(max)?;
            }
            Step::Blocks { count } => self.chain.advance_blocks(*count),
            Step::NextTerm { count } => {
                for _ in 0..*count {
                    self.advance(1)?;
                    self.court.heartbeat(1)?;
                }
                self.chain.advance_blocks(2);
            }
            Step::CreateDispute {
                creator,
                subject,
                rulings,
            } => {
                let id = self.court.create_dispute(creator, subject, *rulings)?;
                tracing::debug!(dispute = %id, "scenario dispute created");
            }
            Step::Draft {
                dispute,
                drafter,
                batch,
            } => {
                self.court.draft(DisputeId(*dispute), drafter, *batch)?;
            }
            Step::Commit {
                dispute,
                round,
                ruling: number,
                jurors,
            } => {
                let (id, round) = ids(*dispute, *round);
                let voters = match jurors {
                    Some(list) => list.clone(),
                    None => self.round_jurors(id, round)?,
                };
                let outcome = ruling(*number);
                for voter in voters {
                    let salt: [u8; 32] = self.rng.gen();
                    self.court
                        .commit_vote(id, round, &voter, Commitment::new(outcome, &salt))?;
                    self.ballots
                        .insert((id, round, voter), Ballot { outcome, salt });
                }
            }
            Step::Reveal {
                dispute,
                round,
                jurors,
            } => {
                let (id, round) = ids(*dispute, *round);
                let voters: Vec<AccountId> = match jurors {
                    Some(list) => list.clone(),
                    None => self
                        .ballots
                        .keys()
                        .filter(|(d, r, _)| *d == id && *r == round)
                        .map(|(_, _, voter)| voter.clone())
                        .collect(),
                };
                for voter in voters {
                    let ballot = self.ballot(id, round, &voter)?;
                    self.court
                        .reveal_vote(id, round, &voter, ballot.outcome, &ballot.salt)?;
                }
            }
            Step::Leak {
                dispute,
                round,
                juror,
                leaker,
            } => {
                let (id, round) = ids(*dispute, *round);
                let ballot = self.ballot(id, round, juror)?;
                self.court
                    .leak_vote(id, round, juror, ballot.outcome, &ballot.salt, leaker)?;
                self.ballots.remove(&(id, round, juror.clone()));
            }
            Step::Appeal {
                dispute,
                round,
                appellant,
                ruling: number,
            } => {
                let (id, round) = ids(*dispute, *round);
                self.court.appeal(id, round, appellant, ruling(*number))?;
            }
            Step::ConfirmAppeal {
                dispute,
                round,
                confirmer,
                ruling: number,
            } => {
                let (id, round) = ids(*dispute, *round);
                self.court
                    .confirm_appeal(id, round, confirmer, ruling(*number))?;
            }
            Step::SettlePenalties {
                dispute,
                round,
                settler,
                batch,
            } => {
                let (id, round) = ids(*dispute, *round);
                self.court.settle_penalties(id, round, settler, *batch)?;
            }
            Step::SettleReward {
                dispute,
                round,
                jurors,
            } => {
                let (id, round) = ids(*dispute, *round);
                let Some(list) = jurors else {
                    return self.reward_coherent(id, round);
                };
                for juror in list {
                    self.court.settle_reward(id, round, juror)?;
                }
            }
            Step::SettleAppealDeposit { dispute, round } => {
                let (id, round) = ids(*dispute, *round);
                self.court.settle_appeal_deposit(id, round)?;
            }
            Step::Execute { dispute } => {
                self.court.execute_ruling(DisputeId(*dispute))?;
            }
        }
        Ok(())
    }

    fn advance(&mut self, terms: u64) -> Result<()> {
        self.chain
            .advance_secs(terms.saturating_mul(self.term_duration_secs))?;
        Ok(())
    }

    fn round_jurors(&self, id: DisputeId, round: RoundId) -> Result<Vec<AccountId>> {
        self.court
            .get_dispute(id)?
            .round(round)
            .map(|r| r.jurors.clone())
            .ok_or_else(|| anyhow!("{id} has no {round}"))
    }

    fn ballot(&self, id: DisputeId, round: RoundId, voter: &AccountId) -> Result<Ballot> {
        self.ballots
            .get(&(id, round, voter.clone()))
            .cloned()
            .ok_or_else(|| anyhow!("{voter} has no committed ballot in {id} {round}"))
    }

    /// Reward every juror of the round, skipping those who are not owed.
    fn reward_coherent(&mut self, id: DisputeId, round: RoundId) -> Result<()> {
        for juror in self.round_jurors(id, round)? {
            match self.court.settle_reward(id, round, &juror) {
                Ok(_) => {}
                Err(
                    CourtError::WontRewardIncoherentJuror { .. }
                    | CourtError::WontRewardNonVoterJuror { .. }
                    | CourtError::JurorAlreadyRewarded { .. },
                ) => {
                    tracing::debug!(dispute = %id, round = %round, juror = %juror, "no reward owed");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HAPPY_PATH: &str = r#"
genesis:
  first_term_start: "2023-11-14T22:13:20Z"
  term_duration_secs: 3600
jurors:
  - { account: alice, stake: 1000 }
  - { account: bob, stake: 1000 }
  - { account: carol, stake: 1000 }
parties:
  - { account: creator, funds: 10000 }
steps:
  - { step: create_dispute, creator: creator, subject: market }
  - { step: next_term }
  - { step: draft, dispute: 0, drafter: creator }
  - { step: commit, dispute: 0, ruling: 1 }
  - { step: next_term }
  - { step: reveal, dispute: 0 }
  - { step: next_term, count: 2 }
  - { step: execute, dispute: 0 }
  - { step: settle_penalties, dispute: 0, settler: creator }
  - { step: settle_reward, dispute: 0 }
"#;

    fn scenario(doc: &str) -> Scenario {
        serde_yaml::from_str(doc).unwrap()
    }

    fn run(doc: &str, seed: u64) -> (Result<SimulationReport>, String) {
        let scenario = scenario(doc);
        let mut out = Vec::new();
        let result = Simulation::new(&scenario, seed)
            .unwrap()
            .run(&scenario.steps, &mut out);
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn happy_path_rules_and_settles() {
        let (result, output) = run(HAPPY_PATH, 7);
        let report = result.unwrap();
        assert_eq!(report.steps, 10);
        assert_eq!(report.disputes, 1);
        assert_eq!(report.rulings.len(), 1);
        assert_eq!(report.rulings[0].ruling, Outcome::option(1));
        assert_eq!(report.events, output.lines().count());

        let events: Vec<serde_json::Value> = output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        let tags: Vec<&str> = events
            .iter()
            .filter_map(|e| e["event"].as_str())
            .collect();
        assert!(tags.contains(&"new_dispute"));
        assert_eq!(tags.iter().filter(|t| **t == "juror_drafted").count(), 3);
        assert!(tags.contains(&"ruling_executed"));
        assert!(tags.contains(&"penalties_settled"));
        assert!(tags.contains(&"reward_settled"));
    }

    #[test]
    fn shipped_appeal_scenario_overturns_first_panel() {
        let (result, output) = run(include_str!("../../../scenarios/appeal.yaml"), 11);
        let report = result.unwrap();
        assert_eq!(report.rulings.len(), 1);
        assert_eq!(report.rulings[0].ruling, Outcome::option(2));
        assert!(output.contains("\"event\":\"ruling_appeal_confirmed\""));
        assert!(output.contains("\"event\":\"appeal_deposit_settled\""));
    }

    #[test]
    fn shipped_happy_path_scenario_runs() {
        let (result, _) = run(include_str!("../../../scenarios/happy-path.yaml"), 5);
        assert_eq!(result.unwrap().rulings[0].ruling, Outcome::option(1));
    }

    #[test]
    fn same_seed_reproduces_output() {
        let (_, a) = run(HAPPY_PATH, 42);
        let (_, b) = run(HAPPY_PATH, 42);
        assert_eq!(a, b);
    }

    #[test]
    fn failing_step_is_reported_with_its_index() {
        let doc = r#"
genesis:
  first_term_start: "2023-11-14T22:13:20Z"
  term_duration_secs: 3600
parties:
  - { account: creator, funds: 10000 }
steps:
  - { step: create_dispute, creator: creator, subject: market }
  - { step: execute, dispute: 0 }
"#;
        let (result, output) = run(doc, 1);
        let err = result.unwrap_err();
        assert!(format!("{err:#}").contains("step 2 (execute) failed"));
        assert!(output.contains("new_dispute"));
    }

    #[test]
    fn unfunded_creator_fails_on_deposit() {
        let doc = r#"
genesis:
  first_term_start: "2023-11-14T22:13:20Z"
  term_duration_secs: 3600
steps:
  - { step: create_dispute, creator: nobody, subject: market }
"#;
        let (result, output) = run(doc, 1);
        assert!(format!("{:#}", result.unwrap_err()).contains("step 1 (create_dispute)"));
        assert!(output.is_empty());
    }

    #[test]
    fn overdue_subject_cannot_open_disputes() {
        let doc = r#"
genesis:
  first_term_start: "2023-11-14T22:13:20Z"
  term_duration_secs: 3600
parties:
  - { account: creator, funds: 10000 }
overdue_subjects: [market]
steps:
  - { step: create_dispute, creator: creator, subject: market }
"#;
        let (result, _) = run(doc, 1);
        assert!(result.is_err());
    }

    #[test]
    fn reveal_without_commit_names_the_juror() {
        let doc = r#"
genesis:
  first_term_start: "2023-11-14T22:13:20Z"
  term_duration_secs: 3600
jurors:
  - { account: alice, stake: 1000 }
parties:
  - { account: creator, funds: 10000 }
steps:
  - { step: create_dispute, creator: creator, subject: market }
  - { step: next_term }
  - { step: draft, dispute: 0, drafter: creator }
  - { step: next_term }
  - { step: reveal, dispute: 0, jurors: [alice] }
"#;
        let (result, _) = run(doc, 3);
        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("alice has no committed ballot"));
    }
}
