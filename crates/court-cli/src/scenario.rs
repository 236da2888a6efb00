//! # Scenario Documents
//!
//! A scenario seeds an in-memory court (genesis, configuration, staked
//! jurors, funded parties) and scripts the calls made against it.
//!
//! ```yaml
//! genesis:
//!   first_term_start: "2023-11-14T22:13:20Z"
//!   term_duration_secs: 3600
//! jurors:
//!   - { account: alice, stake: 1000 }
//!   - { account: bob, stake: 1000 }
//! parties:
//!   - { account: creator, funds: 10000 }
//! steps:
//!   - { step: create_dispute, creator: creator, subject: marketplace }
//!   - { step: next_term }
//!   - { step: draft, dispute: 0, drafter: creator }
//!   - { step: commit, dispute: 0, ruling: 1 }
//! ```
//!
//! Rulings are written as option numbers counting from 1; `0` refuses.
//! Rounds default to round 0.

use court_core::{AccountId, Amount, CourtConfig, DisputeId, GenesisConfig, Outcome, RoundId};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub genesis: GenesisConfig,
    #[serde(default)]
    pub config: CourtConfig,
    #[serde(default)]
    pub jurors: Vec<JurorStake>,
    #[serde(default)]
    pub parties: Vec<PartyFunds>,
    /// Subjects whose subscription is overdue from the start.
    #[serde(default)]
    pub overdue_subjects: Vec<AccountId>,
    pub steps: Vec<Step>,
}

/// Stake deposited and activated before the first step.
#[derive(Debug, Clone, Deserialize)]
pub struct JurorStake {
    pub account: AccountId,
    pub stake: Amount,
}

/// Fee tokens minted before the first step.
#[derive(Debug, Clone, Deserialize)]
pub struct PartyFunds {
    pub account: AccountId,
    pub funds: Amount,
}

fn one() -> u64 {
    1
}

fn two() -> u8 {
    2
}

/// One scripted action.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    /// Move wall-clock time forward by whole terms (one block is produced).
    Advance {
        #[serde(default = "one")]
        terms: u64,
    },
    /// Ensure pending terms; all of them when `max` is omitted.
    Heartbeat { max: Option<u64> },
    /// Produce blocks without moving time.
    Blocks { count: u64 },
    /// Advance, heartbeat and mine past the randomness block, `count` times.
    NextTerm {
        #[serde(default = "one")]
        count: u64,
    },
    CreateDispute {
        creator: AccountId,
        subject: AccountId,
        #[serde(default = "two")]
        rulings: u8,
    },
    Draft {
        dispute: u64,
        drafter: AccountId,
        batch: Option<u64>,
    },
    /// Commit `ruling` for `jurors`, or for every drafted juror of the round.
    Commit {
        dispute: u64,
        #[serde(default)]
        round: u64,
        ruling: u8,
        jurors: Option<Vec<AccountId>>,
    },
    /// Reveal the ballots committed earlier, for `jurors` or all of them.
    Reveal {
        dispute: u64,
        #[serde(default)]
        round: u64,
        jurors: Option<Vec<AccountId>>,
    },
    Leak {
        dispute: u64,
        #[serde(default)]
        round: u64,
        juror: AccountId,
        leaker: AccountId,
    },
    Appeal {
        dispute: u64,
        #[serde(default)]
        round: u64,
        appellant: AccountId,
        ruling: u8,
    },
    ConfirmAppeal {
        dispute: u64,
        #[serde(default)]
        round: u64,
        confirmer: AccountId,
        ruling: u8,
    },
    SettlePenalties {
        dispute: u64,
        #[serde(default)]
        round: u64,
        settler: AccountId,
        #[serde(default)]
        batch: usize,
    },
    /// Reward `jurors`, or every coherent juror of the round.
    SettleReward {
        dispute: u64,
        #[serde(default)]
        round: u64,
        jurors: Option<Vec<AccountId>>,
    },
    SettleAppealDeposit {
        dispute: u64,
        #[serde(default)]
        round: u64,
    },
    Execute { dispute: u64 },
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Advance { .. } => "advance",
            Self::Heartbeat { .. } => "heartbeat",
            Self::Blocks { .. } => "blocks",
            Self::NextTerm { .. } => "next_term",
            Self::CreateDispute { .. } => "create_dispute",
            Self::Draft { .. } => "draft",
            Self::Commit { .. } => "commit",
            Self::Reveal { .. } => "reveal",
            Self::Leak { .. } => "leak",
            Self::Appeal { .. } => "appeal",
            Self::ConfirmAppeal { .. } => "confirm_appeal",
            Self::SettlePenalties { .. } => "settle_penalties",
            Self::SettleReward { .. } => "settle_reward",
            Self::SettleAppealDeposit { .. } => "settle_appeal_deposit",
            Self::Execute { .. } => "execute",
        }
    }
}

/// Outcome for a scenario ruling number.
pub fn ruling(number: u8) -> Outcome {
    Outcome::option(number)
}

pub fn ids(dispute: u64, round: u64) -> (DisputeId, RoundId) {
    (DisputeId(dispute), RoundId(round))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r#"
genesis:
  first_term_start: "2023-11-14T22:13:20Z"
  term_duration_secs: 3600
jurors:
  - { account: alice, stake: 1000 }
parties:
  - { account: creator, funds: 500 }
steps:
  - { step: create_dispute, creator: creator, subject: market }
  - { step: next_term, count: 2 }
  - { step: draft, dispute: 0, drafter: creator, batch: 2 }
  - { step: commit, dispute: 0, ruling: 1 }
  - { step: settle_penalties, dispute: 0, round: 1, settler: creator }
  - { step: execute, dispute: 0 }
"#;

    #[test]
    fn parses_steps_with_defaults() {
        let scenario: Scenario = serde_yaml::from_str(SCENARIO).unwrap();
        assert_eq!(scenario.genesis.term_duration_secs, 3600);
        assert_eq!(scenario.config, CourtConfig::default());
        assert_eq!(scenario.jurors[0].stake, Amount::new(1000));
        assert_eq!(scenario.steps.len(), 6);

        match &scenario.steps[0] {
            Step::CreateDispute { rulings, .. } => assert_eq!(*rulings, 2),
            other => panic!("unexpected step {other:?}"),
        }
        match &scenario.steps[1] {
            Step::NextTerm { count } => assert_eq!(*count, 2),
            other => panic!("unexpected step {other:?}"),
        }
        match &scenario.steps[3] {
            Step::Commit { round, jurors, .. } => {
                assert_eq!(*round, 0);
                assert!(jurors.is_none());
            }
            other => panic!("unexpected step {other:?}"),
        }
        match &scenario.steps[4] {
            Step::SettlePenalties { round, batch, .. } => {
                assert_eq!(*round, 1);
                assert_eq!(*batch, 0);
            }
            other => panic!("unexpected step {other:?}"),
        }
    }

    #[test]
    fn unknown_step_is_rejected() {
        let doc = r#"
genesis:
  first_term_start: "2023-11-14T22:13:20Z"
  term_duration_secs: 3600
steps:
  - { step: bribe, juror: alice }
"#;
        assert!(serde_yaml::from_str::<Scenario>(doc).is_err());
    }

    #[test]
    fn invalid_account_is_rejected() {
        let doc = r#"
genesis:
  first_term_start: "2023-11-14T22:13:20Z"
  term_duration_secs: 3600
parties:
  - { account: "", funds: 1 }
steps: []
"#;
        assert!(serde_yaml::from_str::<Scenario>(doc).is_err());
    }

    #[test]
    fn step_names_match_tags() {
        let scenario: Scenario = serde_yaml::from_str(SCENARIO).unwrap();
        let names: Vec<&str> = scenario.steps.iter().map(Step::name).collect();
        assert_eq!(
            names,
            vec![
                "create_dispute",
                "next_term",
                "draft",
                "commit",
                "settle_penalties",
                "execute"
            ]
        );
    }

    #[test]
    fn ruling_numbers_map_to_options() {
        assert_eq!(ruling(0), Outcome::REFUSED);
        assert_eq!(ruling(1), Outcome::option(1));
    }
}
