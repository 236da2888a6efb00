//! # Court Configuration
//!
//! [`GenesisConfig`] fixes the term schedule for the lifetime of a court.
//! [`CourtConfig`] holds the governable parameters; changes are scheduled
//! per term by the engine and snapshotted into disputes and rounds when they
//! are created, so a change never alters a round already in flight.
//!
//! Every section is `#[serde(default)]`, so a configuration file only needs
//! the fields it overrides.

use serde::{Deserialize, Serialize};

use crate::amount::{Amount, PCT_BASE};
use crate::error::CoreError;
use crate::temporal::Timestamp;

/// Upper bound on `max_possible_rulings`: ruling codes must fit in a byte
/// after the three reserved outcomes.
pub const MAX_RULING_OPTIONS: u8 = u8::MAX - 2;

/// Immutable term schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisConfig {
    /// Start of term 1. Term 0 starts one duration earlier.
    pub first_term_start: Timestamp,
    /// Length of every term in seconds.
    pub term_duration_secs: u64,
    /// Terms an operation may advance the clock by implicitly.
    #[serde(default = "default_max_auto_transitions")]
    pub max_auto_transitions: u64,
}

fn default_max_auto_transitions() -> u64 {
    1
}

impl GenesisConfig {
    pub fn new(first_term_start: Timestamp, term_duration_secs: u64) -> Self {
        Self {
            first_term_start,
            term_duration_secs,
            max_auto_transitions: default_max_auto_transitions(),
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.term_duration_secs == 0 {
            return Err(CoreError::invalid_config(
                "genesis.term_duration_secs",
                "must be positive",
            ));
        }
        if self.max_auto_transitions == 0 {
            return Err(CoreError::invalid_config(
                "genesis.max_auto_transitions",
                "must be positive",
            ));
        }
        Ok(())
    }
}

/// Per-juror fee rates charged when a round is funded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeesConfig {
    /// Paid to coherent jurors, per drafted slot.
    pub juror_fee: Amount,
    /// Paid to whoever drafts, per slot drafted.
    pub draft_fee: Amount,
    /// Paid to whoever settles penalties, per slot settled.
    pub settle_fee: Amount,
}

impl Default for FeesConfig {
    fn default() -> Self {
        Self {
            juror_fee: Amount::new(10),
            draft_fee: Amount::new(30),
            settle_fee: Amount::new(40),
        }
    }
}

/// Phase lengths, in terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TermsConfig {
    pub commit_terms: u64,
    pub reveal_terms: u64,
    pub appeal_terms: u64,
    pub appeal_confirm_terms: u64,
    /// Terms between dispute creation and its first draft term.
    pub draft_delay_terms: u64,
    /// Terms a final-round winner's stake stays withdrawal-locked after the
    /// reveal phase ends.
    pub final_round_lock_terms: u64,
}

impl Default for TermsConfig {
    fn default() -> Self {
        Self {
            commit_terms: 1,
            reveal_terms: 1,
            appeal_terms: 1,
            appeal_confirm_terms: 1,
            draft_delay_terms: 1,
            final_round_lock_terms: 1,
        }
    }
}

/// Panel sizing and ruling bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisputesConfig {
    pub first_round_jurors_number: u64,
    /// Multiplier applied to a panel on appeal (even results are bumped to odd).
    pub appeal_step_factor: u64,
    /// Index of the final round: a dispute has at most this many regular rounds.
    pub max_regular_appeal_rounds: u64,
    pub min_possible_rulings: u8,
    pub max_possible_rulings: u8,
    pub max_jurors_per_draft_batch: u64,
}

impl Default for DisputesConfig {
    fn default() -> Self {
        Self {
            first_round_jurors_number: 3,
            appeal_step_factor: 3,
            max_regular_appeal_rounds: 2,
            min_possible_rulings: 2,
            max_possible_rulings: 2,
            max_jurors_per_draft_batch: 64,
        }
    }
}

/// Stake thresholds and slashing ratios. Percentages are permyriad.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PenaltiesConfig {
    /// Stake unit: one drafted slot locks `min_active_balance × penalty_pct`.
    pub min_active_balance: Amount,
    pub penalty_pct: u16,
    /// Largest share of a final round's total weight one juror may hold.
    pub final_round_max_share_pct: u16,
    /// Largest share of a regular round's slots one juror may win.
    /// `10_000` leaves regular drafts uncapped.
    pub regular_round_max_share_pct: u16,
}

impl Default for PenaltiesConfig {
    fn default() -> Self {
        Self {
            min_active_balance: Amount::new(100),
            penalty_pct: 1_000,
            final_round_max_share_pct: 5_000,
            regular_round_max_share_pct: 10_000,
        }
    }
}

/// Appeal collateral, as permyriad multiples of the next round's cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollateralConfig {
    pub appeal_collateral_factor: u32,
    pub confirm_collateral_factor: u32,
}

impl Default for CollateralConfig {
    fn default() -> Self {
        Self {
            appeal_collateral_factor: 30_000,
            confirm_collateral_factor: 20_000,
        }
    }
}

/// Governable court parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CourtConfig {
    pub fees: FeesConfig,
    pub terms: TermsConfig,
    pub disputes: DisputesConfig,
    pub penalties: PenaltiesConfig,
    pub collateral: CollateralConfig,
}

impl CourtConfig {
    /// Check every cross-field constraint.
    pub fn validate(&self) -> Result<(), CoreError> {
        let terms = &self.terms;
        for (field, value) in [
            ("terms.commit_terms", terms.commit_terms),
            ("terms.reveal_terms", terms.reveal_terms),
            ("terms.appeal_terms", terms.appeal_terms),
            ("terms.appeal_confirm_terms", terms.appeal_confirm_terms),
            ("terms.draft_delay_terms", terms.draft_delay_terms),
        ] {
            if value == 0 {
                return Err(CoreError::invalid_config(field, "must be positive"));
            }
        }

        let disputes = &self.disputes;
        if disputes.first_round_jurors_number == 0 {
            return Err(CoreError::invalid_config(
                "disputes.first_round_jurors_number",
                "must be positive",
            ));
        }
        if disputes.appeal_step_factor == 0 {
            return Err(CoreError::invalid_config(
                "disputes.appeal_step_factor",
                "must be positive",
            ));
        }
        if disputes.max_jurors_per_draft_batch == 0 {
            return Err(CoreError::invalid_config(
                "disputes.max_jurors_per_draft_batch",
                "must be positive",
            ));
        }
        if disputes.min_possible_rulings < 2 {
            return Err(CoreError::invalid_config(
                "disputes.min_possible_rulings",
                "must be at least 2",
            ));
        }
        if disputes.max_possible_rulings < disputes.min_possible_rulings {
            return Err(CoreError::invalid_config(
                "disputes.max_possible_rulings",
                "must not be below min_possible_rulings",
            ));
        }
        if disputes.max_possible_rulings > MAX_RULING_OPTIONS {
            return Err(CoreError::invalid_config(
                "disputes.max_possible_rulings",
                format!("must not exceed {MAX_RULING_OPTIONS}"),
            ));
        }

        let penalties = &self.penalties;
        if penalties.min_active_balance.is_zero() {
            return Err(CoreError::invalid_config(
                "penalties.min_active_balance",
                "must be positive",
            ));
        }
        for (field, pct) in [
            ("penalties.penalty_pct", penalties.penalty_pct),
            (
                "penalties.final_round_max_share_pct",
                penalties.final_round_max_share_pct,
            ),
            (
                "penalties.regular_round_max_share_pct",
                penalties.regular_round_max_share_pct,
            ),
        ] {
            if u128::from(pct) > PCT_BASE {
                return Err(CoreError::invalid_config(field, "must not exceed 10000"));
            }
        }
        if penalties.final_round_max_share_pct == 0 || penalties.regular_round_max_share_pct == 0 {
            return Err(CoreError::invalid_config(
                "penalties",
                "max share percentages must be positive",
            ));
        }

        let collateral = &self.collateral;
        let combined = u128::from(collateral.appeal_collateral_factor)
            + u128::from(collateral.confirm_collateral_factor);
        if combined < PCT_BASE {
            return Err(CoreError::invalid_config(
                "collateral",
                "appeal and confirm factors must together cover the next round",
            ));
        }
        Ok(())
    }

    /// Stake locked per drafted slot.
    pub fn lock_per_slot(&self) -> Result<Amount, CoreError> {
        self.penalties
            .min_active_balance
            .pct(self.penalties.penalty_pct)
    }
}
