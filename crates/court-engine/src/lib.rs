//! # court-engine — Adjudication and Settlement
//!
//! The dispute/round state machine, the juror draft, and penalty, reward and
//! appeal-deposit settlement, behind the [`Court`] facade.
//!
//! ## Modules
//!
//! - **court**: `Court`, `Collaborators`, dispute creation, appeals,
//!   confirmations, final rulings, execution, voting and views.
//! - **dispute**: `Dispute`, `Round`, `Appeal`, `DisputeState` and the
//!   computed `RoundPhase`.
//! - **draft**: stake-weighted, nonce-driven juror sampling.
//! - **settlement**: penalties, rewards, appeal deposits.
//! - **fees**: the fee-token ledger port and `FeeTreasury`.
//! - **subjects**: arbitrable subjects and the eligibility gate.
//! - **events**: `CourtEvent`, drained by callers.
//! - **shared**: `SharedCourt`, the mutual-exclusion handle.

pub mod court;
pub mod dispute;
pub mod draft;
pub mod error;
pub mod events;
pub mod fees;
pub mod settlement;
pub mod shared;
pub mod subjects;

pub use court::{Chain, Collaborators, Court, JurorView, RoundView};
pub use dispute::{
    Appeal, Dispute, DisputeState, JurorParticipation, Round, RoundFees, RoundPhase, RoundStatus,
    FINAL_ROUND_WEIGHT_PRECISION,
};
pub use draft::MAX_DRAWS_PER_SLOT;
pub use error::{CourtError, ErrorKind};
pub use events::{CollapseReason, CourtEvent};
pub use fees::{FeeError, FeeLedger, FeeTreasury};
pub use shared::SharedCourt;
pub use subjects::{Arbitrable, EligibilityGate, RulingNotice, RulingRecorder, SubscriptionRoster};
