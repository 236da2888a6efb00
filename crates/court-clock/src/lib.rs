//! # court-clock — Term Clock
//!
//! Time in the court advances in fixed-length terms. The clock computes the
//! term implied by wall-clock time but only persists terms that have been
//! explicitly ensured ("heartbeat"). Every time-gated operation reads the
//! last ensured term, so deadlines are deterministic and never move behind
//! a caller's back.
//!
//! ## Modules
//!
//! - **clock**: `CourtClock`, `Term`, `TermTransition`.
//! - **randomness**: `RandomnessSource`, `TimeSource`, the three-state
//!   `Randomness` result and the `BlockhashWindow` availability rule.
//! - **chain**: `SimulatedChain`, a shared in-memory time and block source.

pub mod chain;
pub mod clock;
pub mod error;
pub mod randomness;

pub use chain::SimulatedChain;
pub use clock::{CourtClock, Term, TermTransition};
pub use error::ClockError;
pub use randomness::{BlockhashWindow, Randomness, RandomnessSource, TimeSource, BLOCKHASH_WINDOW};
